//! Pick results and visible-material resolution
//!
//! A pick at a screen position yields an ordered list of candidates. Each
//! candidate carries the path from the scene root down to the picked leaf and
//! the cumulative transform of the leaf's parent context. Path nodes snapshot
//! the material data of the entity they stand for, so resolution never has to
//! go back to the scene.
//!
//! ## Resolution
//!
//! The visible material at a pixel is the most deeply nested explicit
//! material along the picked path. Faces contribute their back material when
//! the camera looks at their back side. Nodes without an explicit material
//! inherit and never clear a value found higher up.

use glam::{Mat4, Vec3};

use crate::host::{Capabilities, SceneQuery};
use crate::scene::{EntityId, MaterialRef};

// ========================================================================
// PathNode — one entity along a pick path
// ========================================================================

/// Classification of a node in a pick path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Face with its normal in the face's own coordinate space.
    Face { normal: Vec3 },
    Edge,
    Instance,
    Image,
    Guide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub id: EntityId,
    pub kind: NodeKind,
    pub capabilities: Capabilities,
    pub material: MaterialRef,
    pub back_material: MaterialRef,
}

impl PathNode {
    pub fn face(
        id: EntityId,
        normal: Vec3,
        material: MaterialRef,
        back_material: MaterialRef,
    ) -> Self {
        Self {
            id,
            kind: NodeKind::Face { normal },
            capabilities: Capabilities::FRONT_MATERIAL | Capabilities::BACK_MATERIAL,
            material,
            back_material,
        }
    }

    pub fn edge(id: EntityId, material: MaterialRef) -> Self {
        Self {
            id,
            kind: NodeKind::Edge,
            capabilities: Capabilities::FRONT_MATERIAL,
            material,
            back_material: None,
        }
    }

    pub fn instance(id: EntityId, material: MaterialRef) -> Self {
        Self {
            id,
            kind: NodeKind::Instance,
            capabilities: Capabilities::FRONT_MATERIAL,
            material,
            back_material: None,
        }
    }

    /// Node for an entity without material slots.
    pub fn inert(id: EntityId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            capabilities: Capabilities::empty(),
            material: None,
            back_material: None,
        }
    }

    pub fn is_face(&self) -> bool {
        matches!(self.kind, NodeKind::Face { .. })
    }

    /// World-space unit normal of a face node, `None` for other nodes and
    /// degenerate normals.
    pub fn world_normal(&self, transform: &Mat4) -> Option<Vec3> {
        let NodeKind::Face { normal } = self.kind else {
            return None;
        };
        let world = transform.transform_vector3(normal).normalize_or_zero();
        (world != Vec3::ZERO).then_some(world)
    }
}

// ========================================================================
// PickHelper — host pick query results
// ========================================================================

/// Results of the most recent pick.
///
/// Indices run over the enumerated candidates; out-of-range indices yield
/// `None` (or the identity transform).
pub trait PickHelper {
    fn count(&self) -> usize;
    fn picked_face(&self) -> Option<EntityId>;
    fn picked_edge(&self) -> Option<EntityId>;
    /// Best overall candidate regardless of kind.
    fn best_picked(&self) -> Option<EntityId>;
    fn element_at(&self, index: usize) -> Option<EntityId>;
    fn path_at(&self, index: usize) -> Option<&[PathNode]>;
    fn transformation_at(&self, index: usize) -> Mat4;
}

/// One pick candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct PickRecord {
    /// Root to leaf, leaf included.
    pub path: Vec<PathNode>,
    /// Cumulative transform of the leaf's parent context.
    pub transform: Mat4,
    /// Distance along the pick ray.
    pub depth: f32,
}

impl PickRecord {
    pub fn leaf(&self) -> Option<&PathNode> {
        self.path.last()
    }
}

/// Pick candidates ordered nearest first.
#[derive(Debug, Clone, Default)]
pub struct PickList {
    records: Vec<PickRecord>,
}

impl PickList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts `records` by depth.
    pub fn from_records(mut records: Vec<PickRecord>) -> Self {
        records.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        Self { records }
    }

    pub fn records(&self) -> &[PickRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn first_leaf(&self, predicate: impl Fn(&PathNode) -> bool) -> Option<EntityId> {
        self.records
            .iter()
            .filter_map(PickRecord::leaf)
            .find(|leaf| predicate(leaf))
            .map(|leaf| leaf.id)
    }
}

impl PickHelper for PickList {
    fn count(&self) -> usize {
        self.records.len()
    }

    fn picked_face(&self) -> Option<EntityId> {
        self.first_leaf(PathNode::is_face)
    }

    fn picked_edge(&self) -> Option<EntityId> {
        self.first_leaf(|leaf| leaf.kind == NodeKind::Edge)
    }

    fn best_picked(&self) -> Option<EntityId> {
        self.first_leaf(|_| true)
    }

    fn element_at(&self, index: usize) -> Option<EntityId> {
        self.records.get(index)?.leaf().map(|leaf| leaf.id)
    }

    fn path_at(&self, index: usize) -> Option<&[PathNode]> {
        self.records.get(index).map(|record| record.path.as_slice())
    }

    fn transformation_at(&self, index: usize) -> Mat4 {
        self.records
            .get(index)
            .map(|record| record.transform)
            .unwrap_or(Mat4::IDENTITY)
    }
}

// ========================================================================
// Resolution
// ========================================================================

/// The element chosen among ambiguous candidates, by priority
/// face > edge > best match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickedElement {
    Face(EntityId),
    Edge(EntityId),
    Best(EntityId),
}

impl PickedElement {
    pub fn choose(picks: &dyn PickHelper) -> Option<Self> {
        picks
            .picked_face()
            .map(Self::Face)
            .or_else(|| picks.picked_edge().map(Self::Edge))
            .or_else(|| picks.best_picked().map(Self::Best))
    }

    pub fn id(self) -> EntityId {
        match self {
            Self::Face(id) | Self::Edge(id) | Self::Best(id) => id,
        }
    }
}

/// Index of the first candidate whose element is exactly `id`.
pub fn pick_index(picks: &dyn PickHelper, id: EntityId) -> Option<usize> {
    (0..picks.count()).find(|&index| picks.element_at(index) == Some(id))
}

/// Pick at a screen position and resolve the material visible there.
pub fn resolve<Q: SceneQuery + ?Sized>(query: &mut Q, x: f32, y: f32) -> MaterialRef {
    let view_direction = query.view_direction();
    let picks = query.do_pick(x, y);
    visible_material(picks, view_direction)
}

/// Material visible for the given pick results, `None` for the default
/// material or when nothing paintable was picked.
pub fn visible_material(picks: &dyn PickHelper, view_direction: Vec3) -> MaterialRef {
    let picked = PickedElement::choose(picks);

    // Candidates that do not list the chosen element fall back to the first
    // candidate, which may be a shallower path than the one actually hit.
    let index = match picked {
        Some(element) => pick_index(picks, element.id()).unwrap_or_else(|| {
            log::debug!("Picked element {:?} not enumerated, using index 0", element);
            0
        }),
        None => 0,
    };

    let Some(path) = picks.path_at(index).filter(|path| !path.is_empty()) else {
        return None;
    };

    let back_facing = match picked {
        Some(PickedElement::Face(id)) => {
            let transform = picks.transformation_at(index);
            path.iter()
                .rev()
                .find(|node| node.id == id)
                .and_then(|node| node.world_normal(&transform))
                .is_some_and(|normal| view_direction.dot(normal) > 0.0)
        }
        _ => false,
    };

    let mut visible = None;
    for node in path {
        if !node.capabilities.contains(Capabilities::FRONT_MATERIAL) {
            continue;
        }
        let material = if node.is_face() && back_facing {
            node.back_material
        } else {
            node.material
        };
        if material.is_some() {
            visible = material;
        }
    }
    visible
}

// ========================================================================
// Tests
// ========================================================================
