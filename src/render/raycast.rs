//! CPU ray picking against a [`Model`].
//!
//! Faces are hit with a two-sided ray/triangle test over a fan triangulation,
//! edges when the ray passes within a pixel tolerance. Instances are walked
//! recursively with their transforms accumulated, so a definition placed
//! several times yields one candidate per placement under the ray.

use glam::{Mat4, Vec3};

use crate::render::camera::{Ray, ViewCamera};
use crate::render::pick::{NodeKind, PathNode, PickList, PickRecord};
use crate::scene::{Entity, EntityKind, FaceData, Model};

/// Instances nested deeper than this are not descended into.
pub const MAX_NESTING: usize = 64;

const EPSILON: f32 = 1e-7;

/// Snapshot of an entity's pick-relevant data.
pub fn path_node(entity: &Entity) -> PathNode {
    match &entity.kind {
        EntityKind::Face(face) => {
            PathNode::face(entity.id, face.normal(), face.material, face.back_material)
        }
        EntityKind::Edge(edge) => PathNode::edge(entity.id, edge.material),
        EntityKind::Instance(instance) => PathNode::instance(entity.id, instance.material),
        EntityKind::Image(_) => PathNode::inert(entity.id, NodeKind::Image),
        EntityKind::Guide(_) => PathNode::inert(entity.id, NodeKind::Guide),
    }
}

/// All candidates under screen position (`x`, `y`), nearest first.
pub fn pick(
    model: &Model,
    camera: &ViewCamera,
    x: f32,
    y: f32,
    edge_tolerance_px: f32,
) -> PickList {
    let mut walker = Walker {
        model,
        camera,
        ray: camera.ray(x, y),
        edge_tolerance_px,
        records: Vec::new(),
    };
    let mut prefix = Vec::new();
    walker.visit(model.entities(), Mat4::IDENTITY, &mut prefix, 0);
    log::trace!("Pick at ({}, {}) found {} candidates", x, y, walker.records.len());
    PickList::from_records(walker.records)
}

struct Walker<'a> {
    model: &'a Model,
    camera: &'a ViewCamera,
    ray: Ray,
    edge_tolerance_px: f32,
    records: Vec<PickRecord>,
}

impl Walker<'_> {
    fn visit(
        &mut self,
        entities: &[Entity],
        transform: Mat4,
        prefix: &mut Vec<PathNode>,
        depth: usize,
    ) {
        let model = self.model;
        for entity in entities {
            match &entity.kind {
                EntityKind::Face(face) => {
                    if let Some(distance) = intersect_face(&self.ray, face, &transform) {
                        self.push(prefix, entity, transform, distance);
                    }
                }
                EntityKind::Edge(edge) => {
                    let a = transform.transform_point3(Vec3::from_array(edge.start));
                    let b = transform.transform_point3(Vec3::from_array(edge.end));
                    if let Some((distance, gap)) = ray_segment_distance(&self.ray, a, b) {
                        let tolerance =
                            self.camera.pixel_size_at(distance) * self.edge_tolerance_px;
                        if gap <= tolerance {
                            self.push(prefix, entity, transform, distance);
                        }
                    }
                }
                EntityKind::Instance(instance) => {
                    if depth >= MAX_NESTING {
                        log::warn!("Instance {:?} nested too deeply, not picked", entity.id);
                        continue;
                    }
                    // Image definitions carry no replaceable materials.
                    let Some(definition) = model
                        .definition(&instance.definition)
                        .filter(|definition| !definition.is_image)
                    else {
                        continue;
                    };
                    prefix.push(path_node(entity));
                    let nested = transform * instance.transform.matrix();
                    self.visit(&definition.entities, nested, prefix, depth + 1);
                    prefix.pop();
                }
                EntityKind::Image(_) | EntityKind::Guide(_) => {}
            }
        }
    }

    fn push(&mut self, prefix: &[PathNode], leaf: &Entity, transform: Mat4, depth: f32) {
        let mut path = Vec::with_capacity(prefix.len() + 1);
        path.extend_from_slice(prefix);
        path.push(path_node(leaf));
        self.records.push(PickRecord {
            path,
            transform,
            depth,
        });
    }
}

fn intersect_face(ray: &Ray, face: &FaceData, transform: &Mat4) -> Option<f32> {
    let points: Vec<Vec3> = face
        .vertices
        .iter()
        .map(|vertex| transform.transform_point3(Vec3::from_array(*vertex)))
        .collect();
    let (first, rest) = points.split_first()?;
    rest.windows(2)
        .filter_map(|pair| ray_triangle(ray, *first, pair[0], pair[1]))
        .min_by(f32::total_cmp)
}

/// Two-sided Möller–Trumbore test; distance along the ray on a hit.
fn ray_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// Closest approach between a ray and segment `a`-`b`.
///
/// Returns the distance along the ray to the closest point and the gap
/// between ray and segment there.
fn ray_segment_distance(ray: &Ray, a: Vec3, b: Vec3) -> Option<(f32, f32)> {
    let d1 = ray.direction;
    let d2 = b - a;
    let r = ray.origin - a;
    let dd1 = d1.dot(d1);
    let dd2 = d2.dot(d2);
    if dd1 < EPSILON {
        return None;
    }
    let c = d1.dot(r);

    let (s, u) = if dd2 < EPSILON {
        ((-c / dd1).max(0.0), 0.0)
    } else {
        let f = d2.dot(r);
        let b12 = d1.dot(d2);
        let denom = dd1 * dd2 - b12 * b12;
        let mut s = if denom > EPSILON {
            ((b12 * f - c * dd2) / denom).max(0.0)
        } else {
            0.0
        };
        let mut u = (b12 * s + f) / dd2;
        if u < 0.0 {
            u = 0.0;
            s = (-c / dd1).max(0.0);
        } else if u > 1.0 {
            u = 1.0;
            s = ((b12 - c) / dd1).max(0.0);
        }
        (s, u)
    };

    if s <= EPSILON {
        return None;
    }
    let on_ray = ray.at(s);
    let on_segment = a + d2 * u;
    Some((s, on_ray.distance(on_segment)))
}
