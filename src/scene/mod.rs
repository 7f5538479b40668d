pub mod serialization;

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::{Mat4, Vec3};

use crate::host::{
    Capabilities, DefinitionEntities, HasMaterialSlots, SceneEntity, SceneGraph, Side,
};

/// Identity of a material in the model's library.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MaterialId(pub u32);

/// A material slot value; `None` is the default material (inherited from the
/// enclosing context).
pub type MaterialRef = Option<MaterialId>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u32);

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_material_color")]
    pub color: [u8; 4],
}

impl Material {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

fn default_material_color() -> [u8; 4] {
    [255, 255, 255, 255]
}

/// Local placement of an instance inside its parent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransformData {
    pub position: [f32; 3],
    pub rotation_deg: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for TransformData {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation_deg: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

impl TransformData {
    pub fn translation(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        compose_transform_matrix(self.position, self.rotation_deg, self.scale)
    }
}

/// Planar polygon with two independently painted sides.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FaceData {
    pub vertices: Vec<[f32; 3]>,
    #[serde(default)]
    pub material: MaterialRef,
    #[serde(default)]
    pub back_material: MaterialRef,
}

impl FaceData {
    /// Unit normal following the winding of `vertices` (Newell's method).
    /// Zero for degenerate polygons.
    pub fn normal(&self) -> Vec3 {
        let mut normal = Vec3::ZERO;
        for (i, current) in self.vertices.iter().enumerate() {
            let current = Vec3::from_array(*current);
            let next = Vec3::from_array(self.vertices[(i + 1) % self.vertices.len()]);
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }
        normal.normalize_or_zero()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EdgeData {
    pub start: [f32; 3],
    pub end: [f32; 3],
    #[serde(default)]
    pub material: MaterialRef,
}

/// Placement of a component or group definition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InstanceData {
    pub definition: String,
    #[serde(default)]
    pub transform: TransformData,
    #[serde(default)]
    pub material: MaterialRef,
}

/// Placement of a raster image definition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageData {
    pub definition: String,
    #[serde(default)]
    pub transform: TransformData,
}

/// Construction point; carries no material.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GuideData {
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    Face(FaceData),
    Edge(EdgeData),
    Instance(InstanceData),
    Image(ImageData),
    Guide(GuideData),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl Entity {
    /// Name of the definition this entity places, if any.
    pub fn definition_name(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::Instance(data) => Some(&data.definition),
            EntityKind::Image(data) => Some(&data.definition),
            _ => None,
        }
    }
}

impl HasMaterialSlots for Entity {
    fn capabilities(&self) -> Capabilities {
        match self.kind {
            EntityKind::Face(_) => Capabilities::FRONT_MATERIAL | Capabilities::BACK_MATERIAL,
            EntityKind::Edge(_) | EntityKind::Instance(_) => Capabilities::FRONT_MATERIAL,
            EntityKind::Image(_) | EntityKind::Guide(_) => Capabilities::empty(),
        }
    }

    fn material(&self, side: Side) -> MaterialRef {
        match (&self.kind, side) {
            (EntityKind::Face(face), Side::Front) => face.material,
            (EntityKind::Face(face), Side::Back) => face.back_material,
            (EntityKind::Edge(edge), Side::Front) => edge.material,
            (EntityKind::Instance(instance), Side::Front) => instance.material,
            _ => None,
        }
    }

    fn set_material(&mut self, side: Side, material: MaterialRef) {
        match (&mut self.kind, side) {
            (EntityKind::Face(face), Side::Front) => face.material = material,
            (EntityKind::Face(face), Side::Back) => face.back_material = material,
            (EntityKind::Edge(edge), Side::Front) => edge.material = material,
            (EntityKind::Instance(instance), Side::Front) => instance.material = material,
            _ => {}
        }
    }
}

impl SceneEntity for Entity {
    fn material_slots_mut(&mut self) -> Option<&mut dyn HasMaterialSlots> {
        if self.capabilities().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Reusable block of entities.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Definition {
    pub name: String,
    #[serde(default)]
    pub is_image: bool,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl DefinitionEntities for Definition {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_image(&self) -> bool {
        self.is_image
    }

    fn entities_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn SceneEntity> + '_> {
        Box::new(
            self.entities
                .iter_mut()
                .map(|entity| entity as &mut dyn SceneEntity),
        )
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("entity {entity:?} references unknown definition '{definition}'")]
    UnknownDefinition { entity: EntityId, definition: String },
    #[error("entity {entity:?} references unknown material {material:?}")]
    UnknownMaterial { entity: EntityId, material: MaterialId },
    #[error("instance {entity:?} places image definition '{definition}'")]
    InstancedImage { entity: EntityId, definition: String },
    #[error("image {entity:?} places non-image definition '{definition}'")]
    ImageOfComponent { entity: EntityId, definition: String },
    #[error("definition '{0}' contains itself")]
    RecursiveDefinition(String),
    #[error("definition '{0}' is declared more than once")]
    DuplicateDefinition(String),
    #[error("entity id {0:?} is used more than once")]
    DuplicateEntity(EntityId),
    #[error("material id {0:?} is used more than once")]
    DuplicateMaterial(MaterialId),
}

/// The whole scene: material library, root entities and definition library.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
    #[serde(default)]
    materials: Vec<Material>,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    definitions: Vec<Definition>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.iter().find(|material| material.id == id)
    }

    pub fn add_material(&mut self, name: &str, color: [u8; 4]) -> MaterialId {
        let used: HashSet<u32> = self.materials.iter().map(|material| material.id.0).collect();
        let id = MaterialId(next_free_id(&used));
        self.materials.push(Material {
            id,
            name: name.to_string(),
            display_name: None,
            color,
        });
        id
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.all_entities().find(|entity| entity.id == id)
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|definition| definition.name == name)
    }

    /// Returns the existing definition when one with `name` is already present.
    pub fn add_definition(&mut self, name: &str, is_image: bool) -> &mut Definition {
        let index = match self.definitions.iter().position(|d| d.name == name) {
            Some(index) => index,
            None => {
                self.definitions.push(Definition {
                    name: name.to_string(),
                    is_image,
                    entities: Vec::new(),
                });
                self.definitions.len() - 1
            }
        };
        &mut self.definitions[index]
    }

    pub fn add_entity(&mut self, kind: EntityKind) -> EntityId {
        let id = self.next_entity_id();
        self.entities.push(Entity { id, kind });
        id
    }

    pub fn add_definition_entity(
        &mut self,
        definition: &str,
        kind: EntityKind,
    ) -> Result<EntityId, SceneError> {
        let id = self.next_entity_id();
        let Some(target) = self.definitions.iter_mut().find(|d| d.name == definition) else {
            return Err(SceneError::UnknownDefinition {
                entity: id,
                definition: definition.to_string(),
            });
        };
        target.entities.push(Entity { id, kind });
        Ok(id)
    }

    /// Root entities followed by every definition's entities.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().chain(
            self.definitions
                .iter()
                .flat_map(|definition| definition.entities.iter()),
        )
    }

    /// Number of slots referencing each material, default included.
    pub fn material_usage(&self) -> BTreeMap<MaterialRef, usize> {
        let mut usage = BTreeMap::new();
        for entity in self.all_entities() {
            let capabilities = entity.capabilities();
            for side in Side::ALL {
                if capabilities.contains(side.capability()) {
                    *usage.entry(entity.material(side)).or_insert(0) += 1;
                }
            }
        }
        usage
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        let mut material_ids = HashSet::new();
        for material in &self.materials {
            if !material_ids.insert(material.id) {
                return Err(SceneError::DuplicateMaterial(material.id));
            }
        }

        let mut definition_kinds = HashMap::new();
        for definition in &self.definitions {
            if definition_kinds
                .insert(definition.name.as_str(), definition.is_image)
                .is_some()
            {
                return Err(SceneError::DuplicateDefinition(definition.name.clone()));
            }
        }

        let mut entity_ids = HashSet::new();
        for entity in self.all_entities() {
            if !entity_ids.insert(entity.id) {
                return Err(SceneError::DuplicateEntity(entity.id));
            }
            if let Some(name) = entity.definition_name() {
                let definition = name.to_string();
                match (&entity.kind, definition_kinds.get(name).copied()) {
                    (_, None) => {
                        return Err(SceneError::UnknownDefinition {
                            entity: entity.id,
                            definition,
                        })
                    }
                    (EntityKind::Instance(_), Some(true)) => {
                        return Err(SceneError::InstancedImage {
                            entity: entity.id,
                            definition,
                        })
                    }
                    (EntityKind::Image(_), Some(false)) => {
                        return Err(SceneError::ImageOfComponent {
                            entity: entity.id,
                            definition,
                        })
                    }
                    _ => {}
                }
            }
            for side in Side::ALL {
                if let Some(material) = entity.material(side) {
                    if !material_ids.contains(&material) {
                        return Err(SceneError::UnknownMaterial {
                            entity: entity.id,
                            material,
                        });
                    }
                }
            }
        }

        self.check_nesting()
    }

    fn check_nesting(&self) -> Result<(), SceneError> {
        let children: HashMap<&str, Vec<&str>> = self
            .definitions
            .iter()
            .map(|definition| {
                let nested = definition
                    .entities
                    .iter()
                    .filter_map(Entity::definition_name)
                    .collect();
                (definition.name.as_str(), nested)
            })
            .collect();

        for definition in &self.definitions {
            let mut stack: Vec<&str> = children[definition.name.as_str()].clone();
            let mut seen = HashSet::new();
            while let Some(name) = stack.pop() {
                if name == definition.name {
                    return Err(SceneError::RecursiveDefinition(definition.name.clone()));
                }
                if seen.insert(name) {
                    if let Some(nested) = children.get(name) {
                        stack.extend(nested.iter().copied());
                    }
                }
            }
        }
        Ok(())
    }

    fn next_entity_id(&self) -> EntityId {
        let used: HashSet<u32> = self.all_entities().map(|entity| entity.id.0).collect();
        EntityId(next_free_id(&used))
    }
}

/// One past the largest id in use, or the lowest free id once the largest is
/// `u32::MAX`.
fn next_free_id(used: &HashSet<u32>) -> u32 {
    match used.iter().max() {
        None => 1,
        Some(max) => max
            .checked_add(1)
            .or_else(|| (1..u32::MAX).find(|id| !used.contains(id)))
            .unwrap_or(0),
    }
}

impl SceneGraph for Model {
    fn root_entities_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn SceneEntity> + '_> {
        Box::new(
            self.entities
                .iter_mut()
                .map(|entity| entity as &mut dyn SceneEntity),
        )
    }

    fn definitions_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn DefinitionEntities> + '_> {
        Box::new(
            self.definitions
                .iter_mut()
                .map(|definition| definition as &mut dyn DefinitionEntities),
        )
    }
}

pub fn compose_transform_matrix(
    position: [f32; 3],
    rotation_deg: [f32; 3],
    scale: [f32; 3],
) -> Mat4 {
    let (rx, ry, rz) = (
        rotation_deg[0].to_radians(),
        rotation_deg[1].to_radians(),
        rotation_deg[2].to_radians(),
    );
    let (sx, cx) = rx.sin_cos();
    let (sy, cy) = ry.sin_cos();
    let (sz, cz) = rz.sin_cos();

    // Rotation order: Z (roll) * Y (yaw) * X (pitch)
    let r00 = cz * cy;
    let r01 = cz * sy * sx - sz * cx;
    let r02 = cz * sy * cx + sz * sx;
    let r10 = sz * cy;
    let r11 = sz * sy * sx + cz * cx;
    let r12 = sz * sy * cx - cz * sx;
    let r20 = -sy;
    let r21 = cy * sx;
    let r22 = cy * cx;

    let (sx, sy, sz) = (scale[0], scale[1], scale[2]);
    Mat4::from_cols_array(&[
        r00 * sx,
        r10 * sx,
        r20 * sx,
        0.0,
        r01 * sy,
        r11 * sy,
        r21 * sy,
        0.0,
        r02 * sz,
        r12 * sz,
        r22 * sz,
        0.0,
        position[0],
        position[1],
        position[2],
        1.0,
    ])
}

#[cfg(test)]
pub(crate) fn square_face(center: [f32; 3], half: f32, material: MaterialRef) -> EntityKind {
    let [x, y, z] = center;
    EntityKind::Face(FaceData {
        vertices: vec![
            [x - half, y - half, z],
            [x + half, y - half, z],
            [x + half, y + half, z],
            [x - half, y + half, z],
        ],
        material,
        back_material: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn instance(definition: &str) -> EntityKind {
        EntityKind::Instance(InstanceData {
            definition: definition.to_string(),
            transform: TransformData::default(),
            material: None,
        })
    }

    #[test]
    fn counter_clockwise_square_faces_up() {
        let EntityKind::Face(face) = square_face([0.0, 0.0, 0.0], 1.0, None) else {
            unreachable!()
        };
        let normal = face.normal();
        assert_relative_eq!(normal.z, 1.0, epsilon = 1e-6);
        assert_relative_eq!(normal.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_face_has_zero_normal() {
        let face = FaceData {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            material: None,
            back_material: None,
        };
        assert_eq!(face.normal(), Vec3::ZERO);
    }

    #[test]
    fn capabilities_follow_entity_kind() {
        let mut model = Model::new();
        let face = model.add_entity(square_face([0.0; 3], 1.0, None));
        let guide = model.add_entity(EntityKind::Guide(GuideData {
            position: [0.0; 3],
        }));
        assert_eq!(
            model.entity(face).unwrap().capabilities(),
            Capabilities::FRONT_MATERIAL | Capabilities::BACK_MATERIAL
        );
        assert!(model.entity(guide).unwrap().capabilities().is_empty());
    }

    #[test]
    fn edges_ignore_back_material_writes() {
        let mut entity = Entity {
            id: EntityId(1),
            kind: EntityKind::Edge(EdgeData {
                start: [0.0; 3],
                end: [1.0, 0.0, 0.0],
                material: None,
            }),
        };
        entity.set_material(Side::Back, Some(MaterialId(4)));
        assert_eq!(entity.material(Side::Back), None);
        entity.set_material(Side::Front, Some(MaterialId(4)));
        assert_eq!(entity.material(Side::Front), Some(MaterialId(4)));
    }

    #[test]
    fn entity_ids_are_unique_across_definitions() {
        let mut model = Model::new();
        let a = model.add_entity(square_face([0.0; 3], 1.0, None));
        model.add_definition("Block", false);
        let b = model
            .add_definition_entity("Block", square_face([0.0; 3], 1.0, None))
            .unwrap();
        let c = model.add_entity(instance("Block"));
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn adding_to_missing_definition_fails() {
        let mut model = Model::new();
        let result = model.add_definition_entity("Missing", square_face([0.0; 3], 1.0, None));
        assert!(matches!(result, Err(SceneError::UnknownDefinition { .. })));
    }

    #[test]
    fn validate_rejects_unknown_definition() {
        let mut model = Model::new();
        model.add_entity(instance("Ghost"));
        assert!(matches!(
            model.validate(),
            Err(SceneError::UnknownDefinition { definition, .. }) if definition == "Ghost"
        ));
    }

    #[test]
    fn validate_rejects_mismatched_placements() {
        let mut model = Model::new();
        model.add_definition("Logo", true);
        model.add_entity(instance("Logo"));
        assert!(matches!(
            model.validate(),
            Err(SceneError::InstancedImage { definition, .. }) if definition == "Logo"
        ));

        let mut model = Model::new();
        model.add_definition("Block", false);
        model.add_entity(EntityKind::Image(ImageData {
            definition: "Block".to_string(),
            transform: TransformData::default(),
        }));
        assert!(matches!(
            model.validate(),
            Err(SceneError::ImageOfComponent { definition, .. }) if definition == "Block"
        ));
    }

    #[test]
    fn validate_accepts_image_placing_image_definition() {
        let mut model = Model::new();
        model.add_definition("Logo", true);
        model
            .add_definition_entity("Logo", square_face([0.0; 3], 1.0, None))
            .unwrap();
        model.add_entity(EntityKind::Image(ImageData {
            definition: "Logo".to_string(),
            transform: TransformData::default(),
        }));
        assert!(model.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_material() {
        let mut model = Model::new();
        model.add_entity(square_face([0.0; 3], 1.0, Some(MaterialId(9))));
        assert!(matches!(
            model.validate(),
            Err(SceneError::UnknownMaterial { material: MaterialId(9), .. })
        ));
    }

    #[test]
    fn validate_rejects_indirect_recursion() {
        let mut model = Model::new();
        model.add_definition("A", false);
        model.add_definition("B", false);
        model.add_definition_entity("A", instance("B")).unwrap();
        model.add_definition_entity("B", instance("A")).unwrap();
        assert!(matches!(
            model.validate(),
            Err(SceneError::RecursiveDefinition(_))
        ));
    }

    #[test]
    fn material_usage_counts_every_slot() {
        let mut model = Model::new();
        let brick = model.add_material("Brick", [180, 60, 40, 255]);
        model.add_entity(square_face([0.0; 3], 1.0, Some(brick)));
        model.add_definition("Block", false);
        model
            .add_definition_entity("Block", square_face([0.0; 3], 1.0, Some(brick)))
            .unwrap();

        let usage = model.material_usage();
        assert_eq!(usage[&Some(brick)], 2);
        // back sides of both faces
        assert_eq!(usage[&None], 2);
    }

    #[test]
    fn ids_past_u32_max_reuse_free_slots() {
        let mut model: Model = serde_json::from_str(
            r#"{
                "materials": [{ "id": 4294967295, "name": "Last" }],
                "entities": [
                    { "id": 4294967295, "kind": { "type": "guide", "position": [0, 0, 0] } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(model.add_material("Next", [0, 0, 0, 255]), MaterialId(1));
        assert_eq!(model.add_material("Then", [0, 0, 0, 255]), MaterialId(2));
        assert_eq!(model.add_entity(instance("Block")), EntityId(1));
    }

    #[test]
    fn display_name_falls_back_to_name() {
        let mut model = Model::new();
        let id = model.add_material("brick_01", [0, 0, 0, 255]);
        assert_eq!(model.material(id).unwrap().display_name(), "brick_01");
    }

    #[test]
    fn transform_matrix_translates_and_scales() {
        let matrix = compose_transform_matrix([1.0, 2.0, 3.0], [0.0; 3], [2.0, 2.0, 2.0]);
        let point = matrix.transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(point.x, 3.0, epsilon = 1e-6);
        assert_relative_eq!(point.y, 4.0, epsilon = 1e-6);
        assert_relative_eq!(point.z, 5.0, epsilon = 1e-6);
    }
}
