//! Global material substitution.
//!
//! One pass over the root entities and over the entities of every non-image
//! definition. Front and back slots are checked independently. The pass
//! itself is not transactional; callers wrap it in an [`Operation`].
//!
//! [`Operation`]: crate::host::Operation

use crate::host::{SceneEntity, SceneGraph, Side};
use crate::scene::MaterialRef;

/// What a substitution pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceStats {
    pub entities_visited: usize,
    pub definitions_visited: usize,
    pub images_skipped: usize,
    pub front_replaced: usize,
    pub back_replaced: usize,
}

impl ReplaceStats {
    /// Number of slots reassigned.
    pub fn replaced(&self) -> usize {
        self.front_replaced + self.back_replaced
    }
}

/// Reassign every slot holding `source` to `target`.
pub fn replace_materials(
    graph: &mut dyn SceneGraph,
    source: MaterialRef,
    target: MaterialRef,
) -> ReplaceStats {
    let mut stats = ReplaceStats::default();

    for entity in graph.root_entities_mut() {
        replace_in_entity(entity, source, target, &mut stats);
    }

    for definition in graph.definitions_mut() {
        if definition.is_image() {
            log::trace!("Skipping image definition '{}'", definition.name());
            stats.images_skipped += 1;
            continue;
        }
        stats.definitions_visited += 1;
        for entity in definition.entities_mut() {
            replace_in_entity(entity, source, target, &mut stats);
        }
    }

    log::debug!(
        "Substitution visited {} entities in {} definitions, replaced {} front and {} back slots",
        stats.entities_visited,
        stats.definitions_visited,
        stats.front_replaced,
        stats.back_replaced
    );
    stats
}

fn replace_in_entity(
    entity: &mut dyn SceneEntity,
    source: MaterialRef,
    target: MaterialRef,
    stats: &mut ReplaceStats,
) {
    stats.entities_visited += 1;
    let Some(slots) = entity.material_slots_mut() else {
        return;
    };
    let capabilities = slots.capabilities();
    for side in Side::ALL {
        if !capabilities.contains(side.capability()) || slots.material(side) != source {
            continue;
        }
        slots.set_material(side, target);
        match side {
            Side::Front => stats.front_replaced += 1,
            Side::Back => stats.back_replaced += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HasMaterialSlots;
    use crate::scene::{
        square_face, EdgeData, EntityKind, FaceData, GuideData, ImageData, InstanceData, MaterialId,
        Model, TransformData,
    };

    struct Fixture {
        model: Model,
        brick: MaterialRef,
        glass: MaterialRef,
    }

    fn fixture() -> Fixture {
        let mut model = Model::new();
        let brick = Some(model.add_material("Brick", [180, 60, 40, 255]));
        let glass = Some(model.add_material("Glass", [80, 120, 255, 128]));

        model.add_entity(square_face([0.0; 3], 1.0, brick));
        model.add_entity(EntityKind::Guide(GuideData { position: [0.0; 3] }));
        model.add_definition("Block", false);
        model
            .add_definition_entity(
                "Block",
                EntityKind::Face(FaceData {
                    vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
                    material: glass,
                    back_material: brick,
                }),
            )
            .unwrap();
        model
            .add_definition_entity(
                "Block",
                EntityKind::Edge(EdgeData {
                    start: [0.0; 3],
                    end: [1.0, 0.0, 0.0],
                    material: glass,
                }),
            )
            .unwrap();
        model.add_entity(EntityKind::Instance(InstanceData {
            definition: "Block".to_string(),
            transform: TransformData::default(),
            material: brick,
        }));
        model.add_definition("Logo", true);
        model
            .add_definition_entity("Logo", square_face([0.0; 3], 1.0, brick))
            .unwrap();
        model.add_entity(EntityKind::Image(ImageData {
            definition: "Logo".to_string(),
            transform: TransformData::default(),
        }));

        Fixture { model, brick, glass }
    }

    fn slots(model: &Model) -> Vec<(MaterialRef, MaterialRef)> {
        model
            .all_entities()
            .map(|entity| (entity.material(Side::Front), entity.material(Side::Back)))
            .collect()
    }

    #[test]
    fn replaces_front_and_back_independently() {
        let Fixture {
            mut model,
            brick,
            glass,
        } = fixture();
        let wood = Some(model.add_material("Wood", [140, 90, 40, 255]));

        let stats = replace_materials(&mut model, brick, wood);
        // root face front, instance, Block face back
        assert_eq!(stats.front_replaced, 2);
        assert_eq!(stats.back_replaced, 1);
        assert_eq!(stats.images_skipped, 1);
        assert_eq!(stats.definitions_visited, 1);

        let block = &model.definition("Block").unwrap().entities;
        assert_eq!(block[0].material(Side::Front), glass);
        assert_eq!(block[0].material(Side::Back), wood);
        assert_eq!(block[1].material(Side::Front), glass);
    }

    #[test]
    fn image_definitions_are_untouched() {
        let Fixture { mut model, brick, glass } = fixture();
        replace_materials(&mut model, brick, glass);
        let logo = &model.definition("Logo").unwrap().entities;
        assert_eq!(logo[0].material(Side::Front), brick);
    }

    #[test]
    fn absent_source_changes_nothing() {
        let Fixture { mut model, .. } = fixture();
        let unused = Some(model.add_material("Unused", [0, 0, 0, 255]));
        let before = model.clone();

        let stats = replace_materials(&mut model, unused, Some(MaterialId(1)));
        assert_eq!(stats.replaced(), 0);
        assert_eq!(model, before);
    }

    #[test]
    fn second_identical_pass_is_a_no_op() {
        let Fixture { mut model, brick, glass } = fixture();
        let first = replace_materials(&mut model, brick, glass);
        assert!(first.replaced() > 0);
        let after_first = slots(&model);

        let second = replace_materials(&mut model, brick, glass);
        assert_eq!(second.replaced(), 0);
        assert_eq!(slots(&model), after_first);
    }

    #[test]
    fn default_source_paints_unpainted_slots() {
        let Fixture { mut model, brick, .. } = fixture();
        let stats = replace_materials(&mut model, None, brick);
        // root face back, Block edge has glass, guide and image have no slots
        assert_eq!(stats.back_replaced, 1);
        assert_eq!(stats.front_replaced, 0);
        assert!(model
            .entities()
            .iter()
            .filter(|entity| !entity.capabilities().is_empty())
            .all(|entity| entity.material(Side::Front).is_some()));
    }

    #[test]
    fn clearing_to_default_is_allowed() {
        let Fixture { mut model, glass, .. } = fixture();
        let stats = replace_materials(&mut model, glass, None);
        assert_eq!(stats.front_replaced, 2);
        let block = &model.definition("Block").unwrap().entities;
        assert_eq!(block[0].material(Side::Front), None);
    }
}
