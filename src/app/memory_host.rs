//! In-process host for running the replace tool outside a modeling
//! application.
//!
//! Picks are raycast against the owned [`Model`], operations are whole-model
//! snapshots, and the status line, cursor and redraw requests are recorded
//! so callers can inspect them after each event.

use glam::Vec3;

use crate::error::{Error, Result};
use crate::host::{CursorKind, ReplacerHost, SceneGraph, SceneQuery, Transactions};
use crate::render::camera::ViewCamera;
use crate::render::pick::{PickHelper, PickList};
use crate::render::raycast;
use crate::scene::{MaterialId, Model};

struct OpenOperation {
    name: String,
    snapshot: Model,
}

/// A committed operation that can be undone.
struct UndoEntry {
    name: String,
    snapshot: Model,
}

pub struct MemoryHost {
    model: Model,
    camera: ViewCamera,
    edge_tolerance_px: f32,
    picks: PickList,
    status: String,
    cursor: CursorKind,
    redraw_requested: bool,
    open: Option<OpenOperation>,
    undo_stack: Vec<UndoEntry>,
}

impl MemoryHost {
    pub fn new(model: Model, camera: ViewCamera) -> Self {
        Self {
            model,
            camera,
            edge_tolerance_px: 3.0,
            picks: PickList::new(),
            status: String::new(),
            cursor: CursorKind::default(),
            redraw_requested: false,
            open: None,
            undo_stack: Vec::new(),
        }
    }

    pub fn with_edge_tolerance(mut self, pixels: f32) -> Self {
        self.edge_tolerance_px = pixels.max(0.0);
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    pub fn camera(&self) -> &ViewCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut ViewCamera {
        &mut self.camera
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn cursor(&self) -> CursorKind {
        self.cursor
    }

    /// Results of the most recent pick.
    pub fn last_picks(&self) -> &PickList {
        &self.picks
    }

    pub fn is_operation_open(&self) -> bool {
        self.open.is_some()
    }

    /// Names of committed operations, oldest first.
    pub fn undo_names(&self) -> impl Iterator<Item = &str> {
        self.undo_stack.iter().map(|entry| entry.name.as_str())
    }

    /// Returns whether a redraw was requested since the last call.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Restore the model as it was before the last committed operation.
    /// Returns the undone operation's name, `None` when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> Result<Option<String>> {
        if let Some(open) = &self.open {
            return Err(Error::OperationInProgress {
                open: open.name.clone(),
                requested: "Undo".to_string(),
            });
        }
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(None);
        };
        log::info!("Undo {}", entry.name);
        self.model = entry.snapshot;
        self.redraw_requested = true;
        Ok(Some(entry.name))
    }
}

impl SceneQuery for MemoryHost {
    fn view_direction(&self) -> Vec3 {
        self.camera.direction()
    }

    fn do_pick(&mut self, x: f32, y: f32) -> &dyn PickHelper {
        self.picks = raycast::pick(&self.model, &self.camera, x, y, self.edge_tolerance_px);
        &self.picks
    }
}

impl Transactions for MemoryHost {
    fn start_operation(&mut self, name: &str) -> Result<()> {
        if let Some(open) = &self.open {
            log::warn!("Refusing to start '{}' inside '{}'", name, open.name);
            return Err(Error::OperationInProgress {
                open: open.name.clone(),
                requested: name.to_string(),
            });
        }
        self.open = Some(OpenOperation {
            name: name.to_string(),
            snapshot: self.model.clone(),
        });
        Ok(())
    }

    fn commit_operation(&mut self) -> Result<()> {
        let open = self
            .open
            .take()
            .ok_or(Error::NoOpenOperation { action: "commit" })?;
        log::debug!("Committed '{}'", open.name);
        self.undo_stack.push(UndoEntry {
            name: open.name,
            snapshot: open.snapshot,
        });
        Ok(())
    }

    fn abort_operation(&mut self) {
        match self.open.take() {
            Some(open) => {
                log::warn!("Aborted '{}', scene restored", open.name);
                self.model = open.snapshot;
            }
            None => log::warn!("Abort requested with no open operation"),
        }
    }
}

impl ReplacerHost for MemoryHost {
    fn model_mut(&mut self) -> &mut dyn SceneGraph {
        &mut self.model
    }

    fn material_display_name(&self, material: MaterialId) -> Option<String> {
        self.model
            .material(material)
            .map(|material| material.display_name().to_string())
    }

    fn set_status_text(&mut self, text: &str) {
        self.status = text.to_string();
    }

    fn set_cursor(&mut self, cursor: CursorKind) {
        self.cursor = cursor;
    }

    fn invalidate(&mut self) {
        self.redraw_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Operation;
    use crate::render::pick::visible_material;
    use crate::scene::square_face;
    use crate::tool::replace_materials;

    fn host() -> (MemoryHost, MaterialId, MaterialId) {
        let mut model = Model::new();
        let brick = model.add_material("Brick", [180, 60, 40, 255]);
        let glass = model.add_material("Glass", [80, 120, 255, 128]);
        model.add_entity(square_face([0.0; 3], 2.0, Some(brick)));
        let camera = ViewCamera::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO)
            .with_fov(90.0)
            .with_viewport(200.0, 200.0);
        (MemoryHost::new(model, camera), brick, glass)
    }

    #[test]
    fn picks_through_the_camera() {
        let (mut host, brick, _) = host();
        let direction = host.view_direction();
        let picks = host.do_pick(100.0, 100.0);
        assert_eq!(picks.count(), 1);
        assert_eq!(visible_material(picks, direction), Some(brick));

        assert_eq!(host.do_pick(5.0, 5.0).count(), 0);
        assert!(host.last_picks().is_empty());
    }

    #[test]
    fn commit_then_undo_restores_snapshot() {
        let (mut host, brick, glass) = host();
        let before = host.model().clone();

        let mut operation = Operation::start(&mut host, "Replace Materials").unwrap();
        replace_materials(operation.model_mut(), Some(brick), Some(glass));
        operation.commit().unwrap();

        assert_ne!(host.model(), &before);
        assert_eq!(host.undo_names().collect::<Vec<_>>(), ["Replace Materials"]);
        assert_eq!(host.undo().unwrap().as_deref(), Some("Replace Materials"));
        assert_eq!(host.model(), &before);
        assert_eq!(host.undo().unwrap(), None);
    }

    #[test]
    fn dropped_operation_restores_scene() {
        let (mut host, brick, glass) = host();
        let before = host.model().clone();
        {
            let mut operation = Operation::start(&mut host, "Replace Materials").unwrap();
            replace_materials(operation.model_mut(), Some(brick), Some(glass));
        }
        assert_eq!(host.model(), &before);
        assert!(!host.is_operation_open());
        assert_eq!(host.undo_names().count(), 0);
    }

    #[test]
    fn nested_start_is_rejected() {
        let (mut host, _, _) = host();
        host.start_operation("First").unwrap();
        assert!(matches!(
            host.start_operation("Second"),
            Err(Error::OperationInProgress { ref open, ref requested })
                if open == "First" && requested == "Second"
        ));
        assert!(matches!(host.undo(), Err(Error::OperationInProgress { .. })));
        host.commit_operation().unwrap();
    }

    #[test]
    fn commit_without_start_is_rejected() {
        let (mut host, _, _) = host();
        assert!(matches!(
            host.commit_operation(),
            Err(Error::NoOpenOperation { action: "commit" })
        ));
    }

    #[test]
    fn ui_state_is_recorded() {
        let (mut host, brick, _) = host();
        host.set_status_text("Pick a material to replace.");
        host.set_cursor(CursorKind::DropperInvalid);
        host.invalidate();
        assert_eq!(host.status(), "Pick a material to replace.");
        assert_eq!(host.cursor(), CursorKind::DropperInvalid);
        assert!(host.take_redraw_request());
        assert!(!host.take_redraw_request());
        assert_eq!(host.material_display_name(brick).as_deref(), Some("Brick"));
        assert_eq!(host.material_display_name(MaterialId(99)), None);
    }
}
