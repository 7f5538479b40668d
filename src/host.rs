//! Host services consumed by the replace tool.
//!
//! The tool never touches ambient global state: everything it needs from the
//! modeling application (picking, camera, scene graph, undo transactions,
//! status line, cursor, redraw) arrives through the traits in this module.
//! `app::MemoryHost` is the in-process implementation used by the command line
//! driver and the tests.

use std::ops::{Deref, DerefMut};

use bitflags::bitflags;
use glam::Vec3;

use crate::error::Result;
use crate::render::pick::PickHelper;
use crate::scene::{MaterialId, MaterialRef};

bitflags! {
    /// Material slots an entity exposes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const FRONT_MATERIAL = 0b01;
        const BACK_MATERIAL = 0b10;
    }
}

/// One side of a two-sided surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Front, Side::Back];

    pub fn capability(self) -> Capabilities {
        match self {
            Side::Front => Capabilities::FRONT_MATERIAL,
            Side::Back => Capabilities::BACK_MATERIAL,
        }
    }
}

/// Read/write access to the material slots of an entity.
///
/// `material`/`set_material` are only meaningful for sides reported by
/// `capabilities`; other sides read as unset and ignore writes.
pub trait HasMaterialSlots {
    fn capabilities(&self) -> Capabilities;
    fn material(&self, side: Side) -> MaterialRef;
    fn set_material(&mut self, side: Side, material: MaterialRef);
}

/// An entity in one of the host's entity collections.
pub trait SceneEntity {
    /// `None` when the entity has no material semantics at all.
    fn material_slots_mut(&mut self) -> Option<&mut dyn HasMaterialSlots>;
}

/// A component definition in the host's definition library.
pub trait DefinitionEntities {
    fn name(&self) -> &str;
    fn is_image(&self) -> bool;
    fn entities_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn SceneEntity> + '_>;
}

/// Mutable view of the whole scene graph.
pub trait SceneGraph {
    fn root_entities_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn SceneEntity> + '_>;
    fn definitions_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn DefinitionEntities> + '_>;
}

/// Pick service plus the camera state needed to interpret its results.
pub trait SceneQuery {
    /// Direction the active camera is looking, in world space.
    fn view_direction(&self) -> Vec3;

    /// Run a pick at a screen position. The returned results stay valid until
    /// the next pick.
    fn do_pick(&mut self, x: f32, y: f32) -> &dyn PickHelper;
}

/// The host's undoable operation facility.
pub trait Transactions {
    fn start_operation(&mut self, name: &str) -> Result<()>;
    fn commit_operation(&mut self) -> Result<()>;
    fn abort_operation(&mut self);
}

/// Cursor icons the tool switches between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorKind {
    #[default]
    Dropper,
    DropperInvalid,
}

/// Everything the replace tool needs from its host application.
pub trait ReplacerHost: SceneQuery + Transactions {
    fn model_mut(&mut self) -> &mut dyn SceneGraph;
    fn material_display_name(&self, material: MaterialId) -> Option<String>;
    fn set_status_text(&mut self, text: &str);
    fn set_cursor(&mut self, cursor: CursorKind);
    /// Request a redraw of the viewport overlay.
    fn invalidate(&mut self);
}

/// Scoped undo operation.
///
/// Created by [`Operation::start`]; aborted on drop unless [`Operation::commit`]
/// was called, so every exit path of the wrapped work either commits or rolls
/// back. Derefs to the host so the work runs through the guard.
pub struct Operation<'h, T: Transactions + ?Sized> {
    host: &'h mut T,
    open: bool,
}

impl<'h, T: Transactions + ?Sized> Operation<'h, T> {
    pub fn start(host: &'h mut T, name: &str) -> Result<Self> {
        host.start_operation(name)?;
        Ok(Self { host, open: true })
    }

    pub fn commit(mut self) -> Result<()> {
        self.open = false;
        self.host.commit_operation()
    }
}

impl<T: Transactions + ?Sized> Deref for Operation<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.host
    }
}

impl<T: Transactions + ?Sized> DerefMut for Operation<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.host
    }
}

impl<T: Transactions + ?Sized> Drop for Operation<'_, T> {
    fn drop(&mut self) {
        if self.open {
            log::warn!("Operation dropped without commit, rolling back");
            self.host.abort_operation();
        }
    }
}
