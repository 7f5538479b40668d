//! Pick-and-replace material tool.
//!
//! The user clicks a surface to capture the material visible there, then
//! clicks a second surface; every material slot in the scene holding the
//! first material is reassigned to the second in one undoable operation.
//! The tool core talks to its host through the traits in [`host`];
//! [`app::MemoryHost`] runs it against an in-memory scene.

pub mod app;
pub mod config;
pub mod error;
pub mod host;
pub mod render;
pub mod scene;
pub mod tool;

pub use config::ReplacerConfig;
pub use error::{Error, Result};
pub use host::{Capabilities, CursorKind, Operation, ReplacerHost, SceneQuery, Transactions};
pub use scene::{MaterialId, MaterialRef, Model};
pub use tool::{ClickOutcome, MaterialReplacer, Phase, ReplaceStats};
