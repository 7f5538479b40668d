//! Material replace tool.
//!
//! Two-click workflow: the first click captures the material visible under
//! the cursor, the second click replaces it everywhere with the material
//! visible at the second position. The tool then starts over, so several
//! replacements can be made without re-activating it.

pub mod replace;

pub use replace::{replace_materials, ReplaceStats};

use glam::Vec2;

use crate::config::ReplacerConfig;
use crate::error::Result;
use crate::host::{CursorKind, Operation, ReplacerHost};
use crate::render::annotation::{draw_label, ViewSurface};
use crate::render::pick::resolve;
use crate::scene::MaterialRef;

/// Label used for the default (unset) material.
pub const DEFAULT_MATERIAL_NAME: &str = "Default";

const PICK_SOURCE_PROMPT: &str = "Pick a material to replace.";
const REPLACING_STATUS: &str = "Replacing materials. Please wait...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingSource,
    AwaitingTarget { source: MaterialRef },
}

/// Result of a primary click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    SourceCaptured(MaterialRef),
    /// Target equals the source; nothing to do.
    Ignored,
    Replaced(ReplaceStats),
}

pub struct MaterialReplacer<H: ReplacerHost> {
    host: H,
    config: ReplacerConfig,
    phase: Phase,
    hovered: MaterialRef,
    pointer: Vec2,
    drawn: bool,
}

impl<H: ReplacerHost> MaterialReplacer<H> {
    pub fn new(host: H, config: ReplacerConfig) -> Self {
        Self {
            host,
            config,
            phase: Phase::AwaitingSource,
            hovered: None,
            pointer: Vec2::ZERO,
            drawn: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &ReplacerConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn hovered_material(&self) -> MaterialRef {
        self.hovered
    }

    /// The captured source; `None` while awaiting the source.
    pub fn source_material(&self) -> MaterialRef {
        match self.phase {
            Phase::AwaitingSource => None,
            Phase::AwaitingTarget { source } => source,
        }
    }

    pub fn pointer_position(&self) -> Vec2 {
        self.pointer
    }

    pub fn activate(&mut self) {
        self.phase = Phase::AwaitingSource;
        self.hovered = None;
        self.pointer = Vec2::ZERO;
        self.drawn = false;
        self.update_ui();
    }

    pub fn resume(&mut self) {
        self.update_ui();
    }

    pub fn deactivate(&mut self) {
        if self.drawn {
            self.host.invalidate();
            self.drawn = false;
        }
    }

    pub fn on_mouse_move(&mut self, x: f32, y: f32) {
        self.hovered = resolve(&mut self.host, x, y);
        log::debug!("Material under ({}, {}): {:?}", x, y, self.hovered);
        self.pointer = Vec2::new(x, y);
        self.host.invalidate();
    }

    pub fn on_lbutton_up(&mut self) -> Result<ClickOutcome> {
        match self.phase {
            Phase::AwaitingSource => {
                let source = self.hovered;
                self.phase = Phase::AwaitingTarget { source };
                log::info!("Picked {} as the material to replace", self.display_name(source));
                self.update_ui();
                Ok(ClickOutcome::SourceCaptured(source))
            }
            Phase::AwaitingTarget { source } => {
                let target = self.hovered;
                if target == source {
                    log::debug!("Target equals source, click ignored");
                    return Ok(ClickOutcome::Ignored);
                }
                let stats = match self.replace(source, target) {
                    Ok(stats) => stats,
                    Err(err) => {
                        log::warn!("Replacing materials failed: {}", err);
                        self.update_ui();
                        return Err(err);
                    }
                };
                log::info!(
                    "Replaced {} with {} in {} slots",
                    self.display_name(source),
                    self.display_name(target),
                    stats.replaced()
                );
                self.activate();
                Ok(ClickOutcome::Replaced(stats))
            }
        }
    }

    /// Label shown next to the cursor.
    pub fn annotation_text(&self) -> String {
        let hovered = self.display_name(self.hovered);
        match self.phase {
            Phase::AwaitingSource => format!("Replace {hovered} ..."),
            Phase::AwaitingTarget { source } => {
                format!("Replace {}\nwith {}", self.display_name(source), hovered)
            }
        }
    }

    pub fn draw(&mut self, surface: &mut dyn ViewSurface) {
        let text = self.annotation_text();
        draw_label(surface, self.pointer, &text, &self.config.annotation);
        self.drawn = true;
    }

    pub fn cursor(&self) -> CursorKind {
        match self.phase {
            Phase::AwaitingTarget { source } if source == self.hovered => {
                CursorKind::DropperInvalid
            }
            _ => CursorKind::Dropper,
        }
    }

    pub fn on_set_cursor(&mut self) {
        let cursor = self.cursor();
        self.host.set_cursor(cursor);
    }

    fn replace(&mut self, source: MaterialRef, target: MaterialRef) -> Result<ReplaceStats> {
        let mut operation = Operation::start(&mut self.host, &self.config.operation_name)?;
        operation.set_status_text(REPLACING_STATUS);
        let stats = replace_materials(operation.model_mut(), source, target);
        operation.commit()?;
        Ok(stats)
    }

    fn update_ui(&mut self) {
        match self.phase {
            Phase::AwaitingSource => self.host.set_status_text(PICK_SOURCE_PROMPT),
            Phase::AwaitingTarget { source } => {
                let name = self.display_name(source);
                self.host
                    .set_status_text(&format!("Pick another material to replace {name}."));
            }
        }
    }

    fn display_name(&self, material: MaterialRef) -> String {
        material
            .and_then(|id| self.host.material_display_name(id))
            .unwrap_or_else(|| DEFAULT_MATERIAL_NAME.to_string())
    }
}
