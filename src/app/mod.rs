//! Command line driver: replays a scripted viewport session through the
//! replace tool against an in-memory scene.

mod input;
mod memory_host;

pub use input::{CameraSetup, InputEvent, SessionScript};
pub use memory_host::MemoryHost;

use std::path::PathBuf;

use clap::Parser;

use crate::config::ReplacerConfig;
use crate::error::Result;
use crate::render::annotation::RecordingSurface;
use crate::scene::serialization::{load_model_from_file, save_model_to_file};
use crate::scene::Model;
use crate::tool::{ClickOutcome, MaterialReplacer, ReplaceStats, DEFAULT_MATERIAL_NAME};

#[derive(Debug, Parser)]
#[command(
    name = "material-replacer",
    version,
    about = "Replay a material replace session against a scene"
)]
pub struct Args {
    /// Scene file (JSON).
    pub scene: PathBuf,

    /// Session script with camera setup and viewport events.
    #[arg(long)]
    pub script: PathBuf,

    /// Where to write the resulting scene.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Tool configuration (JSON).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log per-event resolution and annotation.
    #[arg(short, long)]
    pub verbose: bool,
}

/// What happened during a replayed session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub events: usize,
    pub sources_captured: usize,
    pub ignored_clicks: usize,
    pub replacements: Vec<ReplaceStats>,
    pub undone: usize,
}

/// Feed `events` to the tool in order. A transaction failure stops the
/// replay and is returned.
pub fn replay(
    tool: &mut MaterialReplacer<MemoryHost>,
    events: &[InputEvent],
) -> Result<SessionReport> {
    let mut report = SessionReport::default();
    let mut surface = RecordingSurface::new();

    for event in events {
        dispatch(tool, event, &mut report)?;
        report.events += 1;

        if tool.host_mut().take_redraw_request() {
            surface.clear();
            tool.draw(&mut surface);
            log::debug!("Annotation: {:?}", surface.last_text().unwrap_or_default());
        }
        log::debug!("Status: {}", tool.host().status());
    }

    Ok(report)
}

fn dispatch(
    tool: &mut MaterialReplacer<MemoryHost>,
    event: &InputEvent,
    report: &mut SessionReport,
) -> Result<()> {
    match *event {
        InputEvent::Move { x, y } => {
            tool.on_mouse_move(x, y);
            tool.on_set_cursor();
        }
        InputEvent::Click { x, y } => {
            tool.on_mouse_move(x, y);
            match tool.on_lbutton_up()? {
                ClickOutcome::SourceCaptured(_) => report.sources_captured += 1,
                ClickOutcome::Ignored => report.ignored_clicks += 1,
                ClickOutcome::Replaced(stats) => report.replacements.push(stats),
            }
            tool.on_set_cursor();
        }
        InputEvent::Orbit {
            pivot,
            yaw_deg,
            pitch_deg,
        } => {
            tool.host_mut().camera_mut().orbit_around(
                glam::Vec3::from_array(pivot),
                yaw_deg.to_radians(),
                pitch_deg.to_radians(),
            );
            // Same pixel, different surface underneath.
            let pointer = tool.pointer_position();
            tool.on_mouse_move(pointer.x, pointer.y);
        }
        InputEvent::Undo => match tool.host_mut().undo()? {
            Some(_) => report.undone += 1,
            None => log::warn!("Nothing to undo"),
        },
        InputEvent::Activate => tool.activate(),
    }
    Ok(())
}

/// Slot count per material, library order, default material last.
pub fn usage_summary(model: &Model) -> Vec<(String, usize)> {
    let usage = model.material_usage();
    let mut summary: Vec<(String, usize)> = model
        .materials()
        .iter()
        .map(|material| {
            let count = usage.get(&Some(material.id)).copied().unwrap_or(0);
            (material.display_name().to_string(), count)
        })
        .collect();
    summary.push((
        DEFAULT_MATERIAL_NAME.to_string(),
        usage.get(&None).copied().unwrap_or(0),
    ));
    summary
}

pub fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ReplacerConfig::load(path)?,
        None => ReplacerConfig::default(),
    };
    let model = load_model_from_file(&args.scene)?;
    let script = SessionScript::from_file(&args.script)?;
    log::info!(
        "Loaded {} ({} materials, {} root entities, {} definitions)",
        args.scene.display(),
        model.materials().len(),
        model.entities().len(),
        model.definitions().len()
    );

    let host =
        MemoryHost::new(model, script.camera()).with_edge_tolerance(config.edge_tolerance_px);
    let mut tool = MaterialReplacer::new(host, config);
    tool.activate();

    let report = replay(&mut tool, &script.events)?;
    log::info!(
        "Replayed {} events: {} replacements, {} slots changed, {} undone",
        report.events,
        report.replacements.len(),
        report.replacements.iter().map(ReplaceStats::replaced).sum::<usize>(),
        report.undone
    );

    tool.deactivate();
    let model = tool.into_host().into_model();
    if let Some(out) = &args.out {
        save_model_to_file(&model, out)?;
        log::info!("Scene written to {}", out.display());
    }

    println!("Material usage:");
    for (name, count) in usage_summary(&model) {
        println!("  {name:<24} {count}");
    }
    Ok(())
}
