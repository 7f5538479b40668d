use std::path::Path;

use glam::Vec3;

use crate::render::camera::ViewCamera;
use crate::scene::serialization::SerializationError;

/// One scripted viewport event. Screen positions are in pixels with the
/// origin at the top left of the viewport.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Move { x: f32, y: f32 },
    /// Pointer moves to the position, then the primary button is released.
    Click { x: f32, y: f32 },
    Orbit {
        pivot: [f32; 3],
        yaw_deg: f32,
        pitch_deg: f32,
    },
    Undo,
    /// Re-activate the tool, dropping any captured source.
    Activate,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraSetup {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub fov_deg: f32,
}

impl Default for CameraSetup {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 10.0],
            target: [0.0, 0.0, 0.0],
            fov_deg: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionScript {
    #[serde(default)]
    pub camera: CameraSetup,
    #[serde(default = "default_viewport")]
    pub viewport: [f32; 2],
    pub events: Vec<InputEvent>,
}

fn default_viewport() -> [f32; 2] {
    [1280.0, 720.0]
}

impl SessionScript {
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SerializationError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn camera(&self) -> ViewCamera {
        ViewCamera::look_at(
            Vec3::from_array(self.camera.eye),
            Vec3::from_array(self.camera.target),
        )
        .with_fov(self.camera.fov_deg)
        .with_viewport(self.viewport[0], self.viewport[1])
    }
}
