//! Tool configuration.

use std::path::Path;

use crate::render::AnnotationStyle;
use crate::scene::serialization::SerializationError;

/// Settings of one replace tool session. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReplacerConfig {
    /// Name of the undo entry created by a replacement.
    pub operation_name: String,
    pub annotation: AnnotationStyle,
    /// How close, in pixels, the cursor must be to an edge to pick it.
    pub edge_tolerance_px: f32,
}

impl Default for ReplacerConfig {
    fn default() -> Self {
        Self {
            operation_name: "Replace Materials".to_string(),
            annotation: AnnotationStyle::default(),
            edge_tolerance_px: 3.0,
        }
    }
}

impl ReplacerConfig {
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, SerializationError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
