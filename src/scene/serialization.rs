use crate::scene::{Model, SceneError};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scene: {0}")]
    Invalid(#[from] SceneError),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

pub fn save_model_to_file(model: &Model, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(model)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_model_from_file(path: &Path) -> Result<Model> {
    let json = std::fs::read_to_string(path)?;
    load_model_from_str(&json)
}

/// Parses and validates a model.
pub fn load_model_from_str(json: &str) -> Result<Model> {
    let model: Model = serde_json::from_str(json)?;
    model.validate()?;
    Ok(model)
}
