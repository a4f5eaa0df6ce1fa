use std::path::{Path, PathBuf};

use crate::error::DetectError;

/// Model used when none is given.
pub const DEFAULT_MODEL: &str = "yolov5s";

/// Environment variable naming an extra directory to search for models.
pub const MODEL_DIR_ENV: &str = "PROMOPOST_MODEL_DIR";

/// Directories searched for `<id>.rten`, in order.
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(dir) = std::env::var(MODEL_DIR_ENV) {
        dirs.push(PathBuf::from(dir));
    }

    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        dirs.push(Path::new(&home).join(".cache/promopost/models"));
    }

    dirs.push(PathBuf::from("."));
    dirs
}

/// Resolve a model identifier to a weights file.
///
/// An identifier naming an existing file is used as is. Otherwise
/// `<id>.rten` is looked up in each of `dirs`.
pub fn resolve_model_path(id: &str, dirs: &[PathBuf]) -> Result<PathBuf, DetectError> {
    let direct = Path::new(id);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    let file_name = if id.ends_with(".rten") {
        id.to_string()
    } else {
        format!("{id}.rten")
    };

    let candidates: Vec<PathBuf> = dirs.iter().map(|dir| dir.join(&file_name)).collect();
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| DetectError::ModelNotFound {
            id: id.to_string(),
            searched: candidates,
        })
}
