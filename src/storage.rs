//! Loading and persisting post sequences as JSON files.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;

use crate::error::EnrichError;
use crate::models::Post;

/// Indentation used for persisted output.
const INDENT: &[u8] = b"    ";

/// Reads a JSON array of posts from `path`.
///
/// # Errors
///
/// Returns `EnrichError::Load` if the file cannot be read or is not a JSON array
/// of objects.
pub fn load_posts(path: &Path) -> Result<Vec<Post>, EnrichError> {
    let load_error = |message: String| EnrichError::Load {
        path: path.to_path_buf(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))
}

/// Writes `posts` to `path` as a JSON array indented with four spaces.
///
/// The output is written to a temporary file next to `path` and renamed into
/// place, so an existing destination is only replaced by a complete file.
///
/// # Errors
///
/// Returns `EnrichError::Write` if the temporary file cannot be created, written
/// or renamed.
pub fn save_posts(path: &Path, posts: &[Post]) -> Result<(), EnrichError> {
    let write_error = |message: String| EnrichError::Write {
        path: path.to_path_buf(),
        message,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(|e| write_error(e.to_string()))?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(INDENT));
        posts
            .serialize(&mut serializer)
            .map_err(|e| write_error(e.to_string()))?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|e| write_error(e.to_string()))?;
    }

    file.persist(path).map_err(|e| write_error(e.error.to_string()))?;
    Ok(())
}
