//! Reading and atomically writing JSON documents.

use std::{io::Write, path::Path};

use {
    serde_json::{Map, Value},
    tracing::debug,
};

use crate::error::{Context, Result};

/// Load a JSON document. A missing file is not an error: it returns `None`.
pub fn load_document(path: &Path) -> Result<Option<Value>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Write `value` as pretty JSON through a temp file in the same directory,
/// then rename it over `path`.
///
/// Creates parent directories if needed.
pub fn save_document(path: &Path, value: &Value) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut data = serde_json::to_string_pretty(value)?;
    data.push('\n');

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    debug!(path = %path.display(), bytes = data.len(), "wrote document");
    Ok(())
}

/// Coerce `value` into an object (replacing any non-object) and return its map.
pub(crate) fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// Walk `path` from `root`, creating or coercing objects along the way.
pub(crate) fn object_at<'a>(root: &'a mut Value, path: &[&str]) -> &'a mut Map<String, Value> {
    let mut current = root;
    for key in path {
        current = ensure_object(current)
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current)
}
