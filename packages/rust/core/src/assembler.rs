//! Document assembler.
//!
//! Packages flattened blocks into a [`Document`] and renders it as JSON,
//! indented for small sources and compact for large ones.

use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use pbrtjson_shared::{Block, ConvertError, Document, Result};

use crate::fs::SceneFs;

/// Indentation used for pretty output.
const PRETTY_INDENT: &[u8] = b"    ";

/// Wrap blocks, in order, into a document.
pub fn assemble(blocks: Vec<Block>) -> Document {
    Document::new(blocks)
}

/// Serialize a document. Pretty when `source_size < pretty_threshold`.
pub fn render(document: &Document, source_size: u64, pretty_threshold: u64) -> Result<String> {
    let pretty = source_size < pretty_threshold;
    debug!(source_size, pretty, blocks = document.len(), "rendering document");

    if pretty {
        to_pretty_json(document)
    } else {
        serde_json::to_string(document).map_err(|e| {
            ConvertError::Serialization(format!("JSON serialization failed: {e}"))
        })
    }
}

/// Write rendered JSON to `path`.
pub fn write_document(fs: &dyn SceneFs, path: &Path, json: &str) -> Result<()> {
    fs.write(path, json)?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

/// Read an artifact back and check its shape.
pub fn load_document(fs: &dyn SceneFs, path: &Path) -> Result<Document> {
    let content = fs.read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        ConvertError::validation(format!("invalid document {}: {e}", path.display()))
    })
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(PRETTY_INDENT));
    value.serialize(&mut serializer).map_err(|e| {
        ConvertError::Serialization(format!("JSON serialization failed: {e}"))
    })?;
    String::from_utf8(buf).map_err(|e| ConvertError::Serialization(e.to_string()))
}
