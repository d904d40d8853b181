//! Document formats and file storage

use crate::config::{ConfigDocument, DocumentNode};
use crate::error::{Error, Result};
use log::debug;
use serde_json::Value;
use std::path::Path;

/// Trait for document format implementations
///
/// A format renders a [`ConfigDocument`] (keeping its comments) and parses
/// text back into a raw data tree.
pub trait DocumentFormat: Clone + Send + Sync {
    /// Render a document to text
    fn render(&self, document: &ConfigDocument) -> Result<String>;

    /// Parse text into a raw data tree; `origin` is used in error messages
    fn parse(&self, content: &str, origin: &Path) -> Result<Value>;

    /// Read and parse a file
    fn read(&self, path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse(&content, path)
    }

    /// Render and write a document
    ///
    /// Uses atomic write: writes to temp file then renames to prevent corruption.
    fn write(&self, path: &Path, document: &ConfigDocument) -> Result<()> {
        let content = self.render(document)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file_name = path.file_name().ok_or_else(|| Error::FileWrite {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path must have a file name",
            ),
        })?;
        let mut temp_filename = file_name.to_os_string();
        temp_filename.push(".tmp");
        let temp_path = path.with_file_name(temp_filename);

        std::fs::write(&temp_path, &content).map_err(|e| Error::FileWrite {
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, path).map_err(|e| Error::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}

// =============================================================================
// YAML Implementation
// =============================================================================

/// YAML format with attribute descriptions as comments (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl YamlFormat {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentFormat for YamlFormat {
    fn render(&self, document: &ConfigDocument) -> Result<String> {
        if document.is_empty() {
            return Ok("{}\n".to_string());
        }
        let mut lines = Vec::new();
        write_mapping(&mut lines, document, 0)?;
        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }

    fn parse(&self, content: &str, origin: &Path) -> Result<Value> {
        let blank = content.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#') || line == "---"
        });
        if blank {
            return Ok(Value::Null);
        }
        serde_yaml::from_str(content).map_err(|e| Error::Parse {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

// =============================================================================
// YAML Writer
// =============================================================================

const INDENT: usize = 2;

fn write_mapping(lines: &mut Vec<String>, document: &ConfigDocument, indent: usize) -> Result<()> {
    let pad = " ".repeat(indent);
    for entry in document.entries() {
        let key = format_key(entry.key());

        // Multi-line descriptions go above the entry, single lines trail it
        let trailing = match entry.comment() {
            Some(comment) if comment.contains('\n') => {
                for line in comment.lines() {
                    lines.push(format!("{pad}# {line}").trim_end().to_string());
                }
                String::new()
            }
            Some(comment) if !comment.is_empty() => format!("  # {comment}"),
            _ => String::new(),
        };

        match entry.node() {
            DocumentNode::Scalar(value) => {
                lines.push(format!("{pad}{key}: {}{trailing}", format_scalar(value)?));
            }
            DocumentNode::Mapping(nested) if nested.is_empty() => {
                lines.push(format!("{pad}{key}: {{}}{trailing}"));
            }
            DocumentNode::Mapping(nested) => {
                lines.push(format!("{pad}{key}:{trailing}"));
                write_mapping(lines, nested, indent + INDENT)?;
            }
            DocumentNode::Sequence(items) if items.is_empty() => {
                lines.push(format!("{pad}{key}: []{trailing}"));
            }
            DocumentNode::Sequence(items) => {
                lines.push(format!("{pad}{key}:{trailing}"));
                for item in items {
                    write_item(lines, item, indent + INDENT)?;
                }
            }
        }
    }
    Ok(())
}

/// Sequence element: the mapping is written two levels deeper, then its first
/// key line takes the `- ` marker
fn write_item(lines: &mut Vec<String>, item: &ConfigDocument, indent: usize) -> Result<()> {
    let marker = format!("{}- ", " ".repeat(indent));
    if item.is_empty() {
        lines.push(format!("{marker}{{}}"));
        return Ok(());
    }

    let mut item_lines = Vec::new();
    let item_indent = indent + INDENT;
    write_mapping(&mut item_lines, item, item_indent)?;
    if let Some(first) = item_lines
        .iter_mut()
        .find(|line| !line.trim_start().starts_with('#'))
    {
        *first = format!("{marker}{}", &first[item_indent..]);
    }
    lines.extend(item_lines);
    Ok(())
}

fn format_scalar(value: &Value) -> Result<String> {
    match value {
        Value::Array(_) | Value::Object(_) => Ok(serde_json::to_string(value)?),
        _ => {
            let rendered = serde_yaml::to_string(value)?;
            let rendered = rendered.trim_end();
            let rendered = rendered.strip_prefix("--- ").unwrap_or(rendered);
            if rendered.contains('\n') {
                Ok(serde_json::to_string(value)?)
            } else {
                Ok(rendered.to_string())
            }
        }
    }
}

fn format_key(key: &str) -> String {
    const RESERVED: &[&str] = &[
        "true", "false", "null", "yes", "no", "on", "off", "y", "n", "~",
    ];

    let mut chars = key.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !RESERVED.contains(&key.to_ascii_lowercase().as_str());

    if plain {
        key.to_string()
    } else {
        serde_json::Value::String(key.to_string()).to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
