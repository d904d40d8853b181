//! Documentation generator for configurable classes
//!
//! Generates a markdown reference from a class's attribute registry.

use crate::classes;
use crate::error::AttributePath;
use crate::schema::{AttributeKind, AttributeRegistry, AttributeSpec, Configurable};
use std::fmt::Write;

/// Configuration for docs generation
#[derive(Debug, Clone, Default)]
pub struct DocsConfig {
    /// Title for the documentation
    pub title: Option<String>,
    /// Description/introduction text
    pub description: Option<String>,
    /// Whether to document the attributes of nested classes
    pub recurse: bool,
}

impl DocsConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            recurse: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Only document the top-level attributes
    #[must_use]
    pub fn flat(mut self) -> Self {
        self.recurse = false;
        self
    }
}

/// Generate markdown documentation for the attributes of `T`
#[must_use]
pub fn generate_docs<T: Configurable>(config: DocsConfig) -> String {
    let config = DocsConfig {
        title: config
            .title
            .or_else(|| Some(format!("{} Configuration", T::class_name()))),
        ..config
    };
    generate_docs_from_registry(&T::attributes(), config)
}

/// Generate docs from a registry (useful for usage-site views of a class)
#[must_use]
pub fn generate_docs_from_registry(registry: &AttributeRegistry, config: DocsConfig) -> String {
    let mut output = String::new();

    let title = config
        .title
        .unwrap_or_else(|| "Configuration Reference".to_string());
    let _ = writeln!(output, "# {title}\n");

    if let Some(desc) = config.description {
        let _ = writeln!(output, "{desc}\n");
    }

    output.push_str("## Attributes\n\n");
    format_registry(&mut output, registry, &AttributePath::root(), config.recurse);
    output
}

fn format_registry(
    out: &mut String,
    registry: &AttributeRegistry,
    path: &AttributePath,
    recurse: bool,
) {
    for spec in registry.visible() {
        let attr_path = path.key(spec.name());
        format_attribute(out, spec, &attr_path);

        if !recurse {
            continue;
        }
        // Usage-site views that fail to apply are skipped; loading reports them
        if let AttributeKind::Factory(factory) = spec.kind() {
            if let Ok(nested) = factory.registry(&attr_path) {
                format_registry(out, &nested, &attr_path, recurse);
            }
        }
    }
}

fn format_attribute(out: &mut String, spec: &AttributeSpec, path: &AttributePath) {
    let _ = writeln!(out, "### `{path}`\n");

    if spec.is_required() {
        out.push_str("Required\n\n");
    }

    if !spec.desc().is_empty() {
        let _ = writeln!(out, "{}\n", spec.desc());
    }

    out.push_str("| Property | Value |\n");
    out.push_str("|----------|-------|\n");
    let _ = writeln!(out, "| **Kind** | {} |", capitalize(spec.kind().label()));

    match spec.kind() {
        AttributeKind::Value => {
            if let Some(default) = spec.default_value() {
                let _ = writeln!(out, "| **Default** | `{default}` |");
            }
        }
        AttributeKind::Factory(factory) => {
            let _ = writeln!(out, "| **Class** | `{}` |", factory.class().name());
            if factory.is_delayed() {
                out.push_str("| **Initialization** | Deferred |\n");
            }
        }
        AttributeKind::Subclass(subclass) => {
            let _ = writeln!(out, "| **Parent** | `{}` |", subclass.family().name());
            if let Some(cls) = subclass.default_class() {
                let _ = writeln!(out, "| **Default** | `{cls}` |");
            }
        }
        AttributeKind::SubclassList(list) => {
            let _ = writeln!(out, "| **Parent** | `{}` |", list.family().name());
            let defaults: Vec<_> = list.defaults().iter().map(|d| d.cls.as_str()).collect();
            let _ = writeln!(out, "| **Default** | `[{}]` |", defaults.join(", "));
        }
    }
    out.push('\n');

    let family = match spec.kind() {
        AttributeKind::Subclass(subclass) => Some(subclass.family()),
        AttributeKind::SubclassList(list) => Some(list.family()),
        _ => None,
    };
    if let Some(family) = family {
        let names = classes::names(family);
        if !names.is_empty() {
            out.push_str("**Classes:**\n\n");
            for name in names {
                let _ = writeln!(out, "- `{name}`");
            }
            out.push('\n');
        }
    }

    out.push_str("---\n\n");
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

// =============================================================================
// Tests
// =============================================================================
