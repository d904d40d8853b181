//! Default documents generated from attribute registries

use crate::classes;
use crate::error::{AttributePath, Result};
use crate::schema::{AttributeKind, AttributeRegistry, SubclassDefault};
use crate::storage::{DocumentFormat, YamlFormat};
use serde_json::{Map, Value};

/// Node of a [`ConfigDocument`]
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentNode {
    /// Literal default
    Scalar(Value),
    /// Nested object, or a `{cls, config}` record
    Mapping(ConfigDocument),
    /// Sequence of `{cls, config}` records
    Sequence(Vec<ConfigDocument>),
}

impl DocumentNode {
    pub fn to_value(&self) -> Value {
        match self {
            DocumentNode::Scalar(value) => value.clone(),
            DocumentNode::Mapping(document) => document.to_value(),
            DocumentNode::Sequence(items) => {
                Value::Array(items.iter().map(ConfigDocument::to_value).collect())
            }
        }
    }
}

/// One key of a document mapping with its comment
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEntry {
    key: String,
    comment: Option<String>,
    node: DocumentNode,
}

impl DocumentEntry {
    pub fn new(key: impl Into<String>, comment: Option<&str>, node: DocumentNode) -> Self {
        Self {
            key: key.into(),
            comment: comment.map(str::to_string),
            node,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn node(&self) -> &DocumentNode {
        &self.node
    }
}

/// Commented default configuration of a class, in registry order.
///
/// Value attributes hold their default (`null` when required), nested
/// attributes hold the nested class's document, and subclass attributes hold
/// a `{cls, config}` record for their default class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    entries: Vec<DocumentEntry>,
}

impl ConfigDocument {
    pub fn from_entries(entries: Vec<DocumentEntry>) -> Self {
        Self { entries }
    }

    /// Default document of the visible attributes of `registry`
    ///
    /// # Errors
    ///
    /// Fails when a default class cannot be resolved, or a usage-site
    /// omit/override does not fit the nested class.
    pub fn from_registry(registry: &AttributeRegistry, path: &AttributePath) -> Result<Self> {
        let mut entries = Vec::new();
        for spec in registry.visible() {
            let attr_path = path.key(spec.name());
            let comment = Some(spec.desc()).filter(|d| !d.is_empty());

            let node = match spec.kind() {
                AttributeKind::Value => {
                    DocumentNode::Scalar(spec.default_value().cloned().unwrap_or(Value::Null))
                }
                AttributeKind::Factory(factory) => DocumentNode::Mapping(Self::from_registry(
                    &factory.registry(&attr_path)?,
                    &attr_path,
                )?),
                AttributeKind::Subclass(subclass) => {
                    let family = subclass.family();
                    let config = match subclass.default_class() {
                        Some(cls) => {
                            let entry = classes::resolve(family, cls, &attr_path.key("cls"))?;
                            Self::from_registry(&entry.attributes(), &attr_path.key("config"))?
                        }
                        None => Self::default(),
                    };
                    let cls = subclass
                        .default_class()
                        .map_or(Value::Null, |cls| Value::String(cls.to_string()));
                    DocumentNode::Mapping(Self::subclass_record(
                        cls,
                        config,
                        &classes::names(family),
                    ))
                }
                AttributeKind::SubclassList(list) => {
                    let names = classes::names(list.family());
                    let mut items = Vec::new();
                    for (i, SubclassDefault { cls, config }) in list.defaults().iter().enumerate() {
                        let item_path = attr_path.index(i);
                        let entry = classes::resolve(list.family(), cls, &item_path.key("cls"))?;
                        let config_path = item_path.key("config");
                        let registry = entry
                            .attributes()
                            .with_default_overrides(config, &config_path)?;
                        items.push(Self::subclass_record(
                            Value::String(cls.clone()),
                            Self::from_registry(&registry, &config_path)?,
                            &names,
                        ));
                    }
                    DocumentNode::Sequence(items)
                }
            };
            entries.push(DocumentEntry::new(spec.name(), comment, node));
        }
        Ok(Self { entries })
    }

    fn subclass_record(cls: Value, config: ConfigDocument, available: &[String]) -> Self {
        let cls_comment = if available.is_empty() {
            "Name of the class to use".to_string()
        } else {
            format!("Name of the class to use. Available: {}", available.join(", "))
        };
        Self::from_entries(vec![
            DocumentEntry::new("cls", Some(cls_comment.as_str()), DocumentNode::Scalar(cls)),
            DocumentEntry::new(
                "config",
                Some("Configuration of the selected class"),
                DocumentNode::Mapping(config),
            ),
        ])
    }

    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&DocumentNode> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.node)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Data tree of the document, comments dropped
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|e| (e.key.clone(), e.node.to_value()))
            .collect();
        Value::Object(map)
    }

    /// YAML text with descriptions as comments
    pub fn to_yaml(&self) -> Result<String> {
        YamlFormat.render(self)
    }
}

// =============================================================================
// Tests
// =============================================================================
