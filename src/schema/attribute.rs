//! Attribute specifications
//!
//! An [`AttributeSpec`] declares one configurable field of a class: its name,
//! description (emitted as the document comment), default, and optional
//! transformer and validator. Four kinds exist:
//!
//! - [`AttributeSpec::value`] - a leaf value
//! - [`AttributeSpec::factory`] - a nested configurable object
//! - [`AttributeSpec::subclass`] - a nested object whose class is chosen by name
//! - [`AttributeSpec::subclass_list`] - a sequence of such objects
//!
//! ```
//! use classconfig::AttributeSpec;
//! use classconfig::validators::{AllValidator, IntegerValidator, MinValueIntegerValidator};
//!
//! let port = AttributeSpec::value("port", "Port to listen on")
//!     .default(8080)
//!     .validator(AllValidator::new().with(IntegerValidator).with(MinValueIntegerValidator(1)));
//!
//! assert_eq!(port.name(), "port");
//! assert!(!port.is_required());
//! ```

use crate::classes::{ClassHandle, Family};
use crate::error::{AttributePath, Error, Result};
use crate::schema::registry::{AttributeRegistry, Configurable};
use crate::transformers::{TransformContext, Transformer};
use crate::validators::{Validator, ValueKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Omit
// =============================================================================

/// Attributes of a nested class to leave out of the document.
///
/// An attribute listed with an empty `Omit` is hidden entirely; a non-empty
/// one descends into that (factory) attribute and hides inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Omit {
    children: BTreeMap<String, Omit>,
}

impl Omit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide the attribute entirely
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.children.insert(name.into(), Omit::new());
        self
    }

    /// Hide attributes inside the nested attribute `name`
    #[must_use]
    pub fn nested(mut self, name: impl Into<String>, inner: Omit) -> Self {
        self.children.insert(name.into(), inner);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Omit)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Union with another omit tree; hiding a whole attribute wins
    pub(crate) fn merge(&mut self, other: &Omit) {
        for (name, inner) in &other.children {
            match self.children.get_mut(name) {
                Some(existing) if existing.is_empty() => {}
                Some(existing) if inner.is_empty() => *existing = Omit::new(),
                Some(existing) => existing.merge(inner),
                None => {
                    self.children.insert(name.clone(), inner.clone());
                }
            }
        }
    }
}

// =============================================================================
// Attribute Kinds
// =============================================================================

/// Nested configurable object
#[derive(Debug, Clone)]
pub struct FactoryAttribute {
    class: ClassHandle,
    delay_init: bool,
    omit: Omit,
    overrides: Map<String, Value>,
}

impl FactoryAttribute {
    pub fn class(&self) -> ClassHandle {
        self.class
    }

    /// Whether the attribute resolves to a [`Deferred`](crate::Deferred) handle
    pub fn is_delayed(&self) -> bool {
        self.delay_init
    }

    pub fn omit(&self) -> &Omit {
        &self.omit
    }

    pub fn overrides(&self) -> &Map<String, Value> {
        &self.overrides
    }

    /// Registry of the target class as seen from this usage site: omitted
    /// attributes hidden and overridden defaults replaced.
    ///
    /// # Errors
    ///
    /// Returns a schema error if an omit or override names an attribute the
    /// target class does not have.
    pub fn registry(&self, path: &AttributePath) -> Result<AttributeRegistry> {
        self.class
            .attributes()
            .omit(&self.omit, path)?
            .with_default_overrides(&self.overrides, path)
    }
}

/// Nested object whose class is selected by name from a family
#[derive(Debug, Clone)]
pub struct SubclassAttribute {
    family: Family,
    default_class: Option<String>,
}

impl SubclassAttribute {
    pub fn family(&self) -> &Family {
        &self.family
    }

    pub fn default_class(&self) -> Option<&str> {
        self.default_class.as_deref()
    }
}

/// Default element of a subclass list
#[derive(Debug, Clone, PartialEq)]
pub struct SubclassDefault {
    /// Class name within the family
    pub cls: String,
    /// Defaults overridden for this element
    pub config: Map<String, Value>,
}

/// Ordered sequence of nested objects, each with its own class
#[derive(Debug, Clone)]
pub struct SubclassListAttribute {
    family: Family,
    defaults: Vec<SubclassDefault>,
}

impl SubclassListAttribute {
    pub fn family(&self) -> &Family {
        &self.family
    }

    pub fn defaults(&self) -> &[SubclassDefault] {
        &self.defaults
    }
}

/// What an attribute holds
#[derive(Debug, Clone)]
pub enum AttributeKind {
    Value,
    Factory(FactoryAttribute),
    Subclass(SubclassAttribute),
    SubclassList(SubclassListAttribute),
}

impl AttributeKind {
    /// Short label used in documentation and messages
    pub fn label(&self) -> &'static str {
        match self {
            AttributeKind::Value => "value",
            AttributeKind::Factory(_) => "nested",
            AttributeKind::Subclass(_) => "subclass",
            AttributeKind::SubclassList(_) => "subclass list",
        }
    }
}

// =============================================================================
// Attribute Spec
// =============================================================================

/// Declaration of one configurable attribute
#[derive(Clone)]
pub struct AttributeSpec {
    name: String,
    desc: String,
    default: Option<Value>,
    transform: Option<Arc<dyn Transformer>>,
    validator: Option<Arc<dyn Validator>>,
    kind: AttributeKind,
    hidden: bool,
}

impl AttributeSpec {
    fn with_kind(name: impl Into<String>, desc: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            default: None,
            transform: None,
            validator: None,
            kind,
            hidden: false,
        }
    }

    // =========================================================================
    // Kind constructors
    // =========================================================================

    /// Leaf value attribute; required until a default is given
    pub fn value(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self::with_kind(name, desc, AttributeKind::Value)
    }

    /// Nested configurable object of class `T`
    pub fn factory<T: Configurable>(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            desc,
            AttributeKind::Factory(FactoryAttribute {
                class: ClassHandle::of::<T>(),
                delay_init: false,
                omit: Omit::new(),
                overrides: Map::new(),
            }),
        )
    }

    /// Nested object of any class registered for family `P`; required until a
    /// default class is given
    pub fn subclass<P: ?Sized + 'static>(
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            name,
            desc,
            AttributeKind::Subclass(SubclassAttribute {
                family: Family::of::<P>(),
                default_class: None,
            }),
        )
    }

    /// Sequence of objects of classes registered for family `P`; defaults to
    /// an empty sequence
    pub fn subclass_list<P: ?Sized + 'static>(
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            name,
            desc,
            AttributeKind::SubclassList(SubclassListAttribute {
                family: Family::of::<P>(),
                defaults: Vec::new(),
            }),
        )
    }

    // =========================================================================
    // Modifiers (builder pattern)
    // =========================================================================

    /// Default for a value attribute
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Drop the default, making a value attribute required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.default = None;
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn transform(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transform = Some(Arc::new(transformer));
        self
    }

    /// Resolve a factory attribute to a [`Deferred`](crate::Deferred) handle
    /// instead of an instance
    #[must_use]
    pub fn delay_init(mut self) -> Self {
        if let AttributeKind::Factory(factory) = &mut self.kind {
            factory.delay_init = true;
        }
        self
    }

    /// Hide attributes of the nested class at this usage site
    #[must_use]
    pub fn omit(mut self, omit: Omit) -> Self {
        if let AttributeKind::Factory(factory) = &mut self.kind {
            factory.omit.merge(&omit);
        }
        self
    }

    /// Replace the default of a nested class's attribute at this usage site.
    ///
    /// The nested class itself is not changed.
    #[must_use]
    pub fn override_default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let AttributeKind::Factory(factory) = &mut self.kind {
            factory.overrides.insert(name.into(), value.into());
        }
        self
    }

    /// Class used when the document does not choose one
    #[must_use]
    pub fn default_class(mut self, name: impl Into<String>) -> Self {
        if let AttributeKind::Subclass(subclass) = &mut self.kind {
            subclass.default_class = Some(name.into());
        }
        self
    }

    /// Append a default element to a subclass list
    #[must_use]
    pub fn default_item(mut self, cls: impl Into<String>, config: Map<String, Value>) -> Self {
        if let AttributeKind::SubclassList(list) = &mut self.kind {
            list.defaults.push(SubclassDefault {
                cls: cls.into(),
                config,
            });
        }
        self
    }

    /// Hide this attribute (empty `omit`) or attributes inside it
    pub(crate) fn apply_omit(&mut self, omit: &Omit, path: &AttributePath) -> Result<()> {
        if omit.is_empty() {
            self.hidden = true;
            return Ok(());
        }
        match &mut self.kind {
            AttributeKind::Factory(factory) => {
                factory.omit.merge(omit);
                Ok(())
            }
            other => Err(Error::schema(
                path,
                format!(
                    "only nested attributes can omit inner attributes, '{}' is a {} attribute",
                    self.name,
                    other.label()
                ),
            )),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    /// Omitted at the current usage site; never read from documents
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether construction fails when no value is supplied
    pub fn is_required(&self) -> bool {
        match &self.kind {
            AttributeKind::Value => self.default.is_none(),
            AttributeKind::Subclass(subclass) => subclass.default_class.is_none(),
            AttributeKind::Factory(_) | AttributeKind::SubclassList(_) => false,
        }
    }

    // =========================================================================
    // Value pipeline
    // =========================================================================

    /// Transform then validate a raw leaf value
    pub(crate) fn resolve_value(
        &self,
        raw: Value,
        ctx: &TransformContext,
        path: &AttributePath,
    ) -> Result<Value> {
        let value = match &self.transform {
            Some(transformer) => transformer.transform(raw, ctx).map_err(|reason| {
                Error::Transform {
                    path: path.clone(),
                    reason,
                }
            })?,
            None => raw,
        };
        self.check_value(&value, path)?;
        Ok(value)
    }

    /// Validate an already transformed leaf value
    pub(crate) fn check_value(&self, value: &Value, path: &AttributePath) -> Result<()> {
        match &self.validator {
            Some(validator) => validator.validate(value).map_err(|reason| Error::Validation {
                path: path.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Replace this attribute's default with a usage-site override
    pub(crate) fn apply_override(&mut self, value: &Value, path: &AttributePath) -> Result<()> {
        match &mut self.kind {
            AttributeKind::Value => {
                self.default = Some(value.clone());
            }
            AttributeKind::Factory(factory) => {
                let Value::Object(nested) = value else {
                    return Err(Error::schema(
                        path,
                        format!(
                            "override of a nested attribute must be a mapping, got {}",
                            ValueKind::of(value)
                        ),
                    ));
                };
                for (name, nested_value) in nested {
                    factory.overrides.insert(name.clone(), nested_value.clone());
                }
            }
            AttributeKind::Subclass(subclass) => match value {
                Value::String(name) => subclass.default_class = Some(name.clone()),
                Value::Null => subclass.default_class = None,
                other => {
                    return Err(Error::schema(
                        path,
                        format!(
                            "override of a subclass attribute must be a class name, got {}",
                            ValueKind::of(other)
                        ),
                    ));
                }
            },
            AttributeKind::SubclassList(list) => {
                let items = value.as_array().ok_or_else(|| {
                    Error::schema(
                        path,
                        format!(
                            "override of a subclass list must be a sequence, got {}",
                            ValueKind::of(value)
                        ),
                    )
                })?;
                let mut defaults = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = path.index(i);
                    let cls = item.get("cls").and_then(Value::as_str).ok_or_else(|| {
                        Error::schema(&item_path.key("cls"), "expected a class name")
                    })?;
                    let config = match item.get("config") {
                        Some(Value::Object(config)) => config.clone(),
                        None | Some(Value::Null) => Map::new(),
                        Some(other) => {
                            return Err(Error::schema(
                                &item_path.key("config"),
                                format!("expected a mapping, got {}", ValueKind::of(other)),
                            ));
                        }
                    };
                    defaults.push(SubclassDefault {
                        cls: cls.to_string(),
                        config,
                    });
                }
                list.defaults = defaults;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("name", &self.name)
            .field("desc", &self.desc)
            .field("default", &self.default)
            .field("kind", &self.kind)
            .field("transform", &self.transform.is_some())
            .field("validator", &self.validator.is_some())
            .field("hidden", &self.hidden)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
