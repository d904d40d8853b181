//! Ordered attribute registries and the [`Configurable`] trait

use crate::arguments::Arguments;
use crate::classes;
use crate::error::{AttributePath, Error, Result};
use crate::factory;
use crate::schema::attribute::{AttributeSpec, Omit};
use serde_json::{Map, Value};

// =============================================================================
// Attribute Registry
// =============================================================================

/// Ordered collection of the attributes of one class.
///
/// Order is declaration order, and it is the key order of generated
/// documents. Declaring a name that already exists replaces the entry at its
/// original position.
///
/// ```
/// use classconfig::{AttributeRegistry, AttributeSpec};
///
/// let base = AttributeRegistry::new()
///     .with(AttributeSpec::value("host", "Host name").default("localhost"))
///     .with(AttributeSpec::value("port", "Port").default(80));
///
/// let derived = AttributeRegistry::inherit([base])
///     .with(AttributeSpec::value("tls", "Use TLS").default(false))
///     .with(AttributeSpec::value("port", "Port").default(443));
///
/// assert_eq!(derived.names(), vec!["host", "port", "tls"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    attributes: Vec<AttributeSpec>,
}

impl AttributeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the attributes of every base, in base order
    #[must_use]
    pub fn inherit(bases: impl IntoIterator<Item = AttributeRegistry>) -> Self {
        let mut registry = Self::new();
        for base in bases {
            registry.extend(base);
        }
        registry
    }

    /// Add an attribute, replacing an existing one of the same name in place
    pub fn declare(&mut self, spec: AttributeSpec) {
        match self.attributes.iter_mut().find(|a| a.name() == spec.name()) {
            Some(existing) => *existing = spec,
            None => self.attributes.push(spec),
        }
    }

    /// Builder form of [`declare`](Self::declare)
    #[must_use]
    pub fn with(mut self, spec: AttributeSpec) -> Self {
        self.declare(spec);
        self
    }

    /// Declare every attribute of `other`, in its order
    pub fn extend(&mut self, other: AttributeRegistry) {
        for spec in other.attributes {
            self.declare(spec);
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut AttributeSpec> {
        self.attributes.iter_mut().find(|a| a.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All attributes, hidden ones included
    pub fn iter(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter()
    }

    /// Attributes that appear in documents
    pub fn visible(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter().filter(|a| !a.is_hidden())
    }

    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(AttributeSpec::name).collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    // =========================================================================
    // Usage-site views
    // =========================================================================

    /// Copy of this registry with the attributes named by `omit` hidden.
    ///
    /// Hidden attributes keep their defaults and still reach the constructor.
    ///
    /// # Errors
    ///
    /// Returns a schema error when `omit` names an unknown attribute, or
    /// descends into an attribute that is not a nested object.
    pub fn omit(mut self, omit: &Omit, path: &AttributePath) -> Result<Self> {
        for (name, inner) in omit.iter() {
            let spec = self.get_mut(name).ok_or_else(|| {
                Error::schema(path, format!("cannot omit unknown attribute '{name}'"))
            })?;
            spec.apply_omit(inner, &path.key(name))?;
        }
        Ok(self)
    }

    /// Copy of this registry with defaults replaced by `overrides`.
    ///
    /// # Errors
    ///
    /// Returns a schema error when an override names an unknown attribute or
    /// has the wrong shape for the attribute's kind.
    pub fn with_default_overrides(
        mut self,
        overrides: &Map<String, Value>,
        path: &AttributePath,
    ) -> Result<Self> {
        for (name, value) in overrides {
            let spec = self.get_mut(name).ok_or_else(|| {
                Error::schema(path, format!("cannot override unknown attribute '{name}'"))
            })?;
            spec.apply_override(value, &path.key(name))?;
        }
        Ok(self)
    }
}

impl<'a> IntoIterator for &'a AttributeRegistry {
    type Item = &'a AttributeSpec;
    type IntoIter = std::slice::Iter<'a, AttributeSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

// =============================================================================
// Configurable
// =============================================================================

/// A class whose attributes are declared in an [`AttributeRegistry`].
///
/// Implement it by hand or with `#[derive(Configurable)]`. `construct` only
/// moves already checked arguments into the struct: unknown names, missing
/// required values and defaults are handled before it is called.
///
/// ```
/// use classconfig::{Arguments, AttributeRegistry, AttributeSpec, Configurable, Result};
///
/// struct Server {
///     port: u16,
/// }
///
/// impl Configurable for Server {
///     fn attributes() -> AttributeRegistry {
///         AttributeRegistry::new().with(AttributeSpec::value("port", "Port").default(8080))
///     }
///
///     fn construct(args: &mut Arguments) -> Result<Self> {
///         Ok(Self { port: args.value("port")? })
///     }
/// }
///
/// let server = Server::defaults().unwrap();
/// assert_eq!(server.port, 8080);
///
/// let server = Server::from_arguments(Arguments::new().set("port", 9000)).unwrap();
/// assert_eq!(server.port, 9000);
///
/// assert!(Server::from_arguments(Arguments::new().set("host", "x")).is_err());
/// ```
pub trait Configurable: Sized + 'static {
    /// Name used in `cls` nodes and subclass lookup
    fn class_name() -> &'static str {
        classes::short_name(std::any::type_name::<Self>())
    }

    /// Attributes of the class, in document order
    fn attributes() -> AttributeRegistry;

    /// Build the instance from resolved arguments
    fn construct(args: &mut Arguments) -> Result<Self>;

    /// Keyword construction: unknown names are rejected, missing attributes
    /// take their defaults, missing required ones fail.
    fn from_arguments(args: Arguments) -> Result<Self> {
        factory::build::<Self>(&Self::attributes(), args, &AttributePath::root())
    }

    /// Instance built from defaults only
    fn defaults() -> Result<Self> {
        Self::from_arguments(Arguments::new())
    }
}

// =============================================================================
// Tests
// =============================================================================
