//! Configuration documents bound to a class
//!
//! This module contains the document lifecycle of a configurable class:
//! - `Config` - save, load and check documents for one class
//! - `ConfigDocument` - the commented default document
//! - `LoadedConfig` - a transformed and validated data tree

mod document;
mod loaded;
mod loader;

pub use document::{ConfigDocument, DocumentEntry, DocumentNode};
pub use loaded::LoadedConfig;

use crate::error::{AttributePath, Result};
use crate::schema::{AttributeRegistry, Configurable};
use crate::storage::{DocumentFormat, YamlFormat};
use crate::transformers::TransformContext;
use log::{debug, info};
use serde_json::Value;
use std::path::Path;

// =============================================================================
// Config
// =============================================================================

/// Document lifecycle of one configurable class.
///
/// ```
/// use classconfig::{Arguments, AttributeRegistry, AttributeSpec, Config, Configurable, Result};
/// use serde_json::json;
///
/// struct Server {
///     port: u16,
/// }
///
/// impl Configurable for Server {
///     fn attributes() -> AttributeRegistry {
///         AttributeRegistry::new().with(AttributeSpec::value("port", "Port to listen on").default(8080))
///     }
///
///     fn construct(args: &mut Arguments) -> Result<Self> {
///         Ok(Self { port: args.value("port")? })
///     }
/// }
///
/// let config = Config::of::<Server>();
/// assert_eq!(config.render().unwrap(), "port: 8080  # Port to listen on\n");
///
/// let loaded = config.trans_and_val(&json!({"port": 9000}), None).unwrap();
/// assert_eq!(loaded.get("port"), Some(&json!(9000)));
/// ```
#[derive(Debug, Clone)]
pub struct Config<F: DocumentFormat = YamlFormat> {
    registry: AttributeRegistry,
    format: F,
}

impl Config {
    /// Config for an explicit registry, using YAML
    #[must_use]
    pub fn new(registry: AttributeRegistry) -> Self {
        Self {
            registry,
            format: YamlFormat,
        }
    }

    /// Config for the attributes of `T`, using YAML
    #[must_use]
    pub fn of<T: Configurable>() -> Self {
        Self::new(T::attributes())
    }
}

impl<F: DocumentFormat> Config<F> {
    /// Use another document format
    #[must_use]
    pub fn with_format<G: DocumentFormat>(self, format: G) -> Config<G> {
        Config {
            registry: self.registry,
            format,
        }
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    /// Commented default document
    pub fn document(&self) -> Result<ConfigDocument> {
        ConfigDocument::from_registry(&self.registry, &AttributePath::root())
    }

    /// Default document as text
    pub fn render(&self) -> Result<String> {
        self.format.render(&self.document()?)
    }

    /// Write the default document to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.format.write(path, &self.document()?)?;
        info!("Saved default configuration to {}", path.display());
        Ok(())
    }

    /// Read `path` and check it; relative paths resolve against its directory
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedConfig> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let raw = self.format.read(path)?;
        self.trans_and_val(&raw, path.parent())
    }

    /// Transform and validate an already parsed data tree
    pub fn trans_and_val(&self, raw: &Value, base_dir: Option<&Path>) -> Result<LoadedConfig> {
        let ctx = TransformContext::new(base_dir);
        let root = loader::trans_and_val(raw, &self.registry, &ctx, &AttributePath::root())?;
        Ok(LoadedConfig::new(root))
    }

    /// Run the default document through the full pipeline
    pub fn check_defaults(&self) -> Result<LoadedConfig> {
        self.trans_and_val(&self.document()?.to_value(), None)
    }
}

// =============================================================================
// Tests
// =============================================================================
