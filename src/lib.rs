//! # classconfig - declarative configuration for Rust types
//!
//! Declare the configurable attributes of a type once, then generate a
//! commented YAML document with its defaults, load and validate edited
//! documents, and build object graphs from them.
//!
//! ## Features
//!
//! - **Attributes**: values with defaults, transformers and validators
//! - **Nested objects**: with per-usage omitted attributes and overridden defaults
//! - **Subclasses**: select a class by name from a family (e.g. `dyn Storage`)
//! - **Documents**: YAML with attribute descriptions as comments
//! - **Deferred construction**: nested objects built on demand
//!
//! ## Quick Start
//!
//! ```rust
//! use classconfig::{
//!     register_subclasses, Arguments, AttributeRegistry, AttributeSpec, Creatable,
//!     Configurable, Result,
//! };
//! use classconfig::validators::{AllValidator, IntegerValidator, MinValueIntegerValidator};
//! use serde_json::json;
//!
//! trait Storage {
//!     fn location(&self) -> String;
//! }
//!
//! struct DiskStorage {
//!     path: String,
//! }
//!
//! impl Storage for DiskStorage {
//!     fn location(&self) -> String {
//!         self.path.clone()
//!     }
//! }
//!
//! impl Configurable for DiskStorage {
//!     fn attributes() -> AttributeRegistry {
//!         AttributeRegistry::new().with(AttributeSpec::value("path", "Storage path").default("/var/data"))
//!     }
//!
//!     fn construct(args: &mut Arguments) -> Result<Self> {
//!         Ok(Self { path: args.value("path")? })
//!     }
//! }
//!
//! struct Service {
//!     workers: u32,
//!     storage: Box<dyn Storage>,
//! }
//!
//! impl Configurable for Service {
//!     fn attributes() -> AttributeRegistry {
//!         AttributeRegistry::new()
//!             .with(
//!                 AttributeSpec::value("workers", "Worker threads")
//!                     .default(4)
//!                     .validator(AllValidator::new().with(IntegerValidator).with(MinValueIntegerValidator(1))),
//!             )
//!             .with(AttributeSpec::subclass::<dyn Storage>("storage", "Storage backend").default_class("DiskStorage"))
//!     }
//!
//!     fn construct(args: &mut Arguments) -> Result<Self> {
//!         Ok(Self {
//!             workers: args.value("workers")?,
//!             storage: args.subclass("storage")?,
//!         })
//!     }
//! }
//!
//! register_subclasses!(dyn Storage => DiskStorage);
//!
//! let service = Service::create(json!({
//!     "workers": 8,
//!     "storage": {"cls": "DiskStorage", "config": {"path": "/srv"}}
//! }))
//! .unwrap();
//! assert_eq!(service.workers, 8);
//! assert_eq!(service.storage.location(), "/srv");
//! ```
//!
//! ## Documents
//!
//! [`Config::save`] writes the default document of a class:
//!
//! ```yaml
//! workers: 4  # Worker threads
//! storage:  # Storage backend
//!   cls: DiskStorage  # Name of the class to use. Available: DiskStorage
//!   config:  # Configuration of the selected class
//!     path: /var/data  # Storage path
//! ```
//!
//! [`Config::load`] reads such a document back, fills in missing keys from
//! defaults, applies transformers then validators, and returns a
//! [`LoadedConfig`]. Every error names the offending path, e.g.
//! `storage.config.path`.

// Core modules
mod arguments;
mod docs;
mod error;
mod factory;
mod schema;
mod sync;

pub mod classes;
pub mod storage;
pub mod transformers;
pub mod validators;

// Grouped modules
pub mod config;

// Re-exports from core
pub use arguments::{Argument, Arguments};
pub use classes::{register_subclass, ClassHandle, Family, SubclassEntry};
pub use docs::{generate_docs, generate_docs_from_registry, DocsConfig};
pub use error::{AttributePath, Error, PathSegment, Result};
pub use factory::{
    ConfigSource, ConfigurableFactory, ConfigurableSubclassFactory, Creatable, Deferred,
    ListOfConfigurableSubclassFactory,
};
pub use schema::{
    AttributeKind, AttributeRegistry, AttributeSpec, Configurable, FactoryAttribute, Omit,
    SubclassAttribute, SubclassDefault, SubclassListAttribute,
};
pub use storage::{DocumentFormat, YamlFormat};

// Re-exports from config
pub use config::{Config, ConfigDocument, DocumentEntry, DocumentNode, LoadedConfig};

// Derive macro re-export (requires `derive` feature)
/// Derive macro for auto-generating `Configurable` implementations.
///
/// Fields become attributes in declaration order.
///
/// # Example
///
/// ```rust
/// use classconfig::{Arguments, Configurable, DeriveConfigurable};
///
/// #[derive(DeriveConfigurable)]
/// struct Server {
///     #[config(desc = "Port to listen on", default = 8080)]
///     port: u16,
///     #[config(desc = "Host name")]
///     host: String,
/// }
///
/// let server = Server::from_arguments(Arguments::new().set("host", "example.org")).unwrap();
/// assert_eq!(server.port, 8080);
/// assert_eq!(server.host, "example.org");
/// ```
#[cfg(feature = "derive")]
pub use classconfig_derive::Configurable as DeriveConfigurable;

// Used by code generated from `#[derive(DeriveConfigurable)]`
#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
