//! Attribute declarations
//!
//! - [`AttributeSpec`] - one declared attribute
//! - [`AttributeRegistry`] - the ordered attributes of a class
//! - [`Configurable`] - classes that own a registry

mod attribute;
mod registry;

pub use attribute::{
    AttributeKind, AttributeSpec, FactoryAttribute, Omit, SubclassAttribute, SubclassDefault,
    SubclassListAttribute,
};
pub use registry::{AttributeRegistry, Configurable};
