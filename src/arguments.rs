//! Keyword arguments for constructing configurable classes

use crate::error::{AttributePath, Error, Result};
use crate::factory::Deferred;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// One keyword argument
pub enum Argument {
    /// Leaf value, converted to the field type on access
    Value(Value),
    /// Already constructed object (nested instance, subclass box, list or
    /// deferred handle)
    Object(Box<dyn Any>),
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Argument::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// Named arguments passed to [`Configurable::construct`](crate::Configurable::construct).
///
/// Entries keep insertion order. Typed accessors report conversion failures
/// and missing names as construction errors at the arguments' path.
#[derive(Debug, Default)]
pub struct Arguments {
    entries: Vec<(String, Argument)>,
    path: AttributePath,
}

impl Arguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a leaf value argument
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, Argument::Value(value.into()));
        self
    }

    /// Set an already constructed object
    #[must_use]
    pub fn set_object<T: Any>(mut self, name: impl Into<String>, object: T) -> Self {
        self.insert(name, Argument::Object(Box::new(object)));
        self
    }

    /// Insert or replace an argument
    pub fn insert(&mut self, name: impl Into<String>, argument: Argument) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = argument,
            None => self.entries.push((name, argument)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add every argument of `other`; on conflict `other` wins
    pub fn merge(&mut self, other: Arguments) {
        for (name, argument) in other.entries {
            self.insert(name, argument);
        }
    }

    /// Path of the object these arguments construct
    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    pub(crate) fn set_path(&mut self, path: AttributePath) {
        self.path = path;
    }

    /// Leaf value without conversion
    pub fn raw_value(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find_map(|(n, argument)| match argument {
            Argument::Value(value) if n == name => Some(value),
            _ => None,
        })
    }

    fn take(&mut self, name: &str) -> Option<Argument> {
        let position = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(position).1)
    }

    fn missing(&self, name: &str) -> Error {
        Error::construction(&self.path, format!("no argument named '{name}'"))
    }

    // =========================================================================
    // Typed access
    // =========================================================================

    /// Leaf value converted to `T`
    ///
    /// # Errors
    ///
    /// Fails if the argument is absent, is an object, or does not convert.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = match self.entries.iter().find(|(n, _)| n == name) {
            Some((_, Argument::Value(value))) => value,
            Some((_, Argument::Object(_))) => {
                return Err(Error::construction(
                    &self.path,
                    format!("argument '{name}' is an object, not a value"),
                ));
            }
            None => return Err(self.missing(name)),
        };
        T::deserialize(value).map_err(|e| {
            Error::construction(
                &self.path.key(name),
                format!("cannot convert {value} to {}: {e}", std::any::type_name::<T>()),
            )
        })
    }

    /// Take an object argument of type `T`.
    ///
    /// # Errors
    ///
    /// Fails if the argument is absent, is a leaf value, or holds another type.
    pub fn object<T: Any>(&mut self, name: &str) -> Result<T> {
        match self.take(name) {
            Some(Argument::Object(object)) => object.downcast::<T>().map(|b| *b).map_err(|_| {
                Error::construction(
                    &self.path.key(name),
                    format!("argument is not a {}", std::any::type_name::<T>()),
                )
            }),
            Some(Argument::Value(value)) => Err(Error::construction(
                &self.path.key(name),
                format!("expected a constructed object, got value {value}"),
            )),
            None => Err(self.missing(name)),
        }
    }

    /// Take a subclass attribute as its family box
    pub fn subclass<P: ?Sized + 'static>(&mut self, name: &str) -> Result<Box<P>> {
        self.object::<Box<P>>(name)
    }

    /// Take a subclass list attribute
    pub fn subclasses<P: ?Sized + 'static>(&mut self, name: &str) -> Result<Vec<Box<P>>> {
        self.object::<Vec<Box<P>>>(name)
    }

    /// Take a delayed nested attribute
    pub fn deferred<T: 'static>(&mut self, name: &str) -> Result<Deferred<T>> {
        self.object::<Deferred<T>>(name)
    }
}

// =============================================================================
// Tests
// =============================================================================
