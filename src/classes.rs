//! Process-wide registry of configurable classes by family
//!
//! A *family* is the declared parent type of a subclass attribute: usually a
//! trait object type such as `dyn Storage`, or a concrete configurable type.
//! Each family maps class names to concrete [`Configurable`] types together
//! with the upcast into the family's box type.
//!
//! ```
//! use classconfig::{register_subclasses, Arguments, AttributeRegistry, Configurable, Result};
//!
//! trait Storage {
//!     fn describe(&self) -> String;
//! }
//!
//! struct MemoryStorage;
//!
//! impl Storage for MemoryStorage {
//!     fn describe(&self) -> String {
//!         "memory".into()
//!     }
//! }
//!
//! impl Configurable for MemoryStorage {
//!     fn attributes() -> AttributeRegistry {
//!         AttributeRegistry::new()
//!     }
//!     fn construct(_args: &mut Arguments) -> Result<Self> {
//!         Ok(MemoryStorage)
//!     }
//! }
//!
//! register_subclasses!(dyn Storage => MemoryStorage);
//! assert!(classconfig::classes::lookup_by::<dyn Storage>("MemoryStorage").is_some());
//! ```

use crate::arguments::Arguments;
use crate::error::{AttributePath, Error, Result};
use crate::factory::{self, Deferred};
use crate::schema::{AttributeRegistry, Configurable};
use crate::sync::RwLockExt;
use log::debug;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

// Registered classes per family, in registration order
static CLASSES: Lazy<RwLock<HashMap<TypeId, Vec<SubclassEntry>>>> = Lazy::new(Default::default);

// =============================================================================
// Class Handle
// =============================================================================

/// Type-erased entry points of one configurable class
#[derive(Clone, Copy)]
pub struct ClassHandle {
    name: fn() -> &'static str,
    attributes: fn() -> AttributeRegistry,
    create: fn(&Value, &AttributeRegistry, &AttributePath) -> Result<Box<dyn Any>>,
    build: fn(&AttributeRegistry, &AttributePath) -> Result<Box<dyn Any>>,
    defer: fn(Option<Value>, AttributeRegistry, AttributePath) -> Box<dyn Any>,
}

impl ClassHandle {
    #[must_use]
    pub fn of<T: Configurable>() -> Self {
        Self {
            name: T::class_name,
            attributes: T::attributes,
            create: create_erased::<T>,
            build: build_erased::<T>,
            defer: defer_erased::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        (self.name)()
    }

    pub fn attributes(&self) -> AttributeRegistry {
        (self.attributes)()
    }

    /// Instantiate from a loaded subtree; the box holds the concrete type
    pub(crate) fn create(
        &self,
        loaded: &Value,
        registry: &AttributeRegistry,
        path: &AttributePath,
    ) -> Result<Box<dyn Any>> {
        (self.create)(loaded, registry, path)
    }

    /// Instantiate from defaults only
    pub(crate) fn build(
        &self,
        registry: &AttributeRegistry,
        path: &AttributePath,
    ) -> Result<Box<dyn Any>> {
        (self.build)(registry, path)
    }

    /// Wrap in a [`Deferred`] handle without instantiating
    pub(crate) fn defer(
        &self,
        loaded: Option<Value>,
        registry: AttributeRegistry,
        path: AttributePath,
    ) -> Box<dyn Any> {
        (self.defer)(loaded, registry, path)
    }
}

impl fmt::Debug for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassHandle").field(&self.name()).finish()
    }
}

fn create_erased<T: Configurable>(
    loaded: &Value,
    registry: &AttributeRegistry,
    path: &AttributePath,
) -> Result<Box<dyn Any>> {
    let object = factory::create_object::<T>(loaded, registry, Arguments::new(), path)?;
    Ok(Box::new(object))
}

fn build_erased<T: Configurable>(
    registry: &AttributeRegistry,
    path: &AttributePath,
) -> Result<Box<dyn Any>> {
    let object = factory::build::<T>(registry, Arguments::new(), path)?;
    Ok(Box::new(object))
}

fn defer_erased<T: Configurable>(
    loaded: Option<Value>,
    registry: AttributeRegistry,
    path: AttributePath,
) -> Box<dyn Any> {
    Box::new(Deferred::<T>::new(loaded, registry, path))
}

// =============================================================================
// Family
// =============================================================================

/// Declared parent type of a subclass attribute
#[derive(Clone, Copy)]
pub struct Family {
    type_id: TypeId,
    type_name: &'static str,
    collect: fn(Vec<Box<dyn Any>>) -> Box<dyn Any>,
}

impl Family {
    #[must_use]
    pub fn of<P: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            collect: collect_boxes::<P>,
        }
    }

    /// Readable family name, e.g. `dyn Storage`
    pub fn name(&self) -> String {
        match self.type_name.strip_prefix("dyn ") {
            Some(rest) => format!("dyn {}", short_name(rest)),
            None => short_name(self.type_name).to_string(),
        }
    }

    /// Gather upcast members into a `Vec<Box<P>>`, boxed as `Any`
    pub(crate) fn collect(&self, items: Vec<Box<dyn Any>>) -> Box<dyn Any> {
        (self.collect)(items)
    }
}

impl PartialEq for Family {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for Family {}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Family").field(&self.name()).finish()
    }
}

fn collect_boxes<P: ?Sized + 'static>(items: Vec<Box<dyn Any>>) -> Box<dyn Any> {
    let members: Vec<Box<P>> = items
        .into_iter()
        .filter_map(|item| item.downcast::<Box<P>>().ok())
        .map(|member| *member)
        .collect();
    Box::new(members)
}

/// Last path segment of a type name, generic arguments kept
pub(crate) fn short_name(full: &'static str) -> &'static str {
    // auto-trait bounds like `+ Send` are not part of the name
    let generics = full.find('<').unwrap_or(full.len());
    let full = match full[..generics].find(" + ") {
        Some(end) => &full[..end],
        None => full,
    };
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

// =============================================================================
// Subclass Entry
// =============================================================================

type Upcast = Arc<dyn Fn(Box<dyn Any>) -> Option<Box<dyn Any>> + Send + Sync>;

/// A concrete class registered under a family
#[derive(Clone)]
pub struct SubclassEntry {
    name: String,
    class: ClassHandle,
    upcast: Upcast,
}

impl SubclassEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> ClassHandle {
        self.class
    }

    /// Attribute registry governing this class's `config` node
    pub fn attributes(&self) -> AttributeRegistry {
        self.class.attributes()
    }

    /// Instantiate from a loaded `config` subtree; the box holds `Box<P>`
    pub(crate) fn create(
        &self,
        config: &Value,
        registry: &AttributeRegistry,
        path: &AttributePath,
    ) -> Result<Box<dyn Any>> {
        let object = self.class.create(config, registry, path)?;
        self.upcast(object, path)
    }

    /// Instantiate from the defaults of `registry`; the box holds `Box<P>`
    pub(crate) fn build(
        &self,
        registry: &AttributeRegistry,
        path: &AttributePath,
    ) -> Result<Box<dyn Any>> {
        let object = self.class.build(registry, path)?;
        self.upcast(object, path)
    }

    fn upcast(&self, object: Box<dyn Any>, path: &AttributePath) -> Result<Box<dyn Any>> {
        (self.upcast)(object).ok_or_else(|| {
            Error::construction(
                path,
                format!("class '{}' produced an object of another type", self.name),
            )
        })
    }
}

impl fmt::Debug for SubclassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubclassEntry")
            .field("name", &self.name)
            .field("class", &self.class)
            .finish()
    }
}

// =============================================================================
// Registration and Lookup
// =============================================================================

/// Register `T` as a member of family `P` under `T::class_name()`.
///
/// Registering a name again replaces the previous entry in place, so calling
/// this repeatedly for the same class is harmless.
pub fn register_subclass<P, T>(upcast: fn(T) -> Box<P>)
where
    P: ?Sized + 'static,
    T: Configurable,
{
    let family = Family::of::<P>();
    let entry = SubclassEntry {
        name: T::class_name().to_string(),
        class: ClassHandle::of::<T>(),
        upcast: Arc::new(move |object: Box<dyn Any>| {
            object
                .downcast::<T>()
                .ok()
                .map(|concrete| Box::new(upcast(*concrete)) as Box<dyn Any>)
        }),
    };

    let mut classes = CLASSES.write_recovered();
    let members = classes.entry(family.type_id).or_default();
    match members.iter_mut().find(|e| e.name == entry.name) {
        Some(existing) => *existing = entry,
        None => {
            debug!("Registered class {} for {}", entry.name, family.name());
            members.push(entry);
        }
    }
}

/// Find a class of the family by exact (case-sensitive) name
pub fn lookup(family: &Family, name: &str) -> Option<SubclassEntry> {
    CLASSES
        .read_recovered()
        .get(&family.type_id)
        .and_then(|members| members.iter().find(|e| e.name == name).cloned())
}

/// [`lookup`] for the family of `P`
pub fn lookup_by<P: ?Sized + 'static>(name: &str) -> Option<SubclassEntry> {
    lookup(&Family::of::<P>(), name)
}

/// Names registered for the family, in registration order
pub fn names(family: &Family) -> Vec<String> {
    CLASSES
        .read_recovered()
        .get(&family.type_id)
        .map(|members| members.iter().map(|e| e.name.clone()).collect())
        .unwrap_or_default()
}

/// [`lookup`] that reports a miss as a resolution error at `path`
pub fn resolve(family: &Family, name: &str, path: &AttributePath) -> Result<SubclassEntry> {
    lookup(family, name).ok_or_else(|| Error::Resolution {
        path: path.clone(),
        name: name.to_string(),
        family: family.name(),
    })
}

/// Register several classes of one family.
///
/// ```ignore
/// register_subclasses!(dyn Storage => DiskStorage, S3Storage);
/// ```
#[macro_export]
macro_rules! register_subclasses {
    ($parent:ty => $($child:ty),+ $(,)?) => {{
        $(
            $crate::register_subclass::<$parent, $child>(|object| ::std::boxed::Box::new(object));
        )+
    }};
}

// =============================================================================
// Tests
// =============================================================================
