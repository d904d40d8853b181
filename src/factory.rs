//! Instantiation of configurable classes
//!
//! [`build`] turns keyword arguments into an instance, filling in defaults.
//! [`create_object`] walks a loaded tree alongside the class's registry and
//! builds nested objects before handing everything to [`build`].

use crate::arguments::{Argument, Arguments};
use crate::classes::{self, Family};
use crate::config::{Config, LoadedConfig};
use crate::error::{AttributePath, Error, Result};
use crate::schema::{AttributeKind, AttributeRegistry, Configurable};
use crate::transformers::TransformContext;
use log::debug;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

// =============================================================================
// Construction
// =============================================================================

/// Construct `T` from keyword arguments, resolving every attribute that was
/// not supplied from its default.
pub(crate) fn build<T: Configurable>(
    registry: &AttributeRegistry,
    mut args: Arguments,
    path: &AttributePath,
) -> Result<T> {
    if let Some(unknown) = args.names().find(|name| !registry.contains(name)) {
        return Err(Error::construction(
            &path.key(unknown),
            format!(
                "unexpected argument '{unknown}' for {} (known: {})",
                T::class_name(),
                registry.names().join(", ")
            ),
        ));
    }

    let defaults_ctx = TransformContext::default();
    for spec in registry {
        let name = spec.name();
        let attr_path = path.key(name);

        if args.contains(name) {
            if let Some(value) = args.raw_value(name) {
                if matches!(spec.kind(), AttributeKind::Value) {
                    spec.check_value(value, &attr_path)?;
                }
            }
            continue;
        }

        let argument = match spec.kind() {
            AttributeKind::Value => {
                let Some(default) = spec.default_value() else {
                    return Err(Error::construction(
                        &attr_path,
                        format!("missing required attribute '{name}' of {}", T::class_name()),
                    ));
                };
                Argument::Value(spec.resolve_value(default.clone(), &defaults_ctx, &attr_path)?)
            }
            AttributeKind::Factory(factory) => {
                let nested = factory.registry(&attr_path)?;
                if factory.is_delayed() {
                    Argument::Object(factory.class().defer(None, nested, attr_path))
                } else {
                    Argument::Object(factory.class().build(&nested, &attr_path)?)
                }
            }
            AttributeKind::Subclass(subclass) => {
                let Some(cls) = subclass.default_class() else {
                    return Err(Error::construction(
                        &attr_path,
                        format!(
                            "missing required attribute '{name}' of {}: no default class",
                            T::class_name()
                        ),
                    ));
                };
                let entry = classes::resolve(subclass.family(), cls, &attr_path.key("cls"))?;
                Argument::Object(entry.build(&entry.attributes(), &attr_path.key("config"))?)
            }
            AttributeKind::SubclassList(list) => {
                let mut members = Vec::with_capacity(list.defaults().len());
                for (i, item) in list.defaults().iter().enumerate() {
                    let item_path = attr_path.index(i);
                    let entry = classes::resolve(list.family(), &item.cls, &item_path.key("cls"))?;
                    let config_path = item_path.key("config");
                    let item_registry = entry
                        .attributes()
                        .with_default_overrides(&item.config, &config_path)?;
                    members.push(entry.build(&item_registry, &config_path)?);
                }
                Argument::Object(list.family().collect(members))
            }
        };
        args.insert(name, argument);
    }

    debug!("Constructing {} at {}", T::class_name(), path);
    args.set_path(path.clone());
    T::construct(&mut args)
}

/// Construct `T` from a loaded subtree; `overrides` win over loaded values.
pub(crate) fn create_object<T: Configurable>(
    loaded: &Value,
    registry: &AttributeRegistry,
    overrides: Arguments,
    path: &AttributePath,
) -> Result<T> {
    let node = match loaded {
        Value::Object(map) => Some(map),
        Value::Null => None,
        other => {
            return Err(Error::schema(
                path,
                format!("expected a mapping for {}, got {other}", T::class_name()),
            ));
        }
    };

    let mut args = Arguments::new();
    for spec in registry.visible() {
        let name = spec.name();
        if overrides.contains(name) {
            continue;
        }
        let attr_path = path.key(name);
        let value = node.and_then(|map| map.get(name));

        match spec.kind() {
            AttributeKind::Value => {
                if let Some(value) = value {
                    args.insert(name, Argument::Value(value.clone()));
                }
            }
            AttributeKind::Factory(factory) => {
                let nested = factory.registry(&attr_path)?;
                let object = if factory.is_delayed() {
                    factory.class().defer(value.cloned(), nested, attr_path)
                } else {
                    match value {
                        Some(value) => factory.class().create(value, &nested, &attr_path)?,
                        None => factory.class().build(&nested, &attr_path)?,
                    }
                };
                args.insert(name, Argument::Object(object));
            }
            AttributeKind::Subclass(subclass) => {
                if let Some(value) = value.filter(|v| !v.is_null()) {
                    let member = create_member(subclass.family(), value, &attr_path)?;
                    args.insert(name, Argument::Object(member));
                }
            }
            AttributeKind::SubclassList(list) => match value {
                Some(Value::Array(items)) => {
                    let members = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| create_member(list.family(), item, &attr_path.index(i)))
                        .collect::<Result<Vec<_>>>()?;
                    args.insert(name, Argument::Object(list.family().collect(members)));
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(Error::schema(
                        &attr_path,
                        format!("expected a sequence, got {other}"),
                    ));
                }
            },
        }
    }

    args.merge(overrides);
    build::<T>(registry, args, path)
}

/// Resolve and construct one `{cls, config}` record; the box holds `Box<P>`
fn create_member(family: &Family, node: &Value, path: &AttributePath) -> Result<Box<dyn Any>> {
    let cls = node
        .get("cls")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::schema(&path.key("cls"), "expected a class name"))?;
    let entry = classes::resolve(family, cls, &path.key("cls"))?;
    let config = node.get("config").unwrap_or(&Value::Null);
    entry.create(config, &entry.attributes(), &path.key("config"))
}

fn downcast_member<P: ?Sized + 'static>(
    object: Box<dyn Any>,
    path: &AttributePath,
) -> Result<Box<P>> {
    object
        .downcast::<Box<P>>()
        .map(|member| *member)
        .map_err(|_| Error::construction(path, "member has an unexpected type"))
}

// =============================================================================
// Deferred
// =============================================================================

/// Handle of a nested object whose construction was postponed.
///
/// Produced for attributes declared with `delay_init`. Each call to
/// [`create`](Self::create) builds a fresh instance.
pub struct Deferred<T> {
    loaded: Option<Value>,
    registry: AttributeRegistry,
    path: AttributePath,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Deferred<T> {
    pub(crate) fn new(
        loaded: Option<Value>,
        registry: AttributeRegistry,
        path: AttributePath,
    ) -> Self {
        Self {
            loaded,
            registry,
            path,
            _marker: PhantomData,
        }
    }

    /// Loaded subtree the instance will be built from, if any
    pub fn loaded(&self) -> Option<&Value> {
        self.loaded.as_ref()
    }

    pub fn path(&self) -> &AttributePath {
        &self.path
    }
}

impl<T: Configurable> Deferred<T> {
    /// Build the instance
    pub fn create(&self) -> Result<T> {
        self.create_with(Arguments::new())
    }

    /// Build the instance; `overrides` win over loaded values
    pub fn create_with(&self, overrides: Arguments) -> Result<T> {
        match &self.loaded {
            Some(loaded) => create_object::<T>(loaded, &self.registry, overrides, &self.path),
            None => build::<T>(&self.registry, overrides, &self.path),
        }
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self::new(self.loaded.clone(), self.registry.clone(), self.path.clone())
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("class", &std::any::type_name::<T>())
            .field("path", &self.path)
            .field("loaded", &self.loaded)
            .finish()
    }
}

// =============================================================================
// Factories
// =============================================================================

/// Builds instances of `T` from loaded configurations
pub struct ConfigurableFactory<T> {
    registry: AttributeRegistry,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Configurable> ConfigurableFactory<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(T::attributes())
    }

    /// Factory interpreting loaded trees with a custom view of `T`'s
    /// attributes (for example one with omitted attributes)
    #[must_use]
    pub fn with_registry(registry: AttributeRegistry) -> Self {
        Self {
            registry,
            _marker: PhantomData,
        }
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Build an instance from `loaded`; `overrides` win over loaded values
    pub fn create(&self, loaded: &LoadedConfig, overrides: Arguments) -> Result<T> {
        create_object::<T>(loaded.as_value(), &self.registry, overrides, &AttributePath::root())
    }

    /// Build an instance from keyword arguments and defaults
    pub fn build(&self, args: Arguments) -> Result<T> {
        build::<T>(&self.registry, args, &AttributePath::root())
    }
}

impl<T: Configurable> Default for ConfigurableFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a member of family `P` from a loaded `{cls, config}` record
pub struct ConfigurableSubclassFactory<P: ?Sized> {
    family: Family,
    _marker: PhantomData<fn() -> Box<P>>,
}

impl<P: ?Sized + 'static> ConfigurableSubclassFactory<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            family: Family::of::<P>(),
            _marker: PhantomData,
        }
    }

    pub fn family(&self) -> &Family {
        &self.family
    }

    /// Resolve the `cls` of `loaded` and build it from its `config`
    pub fn create(&self, loaded: &LoadedConfig) -> Result<Box<P>> {
        let root = AttributePath::root();
        let member = create_member(&self.family, loaded.as_value(), &root)?;
        downcast_member::<P>(member, &root)
    }

    /// Build the class named `cls` from its defaults
    pub fn build(&self, cls: &str) -> Result<Box<P>> {
        let root = AttributePath::root();
        let entry = classes::resolve(&self.family, cls, &root.key("cls"))?;
        let member = entry.build(&entry.attributes(), &root.key("config"))?;
        downcast_member::<P>(member, &root)
    }
}

impl<P: ?Sized + 'static> Default for ConfigurableSubclassFactory<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds members of family `P` from a loaded sequence of `{cls, config}`
/// records
pub struct ListOfConfigurableSubclassFactory<P: ?Sized> {
    family: Family,
    _marker: PhantomData<fn() -> Box<P>>,
}

impl<P: ?Sized + 'static> ListOfConfigurableSubclassFactory<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            family: Family::of::<P>(),
            _marker: PhantomData,
        }
    }

    /// Build every record in order; a null tree yields no members
    pub fn create(&self, loaded: &LoadedConfig) -> Result<Vec<Box<P>>> {
        let root = AttributePath::root();
        let items = match loaded.as_value() {
            Value::Array(items) => items.as_slice(),
            Value::Null => &[],
            other => {
                return Err(Error::schema(&root, format!("expected a sequence, got {other}")));
            }
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let path = root.index(i);
                create_member(&self.family, item, &path)
                    .and_then(|member| downcast_member::<P>(member, &path))
            })
            .collect()
    }
}

impl<P: ?Sized + 'static> Default for ListOfConfigurableSubclassFactory<P> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Creatable
// =============================================================================

/// Where [`Creatable::create`] reads its configuration from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// YAML file; relative paths inside resolve against its directory
    File(PathBuf),
    /// Already parsed data tree
    Data(Value),
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::File(path.to_path_buf())
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::File(path)
    }
}

impl From<&PathBuf> for ConfigSource {
    fn from(path: &PathBuf) -> Self {
        ConfigSource::File(path.clone())
    }
}

impl From<&str> for ConfigSource {
    fn from(path: &str) -> Self {
        ConfigSource::File(PathBuf::from(path))
    }
}

impl From<Value> for ConfigSource {
    fn from(data: Value) -> Self {
        ConfigSource::Data(data)
    }
}

/// Load-and-build in one step.
///
/// Implemented for every [`Configurable`] type.
pub trait Creatable: Configurable {
    /// Load (file) or check (data) the configuration, then build an instance
    fn create(source: impl Into<ConfigSource>) -> Result<Self> {
        let config = Config::of::<Self>();
        let loaded = match source.into() {
            ConfigSource::File(path) => config.load(&path)?,
            ConfigSource::Data(data) => config.trans_and_val(&data, None)?,
        };
        ConfigurableFactory::<Self>::with_registry(config.registry().clone())
            .create(&loaded, Arguments::new())
    }
}

impl<T: Configurable> Creatable for T {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, Omit};
    use crate::validators::MinValueIntegerValidator;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Pool {
        size: i64,
        name: String,
    }

    impl Configurable for Pool {
        fn attributes() -> AttributeRegistry {
            AttributeRegistry::new()
                .with(
                    AttributeSpec::value("size", "Pool size")
                        .default(4)
                        .validator(MinValueIntegerValidator(1)),
                )
                .with(AttributeSpec::value("name", "Pool name"))
        }

        fn construct(args: &mut Arguments) -> Result<Self> {
            Ok(Self {
                size: args.value("size")?,
                name: args.value("name")?,
            })
        }
    }

    struct Service {
        pool: Pool,
        lazy: Deferred<Pool>,
    }

    impl Configurable for Service {
        fn attributes() -> AttributeRegistry {
            AttributeRegistry::new()
                .with(
                    AttributeSpec::factory::<Pool>("pool", "Main pool")
                        .override_default("name", "main"),
                )
                .with(
                    AttributeSpec::factory::<Pool>("lazy", "Lazy pool")
                        .override_default("name", "lazy")
                        .omit(Omit::new().attribute("size"))
                        .delay_init(),
                )
        }

        fn construct(args: &mut Arguments) -> Result<Self> {
            Ok(Self {
                pool: args.object("pool")?,
                lazy: args.deferred("lazy")?,
            })
        }
    }

    #[test]
    fn test_build_requires_attributes() {
        let err = Pool::defaults().unwrap_err();
        assert!(err.is_construction_error());
        assert!(err.to_string().contains("'name'"));

        let pool = Pool::from_arguments(Arguments::new().set("name", "p")).unwrap();
        assert_eq!(pool, Pool { size: 4, name: "p".into() });
    }

    struct Pools {
        main: Pool,
    }

    impl Configurable for Pools {
        fn attributes() -> AttributeRegistry {
            AttributeRegistry::new().with(AttributeSpec::factory::<Pool>("main", "Main pool"))
        }

        fn construct(args: &mut Arguments) -> Result<Self> {
            Ok(Self {
                main: args.object("main")?,
            })
        }
    }

    #[test]
    fn test_missing_required_error_names_attribute() {
        let err = Pool::defaults().unwrap_err();
        assert_eq!(err.path().unwrap().to_string(), "name");

        let err = Pools::defaults().err().unwrap();
        assert!(err.is_construction_error());
        assert_eq!(err.path().unwrap().to_string(), "main.name");

        let err = Pool::from_arguments(Arguments::new().set("name", "p").set("colour", "red"))
            .unwrap_err();
        assert_eq!(err.path().unwrap().to_string(), "colour");

        let pools = Pools::from_arguments(
            Arguments::new().set_object("main", Pool { size: 1, name: "m".into() }),
        )
        .unwrap();
        assert_eq!(pools.main.name, "m");
    }

    #[test]
    fn test_build_rejects_unknown_and_invalid() {
        let err = Pool::from_arguments(Arguments::new().set("name", "p").set("colour", "red"))
            .unwrap_err();
        assert!(err.is_construction_error());
        assert!(err.to_string().contains("colour"));

        let err =
            Pool::from_arguments(Arguments::new().set("name", "p").set("size", 0)).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_nested_defaults_and_deferred() {
        let service = Service::defaults().unwrap();
        assert_eq!(service.pool, Pool { size: 4, name: "main".into() });

        assert!(service.lazy.loaded().is_none());
        let lazy = service.lazy.create().unwrap();
        assert_eq!(lazy, Pool { size: 4, name: "lazy".into() });

        let lazy = service
            .lazy
            .create_with(Arguments::new().set("size", 9))
            .unwrap();
        assert_eq!(lazy.size, 9);
    }

    #[test]
    fn test_create_object_from_tree() {
        let loaded = json!({
            "pool": {"size": 2, "name": "primary"},
            "lazy": {"name": "later"}
        });
        let service = create_object::<Service>(
            &loaded,
            &Service::attributes(),
            Arguments::new(),
            &AttributePath::root(),
        )
        .unwrap();

        assert_eq!(service.pool, Pool { size: 2, name: "primary".into() });
        assert_eq!(service.lazy.loaded(), Some(&json!({"name": "later"})));
        assert_eq!(service.lazy.create().unwrap().name, "later");
    }

    #[test]
    fn test_overrides_win_over_loaded() {
        let factory = ConfigurableFactory::<Pool>::new();
        let loaded = LoadedConfig::new(json!({"size": 2, "name": "loaded"}));

        let pool = factory
            .create(&loaded, Arguments::new().set("name", "explicit"))
            .unwrap();
        assert_eq!(pool, Pool { size: 2, name: "explicit".into() });
    }

    #[test]
    fn test_create_object_rejects_non_mapping() {
        let err = create_object::<Pool>(
            &json!([1, 2]),
            &Pool::attributes(),
            Arguments::new(),
            &AttributePath::root().key("pool"),
        )
        .unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_config_source_conversions() {
        assert_eq!(
            ConfigSource::from("conf.yaml"),
            ConfigSource::File(PathBuf::from("conf.yaml"))
        );
        assert_eq!(
            ConfigSource::from(json!({"a": 1})),
            ConfigSource::Data(json!({"a": 1}))
        );
    }
}
