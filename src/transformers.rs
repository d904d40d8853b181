//! Value transformers
//!
//! Transformers normalize raw document values before they are validated,
//! e.g. resolving a relative path against the configuration file's directory
//! or mapping `-1` workers to the number of available cores. They are pure:
//! the only outside input is the [`TransformContext`] handed in by the loader.

use crate::classes::{self, Family};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Information available to transformers while a document is being loaded
#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    base_dir: Option<PathBuf>,
}

impl TransformContext {
    /// Context for a document read from a file inside `base_dir`
    #[must_use]
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf),
        }
    }

    /// Directory containing the configuration file being loaded
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }
}

/// Transformation capability for a single value
pub trait Transformer: Send + Sync {
    /// Map the raw value to its normalized form or explain why it cannot be
    fn transform(&self, value: Value, ctx: &TransformContext) -> Result<Value, String>;
}

impl<F> Transformer for F
where
    F: Fn(Value, &TransformContext) -> Result<Value, String> + Send + Sync,
{
    fn transform(&self, value: Value, ctx: &TransformContext) -> Result<Value, String> {
        self(value, ctx)
    }
}

// =============================================================================
// Combinators
// =============================================================================

/// Applies sub-transformers in order and keeps the first successful result.
///
/// Failures of earlier alternatives are discarded; if every alternative fails
/// the error lists all of them.
#[derive(Clone, Default)]
pub struct TryTransforms {
    transformers: Vec<Arc<dyn Transformer>>,
}

impl TryTransforms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }
}

impl Transformer for TryTransforms {
    fn transform(&self, value: Value, ctx: &TransformContext) -> Result<Value, String> {
        let mut reasons = Vec::with_capacity(self.transformers.len());
        for transformer in &self.transformers {
            match transformer.transform(value.clone(), ctx) {
                Ok(transformed) => return Ok(transformed),
                Err(reason) => reasons.push(reason),
            }
        }
        Err(format!(
            "All transformations failed: {}",
            reasons.join("; ")
        ))
    }
}

/// Applies the inner transformer unless the value is `null`
#[derive(Clone)]
pub struct TransformIfNotNone {
    inner: Arc<dyn Transformer>,
}

impl TransformIfNotNone {
    #[must_use]
    pub fn new(inner: impl Transformer + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl Transformer for TransformIfNotNone {
    fn transform(&self, value: Value, ctx: &TransformContext) -> Result<Value, String> {
        if value.is_null() {
            return Ok(value);
        }
        self.inner.transform(value, ctx)
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Resolves relative path strings against the configuration file's directory.
///
/// A leading `~` expands to the home directory. Absolute paths pass through.
#[derive(Debug, Clone, Default)]
pub struct RelativePathTransformer {
    base_path: Option<PathBuf>,
    force_relative_prefix: bool,
    allow_none: bool,
}

impl RelativePathTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve against this directory instead of the loaded file's directory
    #[must_use]
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Only resolve paths written as `./x` or `../x`; others pass through
    #[must_use]
    pub fn force_relative_prefix(mut self) -> Self {
        self.force_relative_prefix = true;
        self
    }

    /// Let `null` pass through instead of failing
    #[must_use]
    pub fn allow_none(mut self) -> Self {
        self.allow_none = true;
        self
    }
}

impl Transformer for RelativePathTransformer {
    fn transform(&self, value: Value, ctx: &TransformContext) -> Result<Value, String> {
        if value.is_null() && self.allow_none {
            return Ok(value);
        }
        let Some(raw) = value.as_str() else {
            return Err(format!("Expected a path string, got {value}"));
        };

        let path = PathBuf::from(raw);
        let expanded = if path.starts_with("~") {
            match dirs::home_dir() {
                Some(home) => home.join(path.strip_prefix("~").unwrap_or(&path)),
                None => path,
            }
        } else {
            path
        };

        if expanded.is_absolute() {
            return Ok(Value::String(expanded.to_string_lossy().into_owned()));
        }

        if self.force_relative_prefix && !(raw.starts_with("./") || raw.starts_with("../")) {
            return Ok(Value::String(raw.to_string()));
        }

        let base = self.base_path.as_deref().or_else(|| ctx.base_dir());
        let resolved = match base {
            Some(base) => base.join(&expanded),
            None => expanded,
        };
        Ok(Value::String(resolved.to_string_lossy().into_owned()))
    }
}

// =============================================================================
// Workers
// =============================================================================

/// Maps a requested worker count onto the machine's cores.
///
/// Positive counts pass through. `0` and `-1` mean every core, `-2` every core
/// but one, and so on. The result is never below one.
#[derive(Debug, Clone, Copy)]
pub struct CpuWorkersTransformer {
    cores: usize,
}

impl CpuWorkersTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cores: num_cpus::get(),
        }
    }

    /// Use a fixed core count instead of the detected one
    #[must_use]
    pub fn with_cores(cores: usize) -> Self {
        Self { cores }
    }
}

impl Default for CpuWorkersTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for CpuWorkersTransformer {
    fn transform(&self, value: Value, _ctx: &TransformContext) -> Result<Value, String> {
        let requested = value
            .as_i64()
            .ok_or_else(|| format!("Expected an integer worker count, got {value}"))?;

        if requested > 0 {
            return Ok(value);
        }

        let cores = i64::try_from(self.cores).unwrap_or(i64::MAX);
        let offset = if requested == 0 { 0 } else { requested + 1 };
        Ok(Value::from((cores + offset).max(1)))
    }
}

// =============================================================================
// Enums and Classes
// =============================================================================

/// Maps a member name to the canonical serialized form of a serde enum.
///
/// The result deserializes back into `T`, so `Arguments::value::<T>` yields
/// the enum member directly.
pub struct EnumTransformer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> EnumTransformer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for EnumTransformer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EnumTransformer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Transformer for EnumTransformer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn transform(&self, value: Value, _ctx: &TransformContext) -> Result<Value, String> {
        let enum_name = short_type_name::<T>();
        let Value::String(name) = &value else {
            return Err(format!(
                "Expected a member name of {enum_name}, got {value}"
            ));
        };

        let member: T = serde_json::from_value(value.clone())
            .map_err(|_| format!("'{name}' is not a member of {enum_name}"))?;
        serde_json::to_value(member).map_err(|e| e.to_string())
    }
}

/// Checks that a class name is registered for a family and passes it through
#[derive(Debug, Clone, Copy)]
pub struct SubclassTransformer {
    family: Family,
}

impl SubclassTransformer {
    /// Transformer accepting names of classes registered for family `P`
    #[must_use]
    pub fn of<P: ?Sized + 'static>() -> Self {
        Self {
            family: Family::of::<P>(),
        }
    }
}

impl Transformer for SubclassTransformer {
    fn transform(&self, value: Value, _ctx: &TransformContext) -> Result<Value, String> {
        let Value::String(name) = &value else {
            return Err(format!("Expected a class name, got {value}"));
        };
        if classes::lookup(&self.family, name).is_none() {
            return Err(format!(
                "'{name}' is not {} or one of its registered subclasses (known: {})",
                self.family.name(),
                classes::names(&self.family).join(", ")
            ));
        }
        Ok(value)
    }
}

pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    classes::short_name(std::any::type_name::<T>())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    enum Color {
        #[serde(rename = "RED")]
        Red,
        #[serde(rename = "GREEN")]
        Green,
    }

    #[test]
    fn test_enum_transformer() {
        let t = EnumTransformer::<Color>::new();
        let ctx = TransformContext::default();

        let red = t.transform(json!("RED"), &ctx).unwrap();
        assert_eq!(red, json!("RED"));
        assert_eq!(serde_json::from_value::<Color>(red).unwrap(), Color::Red);

        let err = t.transform(json!("PURPLE"), &ctx).unwrap_err();
        assert_eq!(err, "'PURPLE' is not a member of Color");

        assert!(t.transform(json!(1), &ctx).is_err());
    }

    #[test]
    fn test_cpu_workers() {
        let t = CpuWorkersTransformer::with_cores(8);
        let ctx = TransformContext::default();

        assert_eq!(t.transform(json!(3), &ctx).unwrap(), json!(3));
        assert_eq!(t.transform(json!(0), &ctx).unwrap(), json!(8));
        assert_eq!(t.transform(json!(-1), &ctx).unwrap(), json!(8));
        assert_eq!(t.transform(json!(-2), &ctx).unwrap(), json!(7));
        assert_eq!(t.transform(json!(-20), &ctx).unwrap(), json!(1));
        assert!(t.transform(json!("all"), &ctx).is_err());
    }

    #[test]
    fn test_relative_path_uses_base_dir() {
        let t = RelativePathTransformer::new();
        let ctx = TransformContext::new(Some(Path::new("/etc/app")));

        assert_eq!(
            t.transform(json!("data/db.sqlite"), &ctx).unwrap(),
            json!("/etc/app/data/db.sqlite")
        );
        assert_eq!(
            t.transform(json!("/var/lib/db"), &ctx).unwrap(),
            json!("/var/lib/db")
        );
        assert!(t.transform(Value::Null, &ctx).is_err());
    }

    #[test]
    fn test_relative_path_options() {
        let ctx = TransformContext::new(Some(Path::new("/etc/app")));

        let prefixed = RelativePathTransformer::new().force_relative_prefix();
        assert_eq!(
            prefixed.transform(json!("./cache"), &ctx).unwrap(),
            json!("/etc/app/./cache")
        );
        assert_eq!(
            prefixed.transform(json!("cache"), &ctx).unwrap(),
            json!("cache")
        );

        let fixed = RelativePathTransformer::new().base_path("/srv").allow_none();
        assert_eq!(fixed.transform(json!("x"), &ctx).unwrap(), json!("/srv/x"));
        assert_eq!(fixed.transform(Value::Null, &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn test_relative_path_without_base_dir() {
        let t = RelativePathTransformer::new();
        let ctx = TransformContext::new(Some(Path::new("")));
        assert_eq!(t.transform(json!("x/y"), &ctx).unwrap(), json!("x/y"));
    }

    #[test]
    fn test_try_transforms() {
        let ctx = TransformContext::default();
        let t = TryTransforms::new()
            .with(EnumTransformer::<Color>::new())
            .with(|v: Value, _: &TransformContext| {
                v.as_str()
                    .map(|s| Value::String(s.to_uppercase()))
                    .ok_or_else(|| "not a string".to_string())
            });

        assert_eq!(t.transform(json!("GREEN"), &ctx).unwrap(), json!("GREEN"));
        assert_eq!(t.transform(json!("blue"), &ctx).unwrap(), json!("BLUE"));

        let err = t.transform(json!(5), &ctx).unwrap_err();
        assert!(err.starts_with("All transformations failed"));
        assert!(err.contains("not a string"));
    }

    #[test]
    fn test_transform_if_not_none() {
        let ctx = TransformContext::default();
        let t = TransformIfNotNone::new(CpuWorkersTransformer::with_cores(4));
        assert_eq!(t.transform(Value::Null, &ctx).unwrap(), Value::Null);
        assert_eq!(t.transform(json!(-1), &ctx).unwrap(), json!(4));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Color>(), "Color");
        assert_eq!(short_type_name::<String>(), "String");
    }
}
