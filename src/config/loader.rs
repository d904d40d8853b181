//! Structural matching, transformation and validation of raw data trees

use crate::classes::{self, Family};
use crate::error::{AttributePath, Error, Result};
use crate::schema::{AttributeKind, AttributeRegistry, AttributeSpec};
use crate::transformers::TransformContext;
use crate::validators::ValueKind;
use serde_json::{Map, Value};

/// Check `raw` against `registry`, returning the normalized tree.
///
/// Attributes are processed depth-first in registry order and the first
/// problem aborts the walk.
pub(crate) fn trans_and_val(
    raw: &Value,
    registry: &AttributeRegistry,
    ctx: &TransformContext,
    path: &AttributePath,
) -> Result<Value> {
    let empty = Map::new();
    let node = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(Error::schema(
                path,
                format!("expected a mapping, got {}", ValueKind::of(other)),
            ));
        }
    };

    for key in node.keys() {
        if !registry.get(key).is_some_and(|spec| !spec.is_hidden()) {
            return Err(Error::schema(
                &path.key(key.as_str()),
                format!(
                    "unknown attribute '{key}' (expected one of: {})",
                    registry
                        .visible()
                        .map(AttributeSpec::name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }
    }

    let mut out = Map::new();
    for spec in registry.visible() {
        let name = spec.name();
        let attr_path = path.key(name);
        let value = node.get(name);

        let loaded = match spec.kind() {
            AttributeKind::Value => load_value(spec, value, ctx, &attr_path)?,
            AttributeKind::Factory(factory) => {
                let nested = factory.registry(&attr_path)?;
                trans_and_val(value.unwrap_or(&Value::Null), &nested, ctx, &attr_path)?
            }
            AttributeKind::Subclass(subclass) => match value {
                Some(record) if !record.is_null() => {
                    load_record(subclass.family(), record, ctx, &attr_path)?
                }
                _ => {
                    let Some(cls) = subclass.default_class() else {
                        return Err(Error::schema(
                            &attr_path,
                            "missing required attribute: no class selected",
                        ));
                    };
                    load_default_record(subclass.family(), cls, &Map::new(), ctx, &attr_path)?
                }
            },
            AttributeKind::SubclassList(list) => match value {
                Some(Value::Array(items)) => Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| load_record(list.family(), item, ctx, &attr_path.index(i)))
                        .collect::<Result<_>>()?,
                ),
                Some(Value::Null) => Value::Array(Vec::new()),
                None => Value::Array(
                    list.defaults()
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            load_default_record(
                                list.family(),
                                &item.cls,
                                &item.config,
                                ctx,
                                &attr_path.index(i),
                            )
                        })
                        .collect::<Result<_>>()?,
                ),
                Some(other) => {
                    return Err(Error::schema(
                        &attr_path,
                        format!("expected a sequence, got {}", ValueKind::of(other)),
                    ));
                }
            },
        };
        out.insert(name.to_string(), loaded);
    }
    Ok(Value::Object(out))
}

fn load_value(
    spec: &AttributeSpec,
    value: Option<&Value>,
    ctx: &TransformContext,
    path: &AttributePath,
) -> Result<Value> {
    match (value, spec.default_value()) {
        (Some(Value::Null), None) | (None, None) => Err(Error::schema(
            path,
            "missing required attribute: no value given and no default",
        )),
        (Some(value), _) => spec.resolve_value(value.clone(), ctx, path),
        (None, Some(default)) => spec.resolve_value(default.clone(), ctx, path),
    }
}

/// `{cls, config}` record read from a document
fn load_record(
    family: &Family,
    record: &Value,
    ctx: &TransformContext,
    path: &AttributePath,
) -> Result<Value> {
    let Value::Object(map) = record else {
        return Err(Error::schema(
            path,
            format!(
                "expected a mapping with 'cls' and 'config', got {}",
                ValueKind::of(record)
            ),
        ));
    };
    if let Some(extra) = map.keys().find(|k| *k != "cls" && *k != "config") {
        return Err(Error::schema(
            &path.key(extra.as_str()),
            "unknown key, expected only 'cls' and 'config'",
        ));
    }

    let cls_path = path.key("cls");
    let cls = match map.get("cls") {
        Some(Value::String(cls)) => cls,
        Some(other) => {
            return Err(Error::schema(
                &cls_path,
                format!("expected a class name, got {}", ValueKind::of(other)),
            ));
        }
        None => return Err(Error::schema(&cls_path, "missing class name")),
    };
    let entry = classes::resolve(family, cls, &cls_path)?;

    let config_path = path.key("config");
    let config = trans_and_val(
        map.get("config").unwrap_or(&Value::Null),
        &entry.attributes(),
        ctx,
        &config_path,
    )?;
    Ok(record_value(cls, config))
}

/// `{cls, config}` record built from a default class and its overrides
fn load_default_record(
    family: &Family,
    cls: &str,
    overrides: &Map<String, Value>,
    ctx: &TransformContext,
    path: &AttributePath,
) -> Result<Value> {
    let entry = classes::resolve(family, cls, &path.key("cls"))?;
    let config_path = path.key("config");
    let registry = entry
        .attributes()
        .with_default_overrides(overrides, &config_path)?;
    let config = trans_and_val(&Value::Null, &registry, ctx, &config_path)?;
    Ok(record_value(cls, config))
}

fn record_value(cls: &str, config: Value) -> Value {
    let mut record = Map::new();
    record.insert("cls".to_string(), Value::String(cls.to_string()));
    record.insert("config".to_string(), config);
    Value::Object(record)
}
