//! Subclass resolution across families, single attributes and lists

mod common;

use classconfig::classes::{self, lookup_by};
use classconfig::transformers::{SubclassTransformer, TransformContext, Transformer};
use classconfig::{
    Arguments, AttributeRegistry, AttributeSpec, Config, ConfigurableSubclassFactory,
    Configurable, Creatable, Family, ListOfConfigurableSubclassFactory, Result,
};
use common::{hook_labels, register_classes, Hook, Storage};
use serde_json::{json, Map};

struct Archive {
    primary: Box<dyn Storage>,
    mirrors: Vec<Box<dyn Storage>>,
}

impl Configurable for Archive {
    fn attributes() -> AttributeRegistry {
        AttributeRegistry::new()
            .with(AttributeSpec::subclass::<dyn Storage>("primary", "Primary storage"))
            .with(AttributeSpec::subclass_list::<dyn Storage>("mirrors", "Mirror storages"))
    }

    fn construct(args: &mut Arguments) -> Result<Self> {
        Ok(Self {
            primary: args.subclass("primary")?,
            mirrors: args.subclasses("mirrors")?,
        })
    }
}

#[test]
fn test_resolves_selected_class() {
    register_classes();
    let archive = Archive::create(json!({
        "primary": {"cls": "S3Storage", "config": {"bucket": "b"}}
    }))
    .unwrap();

    assert_eq!(archive.primary.describe(), "s3:b@eu-west-1");
    assert!(archive.mirrors.is_empty());
}

#[test]
fn test_unknown_class_is_resolution_error() {
    register_classes();
    let err = Config::of::<Archive>()
        .trans_and_val(&json!({"primary": {"cls": "Unknown", "config": {}}}), None)
        .unwrap_err();

    assert!(err.is_resolution_error());
    let msg = err.to_string();
    assert!(msg.contains("'Unknown'"));
    assert!(msg.contains("dyn Storage"));
    assert_eq!(err.path().unwrap().to_string(), "primary.cls");
}

#[test]
fn test_class_names_are_case_sensitive() {
    register_classes();
    let err = Archive::create(json!({"primary": {"cls": "s3storage", "config": {"bucket": "b"}}}))
        .err()
        .unwrap();
    assert!(err.is_resolution_error());
}

#[test]
fn test_required_subclass() {
    register_classes();
    let err = Config::of::<Archive>()
        .trans_and_val(&json!({}), None)
        .unwrap_err();
    assert!(err.is_schema_error());
    assert_eq!(err.path().unwrap().to_string(), "primary");

    let err = Archive::defaults().err().unwrap();
    assert!(err.is_construction_error());
}

#[test]
fn test_each_list_element_has_own_class() {
    register_classes();
    let archive = Archive::create(json!({
        "primary": {"cls": "DiskStorage"},
        "mirrors": [
            {"cls": "S3Storage", "config": {"bucket": "one", "region": "us-east-1"}},
            {"cls": "DiskStorage", "config": {"path": "/mnt/mirror"}},
            {"cls": "S3Storage", "config": {"bucket": "two"}}
        ]
    }))
    .unwrap();

    let mirrors: Vec<_> = archive.mirrors.iter().map(|s| s.describe()).collect();
    assert_eq!(
        mirrors,
        vec!["s3:one@us-east-1", "disk:/mnt/mirror", "s3:two@eu-west-1"]
    );
    assert_eq!(archive.primary.describe(), "disk:/var/lib/app");
}

#[test]
fn test_list_element_errors_carry_index() {
    register_classes();
    let err = Archive::create(json!({
        "primary": {"cls": "DiskStorage"},
        "mirrors": [{"cls": "DiskStorage"}, {"cls": "S3Storage", "config": {}}]
    }))
    .err()
    .unwrap();

    assert!(err.is_schema_error());
    assert_eq!(err.path().unwrap().to_string(), "mirrors[1].config.bucket");
}

#[test]
fn test_standalone_factories() {
    register_classes();
    let config = Config::new(
        AttributeRegistry::new()
            .with(AttributeSpec::subclass::<dyn Hook>("hook", "Hook").default_class("LogHook"))
            .with(AttributeSpec::subclass_list::<dyn Hook>("chain", "Hook chain")),
    );
    let loaded = config
        .trans_and_val(
            &json!({"chain": [
                {"cls": "RetryHook"},
                {"cls": "LogHook", "config": {"level": "debug"}}
            ]}),
            None,
        )
        .unwrap();

    let hook = ConfigurableSubclassFactory::<dyn Hook>::new()
        .create(&loaded.subtree("hook").unwrap())
        .unwrap();
    assert_eq!(hook.label(), "log(info)");

    let chain = ListOfConfigurableSubclassFactory::<dyn Hook>::new()
        .create(&loaded.subtree("chain").unwrap())
        .unwrap();
    assert_eq!(hook_labels(&chain), vec!["retry(3)", "log(debug)"]);

    let retry = ConfigurableSubclassFactory::<dyn Hook>::new()
        .build("RetryHook")
        .unwrap();
    assert_eq!(retry.label(), "retry(3)");
}

#[test]
fn test_list_default_items_with_overrides() {
    register_classes();
    let mut debug = Map::new();
    debug.insert("level".into(), json!("debug"));
    let registry = AttributeRegistry::new().with(
        AttributeSpec::subclass_list::<dyn Hook>("hooks", "Hooks")
            .default_item("LogHook", debug)
            .default_item("RetryHook", Map::new()),
    );

    let document = Config::new(registry.clone()).document().unwrap().to_value();
    assert_eq!(
        document,
        json!({"hooks": [
            {"cls": "LogHook", "config": {"level": "debug"}},
            {"cls": "RetryHook", "config": {"attempts": 3}}
        ]})
    );

    let loaded = Config::new(registry).check_defaults().unwrap();
    assert_eq!(loaded.as_value(), &document);
}

#[test]
fn test_registry_lookup_and_transformer() {
    register_classes();
    let family = Family::of::<dyn Storage>();
    assert_eq!(family.name(), "dyn Storage");
    assert_eq!(classes::names(&family), vec!["DiskStorage", "S3Storage"]);

    let entry = lookup_by::<dyn Storage>("S3Storage").unwrap();
    assert_eq!(entry.name(), "S3Storage");
    assert_eq!(entry.attributes().names(), vec!["bucket", "region"]);

    let transformer = SubclassTransformer::of::<dyn Storage>();
    let ctx = TransformContext::default();
    assert_eq!(
        transformer.transform(json!("DiskStorage"), &ctx).unwrap(),
        json!("DiskStorage")
    );
    let err = transformer.transform(json!("Tape"), &ctx).unwrap_err();
    assert!(err.contains("DiskStorage, S3Storage"));
}
