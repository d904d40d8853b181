//! Common test utilities for classconfig integration tests
//!
//! Provides shared configurable classes, subclass families, and fixtures.

#![allow(dead_code)]

use classconfig::transformers::CpuWorkersTransformer;
use classconfig::validators::{
    AllValidator, IntegerValidator, MinValueIntegerValidator, StringValidator,
    ValueInIntervalIntegerValidator,
};
use classconfig::{
    register_subclasses, Arguments, AttributeRegistry, AttributeSpec, Configurable, Deferred,
    Omit, Result,
};
use serde_json::{json, Map};
use std::path::PathBuf;
use tempfile::TempDir;

/// Install a test logger once; later calls are no-ops
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Storage Family
// =============================================================================

pub trait Storage {
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskStorage {
    pub path: String,
}

impl Storage for DiskStorage {
    fn describe(&self) -> String {
        format!("disk:{}", self.path)
    }
}

impl Configurable for DiskStorage {
    fn attributes() -> AttributeRegistry {
        AttributeRegistry::new().with(
            AttributeSpec::value("path", "Directory holding the data")
                .default("/var/lib/app")
                .validator(StringValidator),
        )
    }

    fn construct(args: &mut Arguments) -> Result<Self> {
        Ok(Self {
            path: args.value("path")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3Storage {
    pub bucket: String,
    pub region: String,
}

impl Storage for S3Storage {
    fn describe(&self) -> String {
        format!("s3:{}@{}", self.bucket, self.region)
    }
}

impl Configurable for S3Storage {
    fn attributes() -> AttributeRegistry {
        AttributeRegistry::new()
            .with(AttributeSpec::value("bucket", "Bucket name").validator(StringValidator))
            .with(AttributeSpec::value("region", "Bucket region").default("eu-west-1"))
    }

    fn construct(args: &mut Arguments) -> Result<Self> {
        Ok(Self {
            bucket: args.value("bucket")?,
            region: args.value("region")?,
        })
    }
}

// =============================================================================
// Hook Family
// =============================================================================

pub trait Hook {
    fn label(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogHook {
    pub level: String,
}

impl Hook for LogHook {
    fn label(&self) -> String {
        format!("log({})", self.level)
    }
}

impl Configurable for LogHook {
    fn attributes() -> AttributeRegistry {
        AttributeRegistry::new().with(AttributeSpec::value("level", "Log level").default("info"))
    }

    fn construct(args: &mut Arguments) -> Result<Self> {
        Ok(Self {
            level: args.value("level")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryHook {
    pub attempts: u32,
}

impl Hook for RetryHook {
    fn label(&self) -> String {
        format!("retry({})", self.attempts)
    }
}

impl Configurable for RetryHook {
    fn attributes() -> AttributeRegistry {
        AttributeRegistry::new().with(
            AttributeSpec::value("attempts", "Number of attempts")
                .default(3)
                .validator(ValueInIntervalIntegerValidator::new(1, 10)),
        )
    }

    fn construct(args: &mut Arguments) -> Result<Self> {
        Ok(Self {
            attempts: args.value("attempts")?,
        })
    }
}

/// Register every family member used by the tests
pub fn register_classes() {
    register_subclasses!(dyn Storage => DiskStorage, S3Storage);
    register_subclasses!(dyn Hook => LogHook, RetryHook);
}

// =============================================================================
// Nested Classes
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    pub host: String,
    pub port: u16,
    pub secret_param: String,
}

impl Configurable for Database {
    fn attributes() -> AttributeRegistry {
        AttributeRegistry::new()
            .with(AttributeSpec::value("host", "Database host").default("localhost"))
            .with(
                AttributeSpec::value("port", "Database port")
                    .default(5432)
                    .validator(
                        AllValidator::new()
                            .with(IntegerValidator)
                            .with(MinValueIntegerValidator(1)),
                    ),
            )
            .with(AttributeSpec::value("secret_param", "Shared secret").default("built-in"))
    }

    fn construct(args: &mut Arguments) -> Result<Self> {
        Ok(Self {
            host: args.value("host")?,
            port: args.value("port")?,
            secret_param: args.value("secret_param")?,
        })
    }
}

/// Root class exercising every attribute kind
pub struct Application {
    pub name: String,
    pub workers: i64,
    pub database: Database,
    pub storage: Box<dyn Storage>,
    pub hooks: Vec<Box<dyn Hook>>,
    pub replica: Deferred<Database>,
}

impl Configurable for Application {
    fn attributes() -> AttributeRegistry {
        let mut retry = Map::new();
        retry.insert("attempts".into(), json!(5));

        AttributeRegistry::new()
            .with(AttributeSpec::value("name", "Application name").default("demo"))
            .with(
                AttributeSpec::value("workers", "Worker processes, -1 for all cores")
                    .default(2)
                    .transform(CpuWorkersTransformer::new())
                    .validator(MinValueIntegerValidator(1)),
            )
            .with(
                AttributeSpec::factory::<Database>("database", "Primary database")
                    .omit(Omit::new().attribute("secret_param")),
            )
            .with(
                AttributeSpec::subclass::<dyn Storage>("storage", "Where data is stored")
                    .default_class("DiskStorage"),
            )
            .with(
                AttributeSpec::subclass_list::<dyn Hook>("hooks", "Hooks run on every request")
                    .default_item("LogHook", Map::new())
                    .default_item("RetryHook", retry),
            )
            .with(
                AttributeSpec::factory::<Database>("replica", "Read replica, connected lazily")
                    .override_default("host", "replica.local")
                    .delay_init(),
            )
    }

    fn construct(args: &mut Arguments) -> Result<Self> {
        Ok(Self {
            name: args.value("name")?,
            workers: args.value("workers")?,
            database: args.object("database")?,
            storage: args.subclass("storage")?,
            hooks: args.subclasses("hooks")?,
            replica: args.deferred("replica")?,
        })
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Temporary directory for configuration files
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        init_logging();
        register_classes();
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Path of a file inside the fixture directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write raw YAML and return its path
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).expect("Failed to write config file");
        path
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Labels of a hook list, for compact assertions
pub fn hook_labels(hooks: &[Box<dyn Hook>]) -> Vec<String> {
    hooks.iter().map(|h| h.label()).collect()
}
