//! Integration tests for the save / load / create workflow

mod common;

use classconfig::transformers::RelativePathTransformer;
use classconfig::{
    Arguments, AttributeRegistry, AttributeSpec, Config, ConfigurableFactory, Configurable,
    Creatable, Error, Result,
};
use common::{hook_labels, Application, Database, S3Storage, TestFixture};
use serde_json::json;

// =============================================================================
// Save
// =============================================================================

#[test]
fn test_saved_document_layout() {
    let fixture = TestFixture::new();
    let path = fixture.path("app.yaml");

    Config::of::<Application>().save(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();

    let expected = "\
name: demo  # Application name
workers: 2  # Worker processes, -1 for all cores
database:  # Primary database
  host: localhost  # Database host
  port: 5432  # Database port
storage:  # Where data is stored
  cls: DiskStorage  # Name of the class to use. Available: DiskStorage, S3Storage
  config:  # Configuration of the selected class
    path: /var/lib/app  # Directory holding the data
hooks:  # Hooks run on every request
  - cls: LogHook  # Name of the class to use. Available: LogHook, RetryHook
    config:  # Configuration of the selected class
      level: info  # Log level
  - cls: RetryHook  # Name of the class to use. Available: LogHook, RetryHook
    config:  # Configuration of the selected class
      attempts: 5  # Number of attempts
replica:  # Read replica, connected lazily
  host: replica.local  # Database host
  port: 5432  # Database port
  secret_param: built-in  # Shared secret
";
    assert_eq!(content, expected);
}

#[test]
fn test_save_is_idempotent() {
    let fixture = TestFixture::new();
    let path = fixture.path("nested/dir/app.yaml");
    let config = Config::of::<Application>();

    config.save(&path).unwrap();
    let first = std::fs::read(&path).unwrap();
    config.save(&path).unwrap();
    let second = std::fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(config.render().unwrap().as_bytes(), first.as_slice());
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_defaults_round_trip() {
    let fixture = TestFixture::new();
    let path = fixture.path("app.yaml");
    let config = Config::of::<Application>();

    config.save(&path).unwrap();
    let loaded = config.load(&path).unwrap();
    let created = ConfigurableFactory::<Application>::new()
        .create(&loaded, Arguments::new())
        .unwrap();
    let defaults = Application::defaults().unwrap();

    assert_eq!(created.name, defaults.name);
    assert_eq!(created.workers, defaults.workers);
    assert_eq!(created.database, defaults.database);
    assert_eq!(created.storage.describe(), defaults.storage.describe());
    assert_eq!(hook_labels(&created.hooks), hook_labels(&defaults.hooks));
    assert_eq!(
        created.replica.create().unwrap(),
        defaults.replica.create().unwrap()
    );

    assert_eq!(hook_labels(&created.hooks), vec!["log(info)", "retry(5)"]);
    assert_eq!(created.replica.create().unwrap().host, "replica.local");
}

#[test]
fn test_edited_document() {
    let fixture = TestFixture::new();
    let path = fixture.write(
        "app.yaml",
        "\
name: edited
database:
  port: 6543
storage:
  cls: S3Storage
  config:
    bucket: backups
hooks:
  - cls: RetryHook
    config:
      attempts: 2
replica:
  host: other.local
",
    );

    let app = Application::create(path.as_path()).unwrap();
    assert_eq!(app.name, "edited");
    assert_eq!(app.workers, 2);
    assert_eq!(app.database.port, 6543);
    assert_eq!(app.database.host, "localhost");
    assert_eq!(app.storage.describe(), "s3:backups@eu-west-1");
    assert_eq!(hook_labels(&app.hooks), vec!["retry(2)"]);

    let replica = app.replica.create().unwrap();
    assert_eq!(replica.host, "other.local");
    assert_eq!(replica.port, 5432);
}

#[test]
fn test_create_from_data() {
    common::register_classes();
    let app = Application::create(json!({
        "workers": 3,
        "hooks": [],
        "storage": {"cls": "DiskStorage", "config": {"path": "/data"}}
    }))
    .unwrap();

    assert_eq!(app.workers, 3);
    assert!(app.hooks.is_empty());
    assert_eq!(app.storage.describe(), "disk:/data");
}

#[test]
fn test_overrides_win_over_document() {
    common::register_classes();
    let config = Config::of::<Application>();
    let loaded = config
        .trans_and_val(&json!({"name": "from-file"}), None)
        .unwrap();

    let app = ConfigurableFactory::<Application>::new()
        .create(
            &loaded,
            Arguments::new()
                .set("name", "from-code")
                .set_object("hooks", Vec::<Box<dyn common::Hook>>::new()),
        )
        .unwrap();
    assert_eq!(app.name, "from-code");
    assert!(app.hooks.is_empty());
}

// =============================================================================
// Omit and Override
// =============================================================================

#[test]
fn test_omitted_attribute_never_read_from_document() {
    let fixture = TestFixture::new();
    let config = Config::of::<Application>();
    let document = config.document().unwrap().to_value();
    assert!(document["database"].get("secret_param").is_none());
    assert_eq!(document["replica"]["secret_param"], json!("built-in"));

    let path = fixture.write("app.yaml", "database:\n  secret_param: leaked\n");
    let err = config.load(&path).unwrap_err();
    assert!(err.is_schema_error());
    assert_eq!(err.path().unwrap().to_string(), "database.secret_param");

    let app = Application::defaults().unwrap();
    assert_eq!(app.database.secret_param, "built-in");
}

#[test]
fn test_override_does_not_touch_class() {
    let registry = Database::attributes();
    assert_eq!(
        registry.get("host").unwrap().default_value(),
        Some(&json!("localhost"))
    );
    assert_eq!(Database::defaults().unwrap().host, "localhost");
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_error_paths() {
    let fixture = TestFixture::new();
    let config = Config::of::<Application>();

    let path = fixture.write("bad_port.yaml", "database:\n  port: 0\n");
    let err = config.load(&path).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(err.path().unwrap().to_string(), "database.port");

    let path = fixture.write(
        "bad_hook.yaml",
        "hooks:\n  - cls: RetryHook\n    config:\n      attempts: 50\n",
    );
    let err = config.load(&path).unwrap_err();
    assert_eq!(err.path().unwrap().to_string(), "hooks[0].config.attempts");
    assert!(err.to_string().contains("hooks[0].config.attempts"));

    let path = fixture.write("unknown.yaml", "colour: blue\n");
    let err = config.load(&path).unwrap_err();
    assert!(err.is_schema_error());
    assert!(err.to_string().contains("colour"));

    let path = fixture.write("bad_cls.yaml", "storage:\n  cls: FtpStorage\n");
    let err = config.load(&path).unwrap_err();
    assert!(err.is_resolution_error());
    assert!(err.to_string().contains("FtpStorage"));

    let path = fixture.write("bad_workers.yaml", "workers: many\n");
    let err = config.load(&path).unwrap_err();
    assert!(matches!(err, Error::Transform { .. }));

    let path = fixture.write("broken.yaml", "database: [1, 2\n");
    let err = config.load(&path).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn test_required_attribute_enforcement() {
    let err = S3Storage::defaults().unwrap_err();
    assert!(err.is_construction_error());
    assert!(err.to_string().contains("bucket"));

    let storage = S3Storage::from_arguments(Arguments::new().set("bucket", "b")).unwrap();
    assert_eq!(storage.bucket, "b");

    let err = S3Storage::from_arguments(Arguments::new().set("bucket", "b").set("acl", "public"))
        .unwrap_err();
    assert!(err.is_construction_error());
}

#[test]
fn test_blank_file_uses_defaults() {
    let fixture = TestFixture::new();
    let path = fixture.write("empty.yaml", "# nothing configured yet\n");

    let loaded = Config::of::<Application>().load(&path).unwrap();
    assert_eq!(loaded.get("name"), Some(&json!("demo")));
    assert_eq!(loaded.get("hooks[1].config.attempts"), Some(&json!(5)));
}

// =============================================================================
// Relative Paths
// =============================================================================

struct Workspace {
    root: String,
    cache: String,
}

impl Configurable for Workspace {
    fn attributes() -> AttributeRegistry {
        AttributeRegistry::new()
            .with(
                AttributeSpec::value("root", "Workspace root")
                    .default("work")
                    .transform(RelativePathTransformer::new()),
            )
            .with(
                AttributeSpec::value("cache", "Cache directory")
                    .default("/tmp/cache")
                    .transform(RelativePathTransformer::new()),
            )
    }

    fn construct(args: &mut Arguments) -> Result<Self> {
        Ok(Self {
            root: args.value("root")?,
            cache: args.value("cache")?,
        })
    }
}

#[test]
fn test_relative_paths_resolve_against_file() {
    let fixture = TestFixture::new();
    let path = fixture.path("conf/workspace.yaml");
    Config::of::<Workspace>().save(&path).unwrap();

    let workspace = Workspace::create(path.clone()).unwrap();
    let expected = fixture.path("conf").join("work");
    assert_eq!(workspace.root, expected.to_string_lossy());
    assert_eq!(workspace.cache, "/tmp/cache");
}
