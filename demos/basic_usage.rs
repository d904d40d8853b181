// Basic usage example for classconfig
//
// Run with: cargo run --example basic_usage

use classconfig::transformers::CpuWorkersTransformer;
use classconfig::validators::{AllValidator, IntegerValidator, MinValueIntegerValidator};
use classconfig::{register_subclasses, Config, ConfigurableFactory, Creatable, DeriveConfigurable};
use serde_json::json;

// A family of interchangeable classes
trait Notifier {
    fn notify(&self, message: &str) -> String;
}

#[derive(DeriveConfigurable)]
struct EmailNotifier {
    #[config(desc = "Recipient address", default = "ops@example.com")]
    recipient: String,
}

impl Notifier for EmailNotifier {
    fn notify(&self, message: &str) -> String {
        format!("mail to {}: {message}", self.recipient)
    }
}

#[derive(DeriveConfigurable)]
struct WebhookNotifier {
    #[config(desc = "Endpoint receiving the POST request")]
    url: String,
    #[config(desc = "Retries before giving up", default = 3)]
    retries: u32,
}

impl Notifier for WebhookNotifier {
    fn notify(&self, message: &str) -> String {
        format!("POST {} ({} retries): {message}", self.url, self.retries)
    }
}

#[derive(Debug, DeriveConfigurable)]
struct Database {
    #[config(desc = "Database host", default = "localhost")]
    host: String,
    #[config(
        desc = "Database port",
        default = 5432,
        validator = AllValidator::new().with(IntegerValidator).with(MinValueIntegerValidator(1))
    )]
    port: u16,
    #[config(desc = "Connection password", default = "")]
    password: String,
}

#[derive(DeriveConfigurable)]
struct Service {
    #[config(desc = "Service name", default = "inventory")]
    name: String,
    #[config(
        desc = "Worker processes, -1 for all cores",
        default = -1,
        transform = CpuWorkersTransformer::new(),
        validator = MinValueIntegerValidator(1)
    )]
    workers: i64,
    #[config(desc = "Primary database", factory, omit(password))]
    database: Database,
    #[config(desc = "Alert channels", subclass_list)]
    notifiers: Vec<Box<dyn Notifier>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    register_subclasses!(dyn Notifier => EmailNotifier, WebhookNotifier);

    println!("📦 classconfig Basic Usage Example\n");

    // Generate the commented default document
    let config = Config::of::<Service>();
    let path = std::env::temp_dir().join("classconfig-demo").join("service.yaml");
    config.save(&path)?;
    println!("✅ Default configuration written to {}:", path.display());
    println!("{}", std::fs::read_to_string(&path)?);

    // Load it back and build the service
    let loaded = config.load(&path)?;
    let service = ConfigurableFactory::<Service>::new().create(&loaded, Default::default())?;
    println!(
        "🔧 {} runs {} workers against {:?}",
        service.name, service.workers, service.database
    );

    // Select classes by name
    let service = Service::create(json!({
        "notifiers": [
            {"cls": "EmailNotifier"},
            {"cls": "WebhookNotifier", "config": {"url": "https://hooks.example.com/alert"}}
        ]
    }))?;
    for notifier in &service.notifiers {
        println!("📣 {}", notifier.notify("disk almost full"));
    }

    // Invalid values report where they are
    let err = Service::create(json!({"database": {"port": 0}})).err();
    if let Some(err) = err {
        println!("\n❌ {err}");
    }

    Ok(())
}
