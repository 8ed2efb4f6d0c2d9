// # akc - App Configuration key/value CLI
//
// This binary is a THIN integration layer over akc-core:
// - No resource logic here; create/read/update/delete/import live in the reconciler
// - Store configuration comes from environment variables only
// - One operation per invocation, state printed to stdout as JSON
//
// ## Usage
//
// ```bash
// akc create <endpoint> <key> <value> [label]
// akc read <id>
// akc update <id> <value>
// akc delete <id>
// akc import <id>
// ```
//
// ## Configuration
//
// - `AKC_STORE_TYPE`: Store backend (app_configuration, memory). Default: app_configuration
// - `AKC_ACCESS_TOKEN`: Bearer token (required for app_configuration)
// - `AKC_API_VERSION`: REST api-version (optional)
// - `AKC_TIMEOUT_SECS`: Upper bound for one operation, 0 disables. Default: 300
// - `AKC_LOG_LEVEL`: trace, debug, info, warn, error. Default: warn
//
// Logs go to stderr so stdout stays machine-readable.
//
// ## Example
//
// ```bash
// export AKC_ACCESS_TOKEN=...
// akc create https://cfg.example.com app/name demo
// # {"endpoint":"https://cfg.example.com","id":"cfg.example.com/(no label)/app/name",...}
// ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use akc_core::{
    AkcConfig, KeyValueReconciler, KeyValueSpec, KeyValueState, ReconcilerConfig, ResourceId,
    StoreConfig, StoreRegistry,
};
use anyhow::{Context, Result};
use tracing::{Level, debug, error};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the CLI
///
/// - 0: Operation succeeded
/// - 1: Configuration or usage error
/// - 2: Runtime error (store call failed)
#[derive(Debug, Clone, Copy)]
enum AkcExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<AkcExitCode> for ExitCode {
    fn from(code: AkcExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Environment configuration
struct Config {
    store_type: String,
    access_token: Option<String>,
    api_version: Option<String>,
    timeout_secs: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let timeout_secs = match env::var("AKC_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("AKC_TIMEOUT_SECS must be a whole number. Got: {}", raw))?,
            Err(_) => ReconcilerConfig::default().operation_timeout_secs,
        };

        Ok(Self {
            store_type: env::var("AKC_STORE_TYPE")
                .unwrap_or_else(|_| "app_configuration".to_string()),
            access_token: env::var("AKC_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
            api_version: env::var("AKC_API_VERSION").ok().filter(|v| !v.is_empty()),
            timeout_secs,
            log_level: env::var("AKC_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        })
    }

    /// Build and validate the library configuration
    fn to_akc_config(&self) -> Result<AkcConfig> {
        let store = match self.store_type.as_str() {
            "app_configuration" => StoreConfig::AppConfiguration {
                access_token: self.access_token.clone().with_context(|| {
                    "AKC_ACCESS_TOKEN is required when AKC_STORE_TYPE=app_configuration. \
                    Set it via: export AKC_ACCESS_TOKEN=your_token"
                })?,
                api_version: self.api_version.clone(),
            },
            "memory" => StoreConfig::Memory,
            other => anyhow::bail!(
                "AKC_STORE_TYPE '{}' is not supported. \
                Supported types: app_configuration, memory",
                other
            ),
        };

        let config = AkcConfig {
            store,
            reconciler: ReconcilerConfig {
                operation_timeout_secs: self.timeout_secs,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Result<Level> {
        Ok(match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "AKC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        })
    }
}

/// One resource operation requested on the command line
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Create(KeyValueSpec),
    Read(ResourceId),
    Update(ResourceId, String),
    Delete(ResourceId),
    Import(String),
}

impl Command {
    const USAGE: &'static str = "usage: akc create <endpoint> <key> <value> [label]\n       \
        akc read <id>\n       akc update <id> <value>\n       akc delete <id>\n       \
        akc import <id>";

    /// Parse the arguments following the program name
    fn parse(args: &[String]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let command = match args.as_slice() {
            ["create", endpoint, key, value] => {
                Command::Create(KeyValueSpec::new(*endpoint, *key, *value))
            }
            ["create", endpoint, key, value, label] => {
                Command::Create(KeyValueSpec::new(*endpoint, *key, *value).with_label(*label))
            }
            ["read", id] => Command::Read(ResourceId::parse(id)?),
            ["update", id, value] => Command::Update(ResourceId::parse(id)?, value.to_string()),
            ["delete", id] => Command::Delete(ResourceId::parse(id)?),
            ["import", id] => Command::Import(id.to_string()),
            _ => anyhow::bail!("{}", Self::USAGE),
        };

        Ok(command)
    }
}

/// JSON printed when there is no state to report
fn absent_state() -> serde_json::Value {
    serde_json::json!({ "id": null })
}

async fn run(command: Command, reconciler: &KeyValueReconciler) -> Result<serde_json::Value> {
    debug!("Running {:?}", command);

    let state: Option<KeyValueState> = match command {
        Command::Create(spec) => Some(reconciler.create(&spec).await?),
        Command::Read(id) => reconciler.read(&id).await?,
        Command::Update(id, value) => Some(reconciler.update(&id, &value).await?),
        Command::Delete(id) => {
            reconciler.delete(&id).await?;
            None
        }
        Command::Import(id) => Some(reconciler.import(&id).await?),
    };

    Ok(state.map_or_else(absent_state, |state| state.to_value()))
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return AkcExitCode::ConfigError.into();
        }
    };

    let log_level = match config.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return AkcExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AkcExitCode::ConfigError.into();
    }

    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return AkcExitCode::ConfigError.into();
        }
    };

    let akc_config = match config.to_akc_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return AkcExitCode::ConfigError.into();
        }
    };

    let registry = StoreRegistry::with_builtin();
    #[cfg(feature = "appconfig")]
    akc_store_appconfig::register(&registry);

    let factory = match registry.create_factory(&akc_config.store) {
        Ok(factory) => factory,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return AkcExitCode::ConfigError.into();
        }
    };

    let reconciler = KeyValueReconciler::new(Arc::clone(&factory), akc_config.reconciler);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AkcExitCode::RuntimeError.into();
        }
    };

    match rt.block_on(run(command, &reconciler)) {
        Ok(output) => {
            println!("{}", output);
            AkcExitCode::Success.into()
        }
        Err(e) => {
            error!("Operation failed: {}", e);
            eprintln!("Error: {}", e);
            AkcExitCode::RuntimeError.into()
        }
    }
}
