use std::env;
use std::path::PathBuf;
use anyhow::{bail, Context, Result};

/// Connection settings for the Spanner-backed store
#[derive(Debug, Clone, PartialEq)]
pub struct SpannerSettings {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerSettings {
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Spanner(SpannerSettings),
    Memory,
}

/// How new definitions become live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStrategy {
    /// Write the sentinel file and let the process host relaunch us
    Restart,
    /// Recompile in process and publish the new table atomically
    Swap,
}

impl ReloadStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadStrategy::Restart => "restart",
            ReloadStrategy::Swap => "swap",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub service_port: u16,
    pub service_host: String,
    pub reload_strategy: ReloadStrategy,
    pub reload_sentinel_path: PathBuf,
    pub reload_on_delete: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "spanner".to_string())
            .to_lowercase()
            .as_str()
        {
            "spanner" => StoreBackend::Spanner(spanner_from_env()?),
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be 'spanner' or 'memory', got '{}'", other),
        };

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let reload_strategy = match env::var("RELOAD_STRATEGY")
            .unwrap_or_else(|_| "restart".to_string())
            .to_lowercase()
            .as_str()
        {
            "restart" => ReloadStrategy::Restart,
            "swap" => ReloadStrategy::Swap,
            other => bail!("RELOAD_STRATEGY must be 'restart' or 'swap', got '{}'", other),
        };

        let reload_sentinel_path = PathBuf::from(
            env::var("RELOAD_SENTINEL_PATH").unwrap_or_else(|_| "restart.txt".to_string()),
        );

        let reload_on_delete = env::var("RELOAD_ON_DELETE")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .context("RELOAD_ON_DELETE must be 'true' or 'false'")?;

        Ok(Config {
            store,
            service_port,
            service_host,
            reload_strategy,
            reload_sentinel_path,
            reload_on_delete,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        match &self.store {
            StoreBackend::Spanner(spanner) => {
                tracing::info!("  Store backend: spanner");
                tracing::info!("  Spanner emulator: {}",
                    spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
                tracing::info!("  Spanner database: {}", spanner.database_path());
            }
            StoreBackend::Memory => {
                tracing::info!("  Store backend: memory (definitions are lost on restart)");
            }
        }
        tracing::info!("  Reload strategy: {}", self.reload_strategy.as_str());
        tracing::info!("  Reload sentinel: {}", self.reload_sentinel_path.display());
        tracing::info!("  Reload on delete: {}", self.reload_on_delete);
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

fn spanner_from_env() -> Result<SpannerSettings> {
    let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

    let project = env::var("SPANNER_PROJECT")
        .context("SPANNER_PROJECT environment variable is required")?;

    let instance = env::var("SPANNER_INSTANCE")
        .context("SPANNER_INSTANCE environment variable is required")?;

    let database = env::var("SPANNER_DATABASE")
        .context("SPANNER_DATABASE environment variable is required")?;

    Ok(SpannerSettings {
        emulator_host,
        project,
        instance,
        database,
    })
}

// Tests across modules mutate process-wide environment variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
