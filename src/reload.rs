//! Decides when a new route table snapshot is needed.
//!
//! A process serves from the table compiled at boot. With the `restart`
//! strategy a definition change only writes the sentinel file; the external
//! process host is expected to relaunch us, and the fresh process compiles
//! a new table. With the `swap` strategy the table is recompiled in process
//! and published behind a single atomic pointer.
//!
//! Only creates and updates signal a reload unless `reload_on_delete` is set.

use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

use crate::config::{Config, ReloadStrategy};
use crate::route_table::{self, RouteTable};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Initializing,
    Serving,
    RestartRequested,
}

impl ReloadState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadState::Initializing => "initializing",
            ReloadState::Serving => "serving",
            ReloadState::RestartRequested => "restart_requested",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReloadState::Initializing,
            1 => ReloadState::Serving,
            _ => ReloadState::RestartRequested,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ReloadState::Initializing => 0,
            ReloadState::Serving => 1,
            ReloadState::RestartRequested => 2,
        }
    }
}

/// Which store mutation just succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// What the controller did about a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// This kind of change does not trigger a reload
    Skipped,
    /// Sentinel written; the host will relaunch the process
    RestartRequested,
    /// A new table is live
    Swapped { routes: usize },
}

impl ReloadOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadOutcome::Skipped => "skipped",
            ReloadOutcome::RestartRequested => "restart_requested",
            ReloadOutcome::Swapped { .. } => "swapped",
        }
    }
}

/// The reload signal could not be delivered. The triggering mutation has
/// already been committed and stays committed.
#[derive(Debug, Error)]
pub enum ReloadSignalError {
    #[error("failed to write restart sentinel {}: {source}", path.display())]
    Sentinel {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rebuild route table: {0}")]
    Snapshot(#[source] StoreError),
}

#[derive(Debug, Clone)]
pub struct ReloadSettings {
    pub strategy: ReloadStrategy,
    pub sentinel_path: PathBuf,
    pub reload_on_delete: bool,
}

impl From<&Config> for ReloadSettings {
    fn from(config: &Config) -> Self {
        Self {
            strategy: config.reload_strategy,
            sentinel_path: config.reload_sentinel_path.clone(),
            reload_on_delete: config.reload_on_delete,
        }
    }
}

pub struct ReloadController {
    store: Store,
    settings: ReloadSettings,
    table: ArcSwap<RouteTable>,
    state: AtomicU8,
    // Serializes in-process rebuilds so an older snapshot never lands last
    rebuild: tokio::sync::Mutex<()>,
}

impl ReloadController {
    /// Two-phase boot: load a snapshot from the store, then compile it.
    ///
    /// A store failure here is fatal; the process cannot serve without a
    /// table.
    pub async fn boot(store: Store, settings: ReloadSettings) -> Result<Self, StoreError> {
        let controller = Self {
            store,
            settings,
            table: ArcSwap::from_pointee(RouteTable::default()),
            state: AtomicU8::new(ReloadState::Initializing.to_u8()),
            rebuild: tokio::sync::Mutex::new(()),
        };

        let definitions = controller.store.list().await?;
        let table = route_table::compile(&definitions);
        tracing::info!(
            "Route table built from {} definitions ({} routes live)",
            definitions.len(),
            table.len()
        );
        if table.is_empty() {
            tracing::info!("No endpoint definitions yet; every mock request will answer 404");
        }
        controller.table.store(Arc::new(table));
        controller.set_state(ReloadState::Serving);

        Ok(controller)
    }

    /// Snapshot of the live table for one request
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    pub fn state(&self) -> ReloadState {
        ReloadState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ReloadState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    /// React to a committed store mutation
    pub async fn definition_changed(&self, change: ChangeKind) -> Result<ReloadOutcome, ReloadSignalError> {
        if change == ChangeKind::Deleted && !self.settings.reload_on_delete {
            tracing::debug!("Delete does not trigger a reload; the route stays live until the next restart");
            return Ok(ReloadOutcome::Skipped);
        }

        let result = match self.settings.strategy {
            ReloadStrategy::Restart => self.request_restart().await,
            ReloadStrategy::Swap => self.rebuild().await,
        };

        if let Err(e) = &result {
            tracing::warn!("Reload after {:?} failed, serving the previous route table: {}", change, e);
        }
        result
    }

    async fn request_restart(&self) -> Result<ReloadOutcome, ReloadSignalError> {
        write_sentinel(&self.settings.sentinel_path).await?;
        self.set_state(ReloadState::RestartRequested);
        tracing::info!(
            "Restart requested via sentinel {}",
            self.settings.sentinel_path.display()
        );
        Ok(ReloadOutcome::RestartRequested)
    }

    async fn rebuild(&self) -> Result<ReloadOutcome, ReloadSignalError> {
        let _guard = self.rebuild.lock().await;

        let definitions = self.store.list().await.map_err(ReloadSignalError::Snapshot)?;
        let table = route_table::compile(&definitions);
        let routes = table.len();
        self.table.store(Arc::new(table));

        tracing::info!("Route table swapped ({} routes live)", routes);
        Ok(ReloadOutcome::Swapped { routes })
    }
}

/// Write the current time to the sentinel file the process host watches
pub async fn write_sentinel(path: &Path) -> Result<(), ReloadSignalError> {
    let stamp = chrono::Utc::now().to_rfc3339();
    tokio::fs::write(path, stamp)
        .await
        .map_err(|source| ReloadSignalError::Sentinel {
            path: path.to_path_buf(),
            source,
        })
}
