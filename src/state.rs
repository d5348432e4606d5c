use crate::config::Config;
use crate::reload::ReloadController;
use crate::store::Store;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub reload: Arc<ReloadController>,
    pub config: Arc<Config>,
}
