pub mod health;
pub mod create;
pub mod update;
pub mod delete;
pub mod get;
pub mod list;
pub mod dispatch;

pub use health::health_handler;
pub use create::create_handler;
pub use update::update_handler;
pub use delete::delete_handler;
pub use get::get_handler;
pub use list::list_handler;
pub use dispatch::dispatch_handler;

use crate::error::ApiError;
use uuid::Uuid;

/// Validate a path id before it reaches the store
pub(crate) fn parse_id(id_str: &str) -> Result<String, ApiError> {
    Uuid::parse_str(id_str)
        .map(|id| id.to_string())
        .map_err(|_| ApiError::InvalidId(id_str.to_string()))
}
