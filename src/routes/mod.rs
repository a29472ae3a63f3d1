pub mod convert;
pub mod health;

use axum::Router;

use crate::services::ConversionService;

pub use convert::ConvertState;

pub fn create_router(service: ConversionService, max_file_size_mb: u64) -> Router {
    Router::new()
        .merge(health::router())
        .merge(convert::router(ConvertState {
            service,
            max_file_size_mb,
        }))
}
