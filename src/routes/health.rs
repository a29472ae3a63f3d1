use axum::{routing::get, Json, Router};

use crate::models::WelcomeResponse;

pub fn router() -> Router {
    Router::new().route("/", get(read_root))
}

/// Messaggio di benvenuto / liveness
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "API funzionante", body = WelcomeResponse),
    ),
    tag = "Sistema"
)]
pub async fn read_root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse::default())
}
