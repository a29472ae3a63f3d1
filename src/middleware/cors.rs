use axum::http::{header, HeaderValue};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// CORS ristretto alle origini configurate, con credenziali.
///
/// Con `allow_credentials` i wildcard non sono ammessi: metodi e header
/// richiesti vengono rispecchiati. `Content-Disposition` e' esposto per
/// permettere al browser di leggere il nome del file scaricato.
pub fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Origine CORS non valida ignorata: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([header::CONTENT_DISPOSITION, header::CONTENT_TYPE])
}
