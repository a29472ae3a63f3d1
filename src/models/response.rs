use serde::Serialize;
use utoipa::ToSchema;

pub const WELCOME_MESSAGE: &str = "Welcome to PDF to Word Converter API";

#[derive(Debug, Serialize, ToSchema)]
pub struct WelcomeResponse {
    /// Messaggio di benvenuto
    pub message: String,
}

impl Default for WelcomeResponse {
    fn default() -> Self {
        Self {
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Descrizione dell'errore
    pub detail: String,
    pub status: u16,
}
