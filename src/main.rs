use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pdf2word::config::Config;
use pdf2word::middleware::build_cors_layer;
use pdf2word::models::{ErrorResponse, WelcomeResponse};
use pdf2word::routes;
use pdf2word::routes::convert::ConvertUpload;
use pdf2word::services::{reaper, CommandConverter, ConversionService, ScratchDir};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PDF to Word Converter API",
        version = "1.0.0",
        description = "API per la conversione di documenti PDF in Word (DOCX)",
        license(name = "MIT"),
    ),
    paths(
        crate::routes::health::read_root,
        crate::routes::convert::convert_pdf_to_word,
    ),
    components(schemas(WelcomeResponse, ErrorResponse, ConvertUpload)),
    tags(
        (name = "Conversione", description = "Conversione PDF → DOCX"),
        (name = "Sistema", description = "Health check"),
    ),
    servers(
        (url = "http://localhost:8000", description = "Server locale"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Carica variabili da .env
    dotenvy::dotenv().ok();

    // Inizializza logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf2word=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Carica configurazione
    let config = Config::from_env();

    // Crea scratch directory
    let scratch = ScratchDir::new(&config.scratch_dir);
    if let Err(e) = scratch.ensure() {
        tracing::error!(
            "Impossibile creare la scratch directory {}: {}",
            scratch.path().display(),
            e
        );
        std::process::exit(1);
    }

    // Verifica motore di conversione
    let converter = CommandConverter::from_config(&config);
    if converter.is_available() {
        tracing::info!("Motore di conversione disponibile: {}", converter.program());
    } else {
        tracing::warn!(
            "Motore di conversione '{}' non trovato - le conversioni falliranno",
            converter.program()
        );
    }

    let service = ConversionService::new(Arc::new(converter), scratch.clone())
        .with_retention(config.output_retention);

    // Task background per pulizia artefatti scaduti
    let reaper_handle = config.artifact_max_age().map(|max_age| {
        reaper::spawn_reaper(scratch.clone(), config.reap_interval(), max_age)
    });

    let cors = build_cors_layer(&config.allowed_origins);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::create_router(service, config.max_file_size_mb))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Avvia server
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Indirizzo non valido {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    tracing::info!("========================================");
    tracing::info!("  PDF to Word Converter API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("========================================");
    tracing::info!("Server: http://{}", addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", addr);
    tracing::info!("Scratch directory: {}", scratch.path().display());
    tracing::info!("Origini CORS: {}", config.allowed_origins.join(", "));
    tracing::info!("----------------------------------------");
    tracing::info!("  GET  /         - Benvenuto");
    tracing::info!("  POST /convert  - Converti PDF in DOCX");
    tracing::info!("----------------------------------------");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Impossibile avviare il server su {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Errore server: {}", e);
    }

    if let Some(handle) = reaper_handle {
        handle.abort();
    }

    // Rimuove tutti gli artefatti, anche quelli dei job riusciti
    match scratch.purge_all() {
        Ok(()) => tracing::info!("Scratch directory rimossa: {}", scratch.path().display()),
        Err(e) => tracing::warn!(
            "Errore rimozione scratch directory {}: {}",
            scratch.path().display(),
            e
        ),
    }
}

/// Attende SIGINT (Ctrl-C) o SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Impossibile installare l'handler CTRL+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => tracing::warn!("Impossibile installare l'handler SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Segnale di arresto ricevuto, chiusura in corso...");
}
