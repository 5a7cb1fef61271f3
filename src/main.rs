use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use workmatch::config::{Settings, StorageBackend};
use workmatch::core::{SentimentClassifier, TrustScoreEngine};
use workmatch::routes::{self, AppState};
use workmatch::services::{MemoryStore, PgStore};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    info!("Query payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Recompute every trust record on a fixed interval
fn spawn_trust_refresh(trust: Arc<TrustScoreEngine>, interval_secs: u64) {
    if interval_secs == 0 {
        info!("Periodic trust refresh disabled");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        // The first tick completes immediately; skip it so start-up stays quiet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = trust.recompute_all().await {
                warn!("Periodic trust refresh could not list providers: {}", e);
            }
        }
    });

    info!("Periodic trust refresh every {}s", interval_secs);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone()));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    info!("Starting workmatch service...");

    let recommendation = settings.recommendation_config();
    let limits = settings.search_limits();
    let classifier = SentimentClassifier::with_extra_keywords(
        &settings.sentiment.extra_positive,
        &settings.sentiment.extra_negative,
    );
    let default_response_rate = settings.trust.default_response_rate;

    info!("Recommendation weights: {:?}", recommendation.weights);

    let app_state = match settings.storage.backend {
        StorageBackend::Postgres => {
            let store = Arc::new(
                PgStore::from_settings(
                    &settings.database.url,
                    settings.database.max_connections,
                    settings.database.min_connections,
                    settings.database.acquire_timeout_secs,
                    settings.database.idle_timeout_secs,
                )
                .await
                .unwrap_or_else(|e| {
                    error!("Failed to connect to PostgreSQL: {}", e);
                    panic!("PostgreSQL connection error: {}", e);
                }),
            );

            info!("PostgreSQL store initialized");

            AppState::from_store(store, recommendation, classifier, default_response_rate, limits)
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            AppState::from_store(
                Arc::new(MemoryStore::new()),
                recommendation,
                classifier,
                default_response_rate,
                limits,
            )
        }
    };

    spawn_trust_refresh(app_state.trust.clone(), settings.trust.refresh_interval_secs);

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
