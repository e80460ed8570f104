// WeatherBot API v0.1
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod render;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;
use services::chat::ChatStore;
use services::location::OpenAiLocationExtractor;
use services::pipeline::WeatherPipeline;
use services::weatherapi::WeatherApiClient;

/// WeatherBot OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "WeatherBot API",
        version = "0.1.0",
        description = "Conversational weather lookup. Extracts a location from a \
            free-text question with a language model, fetches current conditions \
            from WeatherAPI.com, and returns the key display fields alongside the \
            raw payload.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Query pipeline and direct lookups"),
        (name = "Sessions", description = "In-memory chat transcripts"),
    ),
    paths(
        routes::health::health_check,
        routes::query::post_query,
        routes::query::get_weather,
        routes::query::get_session_messages,
        routes::query::delete_session,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::query::QueryRequest,
            routes::query::QueryResponse,
            routes::query::WeatherLookupResponse,
            routes::query::SessionHistoryResponse,
            services::chat::ChatMessage,
            services::chat::Role,
            services::pipeline::LocationSource,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "weatherbot=debug,tower_http=debug"
    } else {
        "weatherbot=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn is_missing_env_file(err: &dotenvy::Error) -> bool {
    matches!(err, dotenvy::Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.debug);

    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if is_missing_env_file(&e) => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }
    if config.weather.api_key.is_none() {
        tracing::warn!("WEATHER_API_KEY is not set; weather lookups will fail");
    }
    if config.llm.api_key.is_none() {
        tracing::warn!(
            "OPENAI_API_KEY is not set; every query will use the default location '{}'",
            config.default_location
        );
    }

    // One connection pool shared by both upstream clients
    let http = reqwest::Client::new();

    let weather = Arc::new(WeatherApiClient::new(http.clone(), config.weather.clone()));
    let extractor = Arc::new(OpenAiLocationExtractor::new(http, config.llm.clone()));
    let llm_configured = extractor.is_enabled();

    let pipeline = WeatherPipeline::new(
        extractor,
        weather.clone(),
        config.default_location.clone(),
    );

    let app_state = AppState {
        pipeline,
        weather,
        chats: ChatStore::default(),
        weather_configured: config.weather.api_key.is_some(),
        llm_configured,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    let app = routes::router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("WeatherBot listening on {}", addr);
    tracing::info!(
        "Dashboard at http://localhost:{}/, Swagger UI at http://localhost:{}/swagger-ui/",
        config.port,
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
