//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        LocalRepository, OpenAiContentAdapter, OpenAiImageAdapter, OpenAiLiveAdapter,
        OpenAiTtsAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        live_handler,
        middleware::require_auth,
        rest::{
            create_lesson_handler, generate_lesson_handler, get_lesson_handler, grammar_handler,
            image_handler, interview_handler, list_lessons_handler, login_handler, logout_handler,
            me_handler, record_activity_handler, reset_handler, scenario_handler,
            snapshot_handler, speech_handler, subscription_handler, vocabulary_handler, ApiDoc,
        },
        state::AppState,
    },
};
use async_openai::{
    config::OpenAIConfig,
    types::audio::{SpeechModel, Voice},
    Client,
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Local Store ---
    info!("Opening store at {}", config.store_path.display());
    let repo = Arc::new(LocalRepository::open(
        config.store_path.clone(),
        config.access_code.clone(),
    ));

    // --- 3. Initialize Service Adapters ---
    let api_key = config
        .openai_api_key
        .as_ref()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let openai_config = OpenAIConfig::new().with_api_key(api_key);
    let openai_client = Client::with_config(openai_config);

    let content_adapter = Arc::new(OpenAiContentAdapter::new(
        openai_client.clone(),
        config.lesson_model.clone(),
        config.coach_model.clone(),
    ));

    let image_adapter = Arc::new(OpenAiImageAdapter::new(
        openai_client.clone(),
        config.image_model.clone(),
    ));

    let tts_voice = match config.tts_voice.to_lowercase().as_str() {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        _ => {
            return Err(ApiError::Internal(format!(
                "Invalid TTS voice specified in config: '{}'",
                config.tts_voice
            )))
        }
    };
    let tts_adapter = Arc::new(OpenAiTtsAdapter::new(
        openai_client.clone(),
        SpeechModel::Tts1Hd,
        tts_voice,
    ));

    let live_adapter = Arc::new(OpenAiLiveAdapter::new(
        config.realtime_url.clone(),
        config.realtime_model.clone(),
        api_key.clone(),
        config.tts_voice.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        repo,
        config: config.clone(),
        content_adapter,
        image_adapter,
        tts_adapter,
        live_adapter,
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(me_handler))
        .route("/me/subscription", put(subscription_handler))
        .route("/lessons", get(list_lessons_handler).post(create_lesson_handler))
        .route("/lessons/{id}", get(get_lesson_handler))
        .route("/progress/activities", post(record_activity_handler))
        .route("/generate/lesson", post(generate_lesson_handler))
        .route("/generate/grammar", post(grammar_handler))
        .route("/generate/vocabulary", post(vocabulary_handler))
        .route("/generate/scenario", post(scenario_handler))
        .route("/generate/interview", post(interview_handler))
        .route("/generate/image", post(image_handler))
        .route("/generate/speech", post(speech_handler))
        .route("/admin/snapshot", get(snapshot_handler))
        .route("/admin/reset", post(reset_handler))
        .route("/live", get(live_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete
    // application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
