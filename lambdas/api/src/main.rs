use std::{env, sync::Arc};

use api::{AppState, ServerConfig};
use domain::{prescriptions::GeminiProvider, GeminiConfig};

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let server_config = ServerConfig::from_env();
    let gemini_config = GeminiConfig::from_env();

    if gemini_config.api_key.is_none() {
        tracing::warn!("Neither GOOGLE_API_KEY nor GEMINI_API_KEY is set; extraction will fail");
    }
    tracing::info!("Using model {}", gemini_config.model);

    let state = AppState::new(Arc::new(GeminiProvider::new(gemini_config)));
    let app = api::router(state, &server_config);

    if env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        let app = tower::ServiceBuilder::new()
            .layer(axum_aws_lambda::LambdaLayer::default())
            .service(app);

        lambda_http::run(app).await?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr()).await?;
    tracing::info!(
        "Starting prescription extraction service on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}
