use log::{error, info};
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Starting learnloop transcript service...");

    let transcripts = match service::init_transcript_service(&config) {
        Ok(transcripts) => Arc::new(transcripts),
        Err(e) => {
            error!("Failed to build transcript service: {e}");
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(config, &transcripts);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server terminated: {e}");
        std::process::exit(1);
    }
}
