use config::Config;
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use transcript::directory::InstanceDirectory;
use transcript::sources::{
    InterpreterBridge, InterpreterSource, LibrarySource, RelayFetcher, TimedTextClient,
};
use transcript::traits::source::Source;
use transcript::{Error, TranscriptCache, TranscriptService};

pub mod config;
pub mod logging;

/// Assemble the escalation chain from config: library, then interpreter, then relays.
pub fn init_transcript_service(config: &Config) -> Result<TranscriptService, Error> {
    info!(
        "Transcript config: cache_capacity={}, scripts_dir={}, interpreter_timeout={}s, \
         directory_ttl={}s, relay_timeout={}s, relay_backoff={}ms",
        config.transcript_cache_capacity,
        config.scripts_dir.display(),
        config.interpreter_timeout_secs,
        config.instance_directory_ttl_secs,
        config.relay_timeout_secs,
        config.relay_backoff_ms,
    );

    let library = LibrarySource::new(Box::new(TimedTextClient::new(&config.library_settings())?));
    let interpreter = InterpreterSource::new(InterpreterBridge::new(config.interpreter_settings()));
    let directory = Arc::new(InstanceDirectory::new(config.directory_settings())?);
    let relay = RelayFetcher::new(directory, config.relay_settings())?;

    let sources: Vec<Box<dyn Source>> = vec![
        Box::new(library),
        Box::new(interpreter),
        Box::new(relay),
    ];

    Ok(TranscriptService::new(
        sources,
        TranscriptCache::new(config.transcript_cache_capacity),
    ))
}

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub transcripts: Arc<TranscriptService>,
    /// Cancelled on shutdown; in-flight resolutions derive child tokens from it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(app_config: Config, transcripts: &Arc<TranscriptService>) -> Self {
        Self {
            config: app_config,
            transcripts: Arc::clone(transcripts),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn transcripts_ref(&self) -> &TranscriptService {
        self.transcripts.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use transcript::SourceKind;

    #[test]
    fn test_service_chain_is_library_interpreter_relay() {
        let config = Config::try_parse_from(["learnloop"]).unwrap();

        let service = init_transcript_service(&config).unwrap();

        assert_eq!(
            service.source_kinds(),
            vec![SourceKind::Library, SourceKind::Interpreter, SourceKind::Relay]
        );
        assert_eq!(service.cache().capacity(), 100);
    }

    #[test]
    fn test_app_state_clones_share_the_service() {
        let config = Config::try_parse_from(["learnloop"]).unwrap();
        let transcripts = Arc::new(init_transcript_service(&config).unwrap());

        let state = AppState::new(config, &transcripts);
        let clone = state.clone();

        assert!(Arc::ptr_eq(&state.transcripts, &clone.transcripts));
        assert_eq!(Arc::strong_count(&transcripts), 3);
    }
}
