use std::path::PathBuf;
use std::time::Duration;

use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use transcript::directory::{DirectorySettings, DEFAULT_DIRECTORY_URL, STATIC_FALLBACK_INSTANCES};
use transcript::http::BackoffPolicy;
use transcript::sources::interpreter::{DEFAULT_INTERPRETERS, DEFAULT_SCRIPT_NAME};
use transcript::sources::library::DEFAULT_CAPTION_BASE_URL;
use transcript::sources::relay::RELIABLE_EXTRA_INSTANCES;
use transcript::sources::{InterpreterSettings, LibrarySettings, RelaySettings};

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Interpreter executable tried before python3, python and py.
    #[arg(long, env)]
    python_bin: Option<String>,

    /// Directory holding the transcript script. The script runs with it as working directory.
    #[arg(long, env, default_value = "scripts")]
    pub scripts_dir: PathBuf,

    /// File name of the transcript script inside `scripts_dir`.
    #[arg(long, env, default_value = DEFAULT_SCRIPT_NAME)]
    pub transcript_script: String,

    /// Languages appended to every request's own preference when running the script.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "en,en-US,en-GB,en-IN,hi"
    )]
    pub transcript_langs: Vec<String>,

    /// Seconds a single interpreter run may take before it is killed
    #[arg(long, env, default_value_t = 45)]
    pub interpreter_timeout_secs: u64,

    /// Origin of the timed-text caption endpoint used by the in-process library.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_CAPTION_BASE_URL)]
    pub caption_library_base_url: String,

    /// Timeout in seconds for caption library requests
    #[arg(long, env, default_value_t = 10)]
    pub caption_library_timeout_secs: u64,

    /// URL of the relay instance directory listing.
    #[arg(long, env, default_value = DEFAULT_DIRECTORY_URL)]
    pub instance_directory_url: String,

    /// Timeout in seconds for fetching the instance directory
    #[arg(long, env, default_value_t = 3)]
    pub instance_directory_timeout_secs: u64,

    /// Seconds an instance directory snapshot stays fresh
    #[arg(long, env, default_value_t = 3600)]
    pub instance_directory_ttl_secs: u64,

    /// Retries of the directory listing request on transient failures
    #[arg(long, env, default_value_t = 1)]
    pub instance_directory_retries: u32,

    /// Maximum number of relay instances kept from one directory listing
    #[arg(long, env, default_value_t = 8)]
    pub instance_directory_max_instances: usize,

    /// Timeout in seconds for each request to a relay instance
    #[arg(long, env, default_value_t = 8)]
    pub relay_timeout_secs: u64,

    /// Milliseconds to wait between failed relay instances
    #[arg(long, env, default_value_t = 500)]
    pub relay_backoff_ms: u64,

    /// Retries against the same relay on transient failures before moving on
    #[arg(long, env, default_value_t = 0)]
    pub relay_retries: u32,

    /// Maximum number of transcripts kept in memory. 0 disables the cache.
    #[arg(long, env, default_value_t = 100)]
    pub transcript_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn python_bin(&self) -> Option<String> {
        self.python_bin
            .as_ref()
            .filter(|bin| !bin.trim().is_empty())
            .cloned()
    }

    pub fn library_settings(&self) -> LibrarySettings {
        LibrarySettings {
            base_url: self.caption_library_base_url.clone(),
            timeout: Duration::from_secs(self.caption_library_timeout_secs),
        }
    }

    pub fn interpreter_settings(&self) -> InterpreterSettings {
        InterpreterSettings {
            interpreter_override: self.python_bin(),
            interpreters: DEFAULT_INTERPRETERS.iter().map(|s| s.to_string()).collect(),
            scripts_dir: self.scripts_dir.clone(),
            script_name: self.transcript_script.clone(),
            extra_languages: self.transcript_langs.clone(),
            timeout: Duration::from_secs(self.interpreter_timeout_secs),
        }
    }

    pub fn directory_settings(&self) -> DirectorySettings {
        DirectorySettings {
            url: self.instance_directory_url.clone(),
            timeout: Duration::from_secs(self.instance_directory_timeout_secs),
            ttl: Duration::from_secs(self.instance_directory_ttl_secs),
            max_instances: self.instance_directory_max_instances,
            fallback_instances: STATIC_FALLBACK_INSTANCES
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
            retry: BackoffPolicy::new(self.instance_directory_retries),
        }
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            timeout: Duration::from_secs(self.relay_timeout_secs),
            backoff: BackoffPolicy::fixed(Duration::from_millis(self.relay_backoff_ms))
                .with_max_retries(self.relay_retries),
            extra_instances: RELIABLE_EXTRA_INSTANCES
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("learnloop").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_match_transcript_settings() {
        let config = parse(&[]);

        assert_eq!(config.transcript_cache_capacity, 100);
        let directory = config.directory_settings();
        assert_eq!(directory.ttl, Duration::from_secs(3600));
        assert_eq!(directory.timeout, Duration::from_secs(3));
        assert_eq!(directory.max_instances, 8);
        assert_eq!(directory.retry.max_retries(), 1);

        let relay = config.relay_settings();
        assert_eq!(relay.timeout, Duration::from_secs(8));
        assert_eq!(relay.backoff.delay(0), Duration::from_millis(500));
        assert_eq!(relay.backoff.max_retries(), 0);
        assert_eq!(relay.extra_instances.len(), 3);

        let interpreter = config.interpreter_settings();
        assert_eq!(interpreter.timeout, Duration::from_secs(45));
        assert_eq!(interpreter.script_name, "fetch_transcript.py");
    }

    #[test]
    fn test_python_bin_and_languages_are_parsed() {
        let config = parse(&[
            "--python-bin",
            "/usr/local/bin/python3.12",
            "--transcript-langs",
            "de,fr",
        ]);

        let interpreter = config.interpreter_settings();
        assert_eq!(
            interpreter.candidates(),
            vec!["/usr/local/bin/python3.12", "python3", "python", "py"]
        );
        assert_eq!(interpreter.extra_languages, vec!["de", "fr"]);
    }

    #[test]
    fn test_retry_counts_reach_directory_and_relay_policies() {
        let config = parse(&[
            "--instance-directory-retries",
            "3",
            "--relay-retries",
            "2",
            "--relay-backoff-ms",
            "250",
        ]);

        assert_eq!(config.directory_settings().retry.max_retries(), 3);
        let relay = config.relay_settings();
        assert_eq!(relay.backoff.max_retries(), 2);
        assert_eq!(relay.backoff.delay(1), Duration::from_millis(250));
    }

    #[test]
    fn test_blank_python_bin_is_ignored() {
        let config = parse(&["--python-bin", " "]);
        assert_eq!(config.python_bin(), None);
    }

    #[test]
    fn test_log_level_filter_accepts_uppercase_names() {
        let config = parse(&["--log-level-filter", "DEBUG"]);
        assert_eq!(config.log_level_filter, LevelFilter::Debug);
    }
}
