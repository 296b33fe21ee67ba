//! Run configuration: where events go, with which credentials and at what
//! pace. Every field has a default, so an empty document is valid; unknown
//! fields are rejected and reported as [`Error::SerdeYaml`].
use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::{debug, warn};

/// Environment variable that, when set, holds the configuration YAML itself.
pub const CONFIG_ENV: &str = "SYNTH_MATCH_CONFIG";

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
    /// The ingestion base URL does not parse
    #[error("Invalid ingestion URL {url}: {reason}")]
    Url {
        /// The URL as assembled
        url: String,
        /// Why it was rejected
        reason: String,
    },
}

fn default_delay_milliseconds() -> u64 {
    50
}

fn default_request_timeout_milliseconds() -> u64 {
    10_000
}

fn default_window_seconds() -> u64 {
    180
}

/// Main configuration struct for this program
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where events are sent and with which credentials
    #[serde(default)]
    pub endpoint: Endpoint,
    /// Pause after every send, in milliseconds
    #[serde(default = "default_delay_milliseconds")]
    pub delay_milliseconds: u64,
    /// Upper bound on a single request, in milliseconds
    #[serde(default = "default_request_timeout_milliseconds")]
    pub request_timeout_milliseconds: u64,
    /// Span of the event timestamp window, in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// The seed for random operations. Runs with the same seed produce the
    /// same roster and events, timestamps excepted.
    #[serde(default)]
    pub seed: Option<[u8; 32]>,
    /// The method by which to express telemetry
    #[serde(default)]
    pub telemetry: Option<Telemetry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            delay_milliseconds: default_delay_milliseconds(),
            request_timeout_milliseconds: default_request_timeout_milliseconds(),
            window_seconds: default_window_seconds(),
            seed: None,
            telemetry: None,
        }
    }
}

impl Config {
    /// Pause after every send.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_milliseconds)
    }

    /// Upper bound on a single request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_milliseconds)
    }

    /// Span of the event timestamp window.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerdeYaml`] if the text is not valid configuration.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Resolve configuration for this run.
    ///
    /// The [`CONFIG_ENV`] variable wins if set, then the file at `path`. With
    /// neither, the built-in placeholder endpoint is used, which will not
    /// accept events until edited.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the YAML is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        if let Ok(contents) = env::var(CONFIG_ENV) {
            debug!("Using config from env var '{CONFIG_ENV}'");
            return Self::from_yaml(&contents);
        }
        match path {
            Some(path) => {
                debug!("Attempting to open configuration file at: {}", path.display());
                let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
                    path: path.to_path_buf(),
                    source: Box::new(source),
                })?;
                Self::from_yaml(&contents)
            }
            None => {
                warn!(
                    "No configuration supplied, using placeholder endpoint {}",
                    Endpoint::default().base_url
                );
                Ok(Self::default())
            }
        }
    }
}

/// The ingestion endpoint and its credentials.
#[derive(Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Endpoint {
    /// Scheme and host, for example `https://demo.trafficpeak.live`
    pub base_url: String,
    /// Destination table
    pub table: String,
    /// Ingestion token
    pub token: String,
    /// HTTP Basic username
    pub username: String,
    /// HTTP Basic password
    pub password: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            base_url: "https://demo.trafficpeak.live".to_string(),
            table: "<your-table>".to_string(),
            token: "<your-token>".to_string(),
            username: "<your-tpk-uid>".to_string(),
            password: "<your-tpk-pwd>".to_string(),
        }
    }
}

// Token and password stay out of logs.
impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Endpoint {
    /// The full ingestion URL, `<base_url>/ingest/event?table=..&token=..`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `base_url` is not an absolute URL.
    pub fn ingest_url(&self) -> Result<reqwest::Url, Error> {
        let raw = format!("{}/ingest/event", self.base_url.trim_end_matches('/'));
        let mut url = reqwest::Url::parse(&raw).map_err(|err| Error::Url {
            url: raw.clone(),
            reason: err.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("table", &self.table)
            .append_pair("token", &self.token);
        Ok(url)
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(untagged)]
/// Defines the manner of synth-match's own telemetry.
pub enum Telemetry {
    /// In prometheus mode the run exposes its request counters for scraping
    /// at a prometheus poll endpoint.
    Prometheus {
        /// Address and port for prometheus exporter
        addr: SocketAddr,
        /// Additional labels to include in every metric
        #[serde(default)]
        global_labels: FxHashMap<String, String>,
    },
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use rustc_hash::FxHashMap;

    use super::{Config, Endpoint, Error, Telemetry};

    #[test]
    fn empty_document_is_all_defaults() {
        let config = Config::from_yaml("{}").expect("Failed to deserialize the config");
        assert_eq!(config, Config::default());
        assert_eq!(config.delay(), Duration::from_millis(50));
        assert_eq!(config.window(), Duration::from_secs(180));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn config_deserializes() {
        let contents = r#"
endpoint:
  base_url: "http://127.0.0.1:8080/"
  table: "karts"
  token: "abc123"
  username: "uid"
  password: "pwd"
delay_milliseconds: 5
request_timeout_milliseconds: 250
window_seconds: 60
telemetry:
  addr: "0.0.0.0:1234"
  global_labels:
    pipeline: staging
"#;
        let config = Config::from_yaml(contents).expect("Failed to deserialize the config");
        assert_eq!(
            config.endpoint,
            Endpoint {
                base_url: "http://127.0.0.1:8080/".to_string(),
                table: "karts".to_string(),
                token: "abc123".to_string(),
                username: "uid".to_string(),
                password: "pwd".to_string(),
            }
        );
        assert_eq!(config.delay(), Duration::from_millis(5));
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.window(), Duration::from_secs(60));
        assert_eq!(
            config.telemetry,
            Some(Telemetry::Prometheus {
                addr: "0.0.0.0:1234".parse().expect("Failed to parse address"),
                global_labels: FxHashMap::from_iter([(
                    "pipeline".to_string(),
                    "staging".to_string()
                )]),
            })
        );
        assert_eq!(config.seed, None);
    }

    #[test]
    fn partial_endpoint_keeps_placeholders() {
        let config = Config::from_yaml("endpoint:\n  table: laps\n")
            .expect("Failed to deserialize the config");
        assert_eq!(config.endpoint.table, "laps");
        assert_eq!(config.endpoint.base_url, Endpoint::default().base_url);
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = Config::from_yaml("retries: 3\n").expect_err("unknown field accepted");
        assert!(matches!(err, Error::SerdeYaml(_)));
    }

    #[test]
    fn seed_deserializes() {
        let seed: Vec<String> = (0..32).map(|i| i.to_string()).collect();
        let contents = format!("seed: [{}]\n", seed.join(", "));
        let config = Config::from_yaml(&contents).expect("Failed to deserialize the config");
        let expected: [u8; 32] = std::array::from_fn(|i| u8::try_from(i).expect("small index"));
        assert_eq!(config.seed, Some(expected));
    }

    #[test]
    fn ingest_url_carries_table_and_token() {
        let endpoint = Endpoint {
            base_url: "https://ingest.example.com/".to_string(),
            table: "karts".to_string(),
            token: "a b&c".to_string(),
            ..Endpoint::default()
        };
        let url = endpoint.ingest_url().expect("valid url");
        assert_eq!(
            url.as_str(),
            "https://ingest.example.com/ingest/event?table=karts&token=a+b%26c"
        );
    }

    #[test]
    fn default_ingest_url_is_placeholder() {
        let url = Endpoint::default().ingest_url().expect("valid url");
        assert_eq!(url.host_str(), Some("demo.trafficpeak.live"));
        assert_eq!(url.path(), "/ingest/event");
    }

    #[test]
    fn relative_base_url_rejected() {
        let endpoint = Endpoint {
            base_url: "not a url".to_string(),
            ..Endpoint::default()
        };
        assert!(matches!(endpoint.ingest_url(), Err(Error::Url { .. })));
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", Endpoint::default());
        assert!(!rendered.contains("<your-token>"));
        assert!(!rendered.contains("<your-tpk-pwd>"));
        assert!(rendered.contains("<your-tpk-uid>"));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "delay_milliseconds: 7").expect("write config");
        let config = Config::load(Some(file.path())).expect("Failed to load the config");
        assert_eq!(config.delay(), std::time::Duration::from_millis(7));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Config::load(Some(&dir.path().join("absent.yaml")))
            .expect_err("missing file accepted");
        assert!(matches!(err, Error::ReadFile { .. }));
    }
}
