use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::extract::DEFAULT_MAX_CHARS;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "traffic_pulse.toml";
const ENV_PREFIX: &str = "TRAFFIC";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub fetch: FetchSettings,
    pub extract: ExtractSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    pub max_chars: usize,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            url: "https://btp.karnataka.gov.in/en".into(),
            timeout_secs: 20,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.together.xyz/v1".into(),
            model: "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free".into(),
            api_key: None,
            timeout_secs: 45,
        }
    }
}

// Keeps the key out of startup logs.
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Defaults, then the TOML file, then `TRAFFIC_*` variables
    /// (`TRAFFIC_LLM__API_KEY`, `TRAFFIC_FETCH__TIMEOUT_SECS`, ...).
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).format(FileFormat::Toml).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE)
                .format(FileFormat::Toml)
                .required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(env_source())
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    #[cfg(test)]
    fn from_toml(toml: &str) -> Result<Self> {
        Ok(Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::from_toml("").unwrap();
        assert_eq!(s.server.addr.port(), 8000);
        assert_eq!(s.fetch.url, "https://btp.karnataka.gov.in/en");
        assert_eq!(s.fetch.timeout(), Duration::from_secs(20));
        assert_eq!(s.extract.max_chars, 8000);
        assert_eq!(s.llm.model, "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free");
        assert_eq!(s.llm.timeout(), Duration::from_secs(45));
        assert!(s.llm.api_key.is_none());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let s = Settings::from_toml(
            r#"
            [server]
            addr = "127.0.0.1:9090"

            [llm]
            model = "other-model"
            api_key = "k-123"
            "#,
        )
        .unwrap();
        assert_eq!(s.server.addr, "127.0.0.1:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(s.llm.model, "other-model");
        assert_eq!(s.llm.api_key.as_deref(), Some("k-123"));
        assert_eq!(s.llm.timeout_secs, 45);
        assert_eq!(s.fetch.timeout_secs, 20);
    }

    #[test]
    fn bad_value_rejected() {
        assert!(Settings::from_toml("[fetch]\ntimeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_error() {
        assert!(Settings::load(Some(Path::new("does/not/exist.toml"))).is_err());
    }

    #[test]
    fn api_key_redacted_in_debug() {
        let llm = LlmSettings {
            api_key: Some("super-secret".into()),
            ..LlmSettings::default()
        };
        let out = format!("{:?}", llm);
        assert!(!out.contains("super-secret"));
        assert!(out.contains("<redacted>"));
    }
}
