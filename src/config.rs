use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path};

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 20;
const DEFAULT_NETWORK_IDLE_MS: u64 = 500;
const DEFAULT_IMAGE_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const DEFAULT_NUM_RESULTS: u8 = 10;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Page fetching and headless rendering
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for the direct HTTP fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    /// Proxy for both the direct fetch and the browser (http, https or socks5 url)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Fall back to a headless browser when the direct fetch yields nothing
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default)]
    pub chrome_path: Option<String>,

    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,

    /// How long the page must stay quiet before it counts as loaded
    #[serde(default = "default_network_idle_ms")]
    pub network_idle_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            proxy: None,
            headless: true,
            chrome_path: None,
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            network_idle_ms: DEFAULT_NETWORK_IDLE_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageSearchConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Programmable search engine id (`cx`)
    #[serde(default)]
    pub engine_id: Option<String>,

    #[serde(default = "default_image_search_endpoint")]
    pub endpoint: String,

    /// Results per query, the provider caps this at 10
    #[serde(default = "default_num_results")]
    pub num_results: u8,

    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ImageSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            endpoint: default_image_search_endpoint(),
            num_results: DEFAULT_NUM_RESULTS,
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub image_search: ImageSearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            scrape: ScrapeConfig::default(),
            image_search: ImageSearchConfig::default(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_render_timeout_secs() -> u64 {
    DEFAULT_RENDER_TIMEOUT_SECS
}

fn default_network_idle_ms() -> u64 {
    DEFAULT_NETWORK_IDLE_MS
}

fn default_image_search_endpoint() -> String {
    DEFAULT_IMAGE_SEARCH_ENDPOINT.to_string()
}

fn default_num_results() -> u8 {
    DEFAULT_NUM_RESULTS
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Defaults, then the YAML file (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yml::from_str(config_str)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(listen) = var("LINKPEEK_LISTEN") {
            self.listen = listen;
        }
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.image_search.api_key = Some(key);
        }
        if let Some(cx) = var("GOOGLE_CSE_ID") {
            self.image_search.engine_id = Some(cx);
        }
        if let Some(path) = var("CHROME_PATH") {
            self.scrape.chrome_path = Some(path);
        }
        if let Some(proxy) = var("OPT_PROXY") {
            self.scrape.proxy = Some(proxy);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if self.scrape.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "scrape.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.scrape.render_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "scrape.render_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.image_search.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "image_search.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|err| ConfigError::Invalid(format!("listen address {:?}: {err}", self.listen)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert!(config.scrape.headless);
        assert_eq!(config.scrape.network_idle_ms, 500);
        assert_eq!(config.image_search.num_results, 10);
        assert!(config.image_search.api_key.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "listen: 127.0.0.1:9000\nscrape:\n  headless: false\nimage_search:\n  engine_id: abc\n",
        )
        .unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert!(!config.scrape.headless);
        assert_eq!(config.scrape.timeout_secs, 10);
        assert_eq!(config.image_search.engine_id.as_deref(), Some("abc"));
        assert_eq!(
            config.image_search.endpoint,
            "https://www.googleapis.com/customsearch/v1"
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_yaml("image_search:\n  api_key: from-file\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("GOOGLE_API_KEY", "from-env"),
            ("CHROME_PATH", "/usr/bin/chromium"),
            ("OPT_PROXY", ""),
        ]
        .into_iter()
        .collect();

        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.image_search.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.scrape.chrome_path.as_deref(), Some("/usr/bin/chromium"));
        assert!(config.scrape.proxy.is_none());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = Config::from_yaml("scrape:\n  timeout_secs: 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_listen_address() {
        let config = Config::from_yaml("listen: nowhere\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scrape:\n  render_timeout_secs: 5").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.scrape.render_timeout_secs, 5);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::from_file(&tmp.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
