use crate::constants;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the Sourcegraph instance. Required.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_sse_port")]
    pub sse_port: u16,
    #[serde(default = "default_streamable_http_port")]
    pub streamable_http_port: u16,
    #[serde(default = "default_mcp_path")]
    pub mcp_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Prompt catalogue file. The built-in catalogue is used when unset.
    #[serde(default)]
    pub file: Option<String>,
    /// Organization guide text; overrides the catalogue's `guides.org_guide`.
    #[serde(default)]
    pub org_guide: Option<String>,
    /// File holding the organization guide; read when `org_guide` is unset.
    #[serde(default)]
    pub org_guide_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_timeout_secs() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECS
}
fn default_bind() -> String {
    constants::DEFAULT_BIND_ADDR.into()
}
fn default_sse_port() -> u16 {
    constants::DEFAULT_SSE_PORT
}
fn default_streamable_http_port() -> u16 {
    constants::DEFAULT_STREAMABLE_HTTP_PORT
}
fn default_mcp_path() -> String {
    constants::DEFAULT_MCP_PATH.into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            sse_port: default_sse_port(),
            streamable_http_port: default_streamable_http_port(),
            mcp_path: default_mcp_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with layered precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Explicit config file (from `--config` flag)
    /// 3. Global config: `~/.sgmcp/config.toml`
    /// 4. Built-in defaults (lowest priority)
    ///
    /// Only fields explicitly set in a higher-priority layer override lower layers.
    /// The result is not validated; call [`Config::validate`] once CLI overrides
    /// have been applied.
    pub fn load_with_file(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let global = dirs::home_dir().map(|home| {
            home.join(constants::DEFAULT_DATA_DIR)
                .join(constants::CONFIG_FILE_NAME)
        });
        Self::load_layers(global.as_deref(), config_file, |key| std::env::var(key).ok())
    }

    fn load_layers<F>(
        global_file: Option<&Path>,
        config_file: Option<&Path>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        if let Some(global_path) = global_file
            && global_path.exists()
        {
            debug!(path = %global_path.display(), "Loading global config");
            let raw = load_toml_value(global_path)?;
            merge_toml_values(&mut merged, &raw);
        }

        if let Some(cf) = config_file {
            if !cf.exists() {
                return Err(ConfigError::NotFound {
                    path: cf.display().to_string(),
                });
            }
            debug!(path = %cf.display(), "Loading config file");
            let raw = load_toml_value(cf)?;
            merge_toml_values(&mut merged, &raw);
        }

        let config_str =
            toml::to_string(&merged).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        apply_env_overrides(&mut config, env)?;

        if config
            .upstream
            .token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            config.upstream.token = None;
        }
        if let Some(file) = config.prompts.file.take() {
            config.prompts.file = Some(expand_tilde(&file));
        }
        if let Some(file) = config.prompts.org_guide_file.take() {
            config.prompts.org_guide_file = Some(expand_tilde(&file));
        }

        Ok(config)
    }

    /// Reject configurations that must not start a server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.upstream.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::MissingRequired(
                "upstream.endpoint (set SRC_ENDPOINT or --endpoint)".into(),
            ));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::invalid_value(
                "upstream.endpoint",
                format!("expected an http(s) URL, got `{}`", endpoint),
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "upstream.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.server.sse_port == self.server.streamable_http_port {
            return Err(ConfigError::invalid_value(
                "server.sse_port",
                format!(
                    "SSE and streamable HTTP listeners cannot share port {}",
                    self.server.sse_port
                ),
            ));
        }
        if !self.server.mcp_path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "server.mcp_path",
                "must start with `/`",
            ));
        }
        Ok(())
    }

    /// Endpoint without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.upstream.endpoint.trim().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }
}

/// Load a TOML file as a raw `toml::Value` (preserving only explicitly-set fields).
fn load_toml_value(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<toml::Value>()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Deep-merge `overlay` into `base`. Only keys present in `overlay` are written.
fn merge_toml_values(base: &mut toml::Value, overlay: &toml::Value) {
    if let (toml::Value::Table(base_map), toml::Value::Table(overlay_map)) = (base, overlay) {
        for (key, overlay_val) in overlay_map {
            if let Some(base_val) = base_map.get_mut(key) {
                if base_val.is_table() && overlay_val.is_table() {
                    merge_toml_values(base_val, overlay_val);
                } else {
                    *base_val = overlay_val.clone();
                }
            } else {
                base_map.insert(key.clone(), overlay_val.clone());
            }
        }
    }
}

/// Apply environment variable overrides to config fields.
///
/// The deployment names (`SRC_ENDPOINT`, `SRC_ACCESS_TOKEN`, `MCP_SSE_PORT`,
/// `MCP_STREAMABLE_HTTP_PORT`) win over the `SGMCP_<SECTION>_<KEY>` forms.
fn apply_env_overrides<F>(config: &mut Config, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // First key that is set, with the key it came from.
    let first = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| env(k).map(|v| (k.to_string(), v)))
    };

    if let Some((_, v)) = first(&["SRC_ENDPOINT", "SGMCP_UPSTREAM_ENDPOINT"]) {
        config.upstream.endpoint = v;
    }
    if let Some((_, v)) = first(&["SRC_ACCESS_TOKEN", "SGMCP_UPSTREAM_TOKEN"]) {
        config.upstream.token = Some(v);
    }
    if let Some(v) = env("SGMCP_UPSTREAM_TIMEOUT_SECS") {
        config.upstream.timeout_secs = parse_env("SGMCP_UPSTREAM_TIMEOUT_SECS", &v)?;
    }
    if let Some((key, v)) = first(&["MCP_SSE_PORT", "SGMCP_SERVER_SSE_PORT"]) {
        config.server.sse_port = parse_env(&key, &v)?;
    }
    if let Some((key, v)) = first(&["MCP_STREAMABLE_HTTP_PORT", "SGMCP_SERVER_STREAMABLE_HTTP_PORT"])
    {
        config.server.streamable_http_port = parse_env(&key, &v)?;
    }
    if let Some(v) = env("SGMCP_SERVER_BIND") {
        config.server.bind = v;
    }
    if let Some(v) = env("SGMCP_PROMPTS_FILE") {
        config.prompts.file = Some(v);
    }
    if let Some(v) = env("SGMCP_PROMPTS_ORG_GUIDE_FILE") {
        config.prompts.org_guide_file = Some(v);
    }
    if let Some(v) = env("SGMCP_LOGGING_LEVEL") {
        config.logging.level = v;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid_value(key, format!("cannot parse `{}`", raw)))
}

fn expand_tilde(path: &str) -> String {
    if path.starts_with('~')
        && let Some(home) = dirs::home_dir()
    {
        return path.replacen('~', &home.to_string_lossy(), 1);
    }
    path.to_string()
}
