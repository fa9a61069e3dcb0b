use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Tunables for the orchestrator itself.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    /// Below this, `requires_human` is forced true on the outcome.
    pub confidence_threshold: f32,
    /// Upper bound on the tool-execution -> generation loop per run.
    pub max_agent_iterations: u32,
    /// Substring that marks a guest message for verbatim memory capture.
    pub memory_directive: String,
}

/// Bounds for the human-authorization wait.
#[derive(Clone, Debug)]
pub struct AuthorizationSettings {
    pub wait_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LlmSettings {
    pub model: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub engine: EngineSettings,
    pub authorization: AuthorizationSettings,
    pub llm: LlmSettings,
    pub logging: LoggingSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings {
                confidence_threshold: 0.5,
                max_agent_iterations: 6,
                memory_directive: "remember".to_string(),
            },
            authorization: AuthorizationSettings { wait_timeout_secs: 120, poll_interval_ms: 500 },
            llm: LlmSettings { model: "gpt-4o-mini".to_string(), api_key: None, timeout_secs: 30 },
            logging: LoggingSettings { level: "info".to_string(), json: false },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub confidence_threshold: Option<f32>,
    pub max_agent_iterations: Option<u32>,
    pub wait_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    engine: Option<EnginePatch>,
    authorization: Option<AuthorizationPatch>,
    llm: Option<LlmPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    confidence_threshold: Option<f32>,
    max_agent_iterations: Option<u32>,
    memory_directive: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthorizationPatch {
    wait_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    json: Option<bool>,
}

impl EngineConfig {
    /// Defaults <- optional TOML file <- `CONCIERGE_*` env <- programmatic
    /// overrides, validated at the end.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            debug!(event_name = "config.file_loaded", path = %path.display());
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("concierge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(engine) = patch.engine {
            if let Some(confidence_threshold) = engine.confidence_threshold {
                self.engine.confidence_threshold = confidence_threshold;
            }
            if let Some(max_agent_iterations) = engine.max_agent_iterations {
                self.engine.max_agent_iterations = max_agent_iterations;
            }
            if let Some(memory_directive) = engine.memory_directive {
                self.engine.memory_directive = memory_directive;
            }
        }

        if let Some(authorization) = patch.authorization {
            if let Some(wait_timeout_secs) = authorization.wait_timeout_secs {
                self.authorization.wait_timeout_secs = wait_timeout_secs;
            }
            if let Some(poll_interval_ms) = authorization.poll_interval_ms {
                self.authorization.poll_interval_ms = poll_interval_ms;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(json) = logging.json {
                self.logging.json = json;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONCIERGE_CONFIDENCE_THRESHOLD") {
            self.engine.confidence_threshold = parse_env("CONCIERGE_CONFIDENCE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_MAX_AGENT_ITERATIONS") {
            self.engine.max_agent_iterations = parse_env("CONCIERGE_MAX_AGENT_ITERATIONS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_AUTH_WAIT_TIMEOUT_SECS") {
            self.authorization.wait_timeout_secs =
                parse_env("CONCIERGE_AUTH_WAIT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_AUTH_POLL_INTERVAL_MS") {
            self.authorization.poll_interval_ms =
                parse_env("CONCIERGE_AUTH_POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CONCIERGE_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("CONCIERGE_LOG_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(confidence_threshold) = overrides.confidence_threshold {
            self.engine.confidence_threshold = confidence_threshold;
        }
        if let Some(max_agent_iterations) = overrides.max_agent_iterations {
            self.engine.max_agent_iterations = max_agent_iterations;
        }
        if let Some(wait_timeout_secs) = overrides.wait_timeout_secs {
            self.authorization.wait_timeout_secs = wait_timeout_secs;
        }
        if let Some(poll_interval_ms) = overrides.poll_interval_ms {
            self.authorization.poll_interval_ms = poll_interval_ms;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.engine.confidence_threshold) {
            return Err(ConfigError::Validation(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.engine.confidence_threshold
            )));
        }
        if self.engine.max_agent_iterations == 0 {
            return Err(ConfigError::Validation(
                "max_agent_iterations must be at least 1".to_string(),
            ));
        }
        if self.engine.memory_directive.trim().is_empty() {
            return Err(ConfigError::Validation("memory_directive must be non-empty".to_string()));
        }
        if self.authorization.wait_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "authorization wait_timeout_secs must be nonzero".to_string(),
            ));
        }
        if self.authorization.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "authorization poll_interval_ms must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(requested: Option<&Path>) -> Option<PathBuf> {
    match requested {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(_) => None,
        None => {
            let default = PathBuf::from("concierge.toml");
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
