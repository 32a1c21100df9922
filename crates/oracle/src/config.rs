use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{var} is required but not set")]
    Missing { var: &'static str },

    /// The HTTP client could not be constructed from the settings.
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Bearer credential for the language-model endpoint.
///
/// `Debug` never prints the secret, so the key can sit inside config
/// structs that get logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Settings for the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub endpoint: String,
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            timeout_secs: 45,
            max_tokens: 2000,
            temperature: 0.7,
        }
    }
}

/// Configuration for the AI interpretation pipeline.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// AI requests allowed per user per clock hour.
    pub rate_limit_per_hour: u32,
    pub cache_ttl_secs: u64,
    /// Must outlast `model.timeout_secs`, so a slow but successful model
    /// call finishes while its generation lock is still held.
    pub lock_ttl_secs: u64,
    /// Prefix shared by the rate, cache and lock keys.
    pub key_prefix: String,
    pub redis_url: String,
    pub model: ModelConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_hour: 10,
            cache_ttl_secs: 86_400,
            lock_ttl_secs: 60,
            key_prefix: "iching".into(),
            redis_url: "redis://127.0.0.1:6379".into(),
            model: ModelConfig::default(),
        }
    }
}

impl OracleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                      |
    /// |--------------------------|----------------------------------------------|
    /// | `AI_RATE_LIMIT_PER_HOUR` | `10`                                         |
    /// | `AI_CACHE_TTL_SECS`      | `86400`                                      |
    /// | `AI_LOCK_TTL_SECS`       | `60`                                         |
    /// | `AI_KEY_PREFIX`          | `iching`                                     |
    /// | `REDIS_URL`              | `redis://127.0.0.1:6379`                     |
    /// | `LLM_ENDPOINT`           | `https://api.openai.com/v1/chat/completions` |
    /// | `LLM_API_KEY`            | unset                                        |
    /// | `LLM_MODEL`              | `gpt-4o-mini`                                |
    /// | `LLM_TIMEOUT_SECS`       | `45` (must be below `AI_LOCK_TTL_SECS`)      |
    /// | `LLM_MAX_TOKENS`         | `2000`                                       |
    /// | `LLM_TEMPERATURE`        | `0.7`                                        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through
    /// `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let model_defaults = ModelConfig::default();

        let lock_ttl_secs = parse_var(&lookup, "AI_LOCK_TTL_SECS", defaults.lock_ttl_secs)?;
        require_positive("AI_LOCK_TTL_SECS", lock_ttl_secs)?;
        let cache_ttl_secs = parse_var(&lookup, "AI_CACHE_TTL_SECS", defaults.cache_ttl_secs)?;
        require_positive("AI_CACHE_TTL_SECS", cache_ttl_secs)?;

        let temperature: f32 =
            parse_var(&lookup, "LLM_TEMPERATURE", model_defaults.temperature)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                var: "LLM_TEMPERATURE",
                expected: "a number between 0 and 2",
                value: temperature.to_string(),
            });
        }

        let model = ModelConfig {
            endpoint: lookup("LLM_ENDPOINT").unwrap_or(model_defaults.endpoint),
            api_key: lookup("LLM_API_KEY")
                .filter(|key| !key.trim().is_empty())
                .map(ApiKey::new),
            model: lookup("LLM_MODEL").unwrap_or(model_defaults.model),
            timeout_secs: parse_var(&lookup, "LLM_TIMEOUT_SECS", model_defaults.timeout_secs)?,
            max_tokens: parse_var(&lookup, "LLM_MAX_TOKENS", model_defaults.max_tokens)?,
            temperature,
        };

        if lock_ttl_secs <= model.timeout_secs {
            return Err(ConfigError::Invalid {
                var: "AI_LOCK_TTL_SECS",
                expected: "longer than LLM_TIMEOUT_SECS",
                value: lock_ttl_secs.to_string(),
            });
        }

        Ok(Self {
            rate_limit_per_hour: parse_var(
                &lookup,
                "AI_RATE_LIMIT_PER_HOUR",
                defaults.rate_limit_per_hour,
            )?,
            cache_ttl_secs,
            lock_ttl_secs,
            key_prefix: lookup("AI_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            model,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected: std::any::type_name::<T>(),
            value: raw,
        }),
    }
}

fn require_positive(var: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            expected: "a positive number of seconds",
            value: value.to_string(),
        });
    }
    Ok(())
}
