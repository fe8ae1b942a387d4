//! Configuration parsing and validation for keyward.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub youtube: YoutubeConfig,
    pub remove_bg: RemoveBgConfig,
    pub eleven_labs: StubConfig,
    pub emailjs: StubConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:3000")
    pub listen: String,
    /// Maximum accepted request body, in bytes. Inline images make this large.
    pub body_limit_bytes: usize,
    /// Whether to answer cross-origin requests from any origin
    pub cors: bool,
    /// Upstream request timeout in seconds
    pub timeout_secs: u64,
    /// Upstream connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_string(),
            body_limit_bytes: 50 * 1024 * 1024,
            cors: true,
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

/// Gemini chat upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<ApiKey>,
    pub base_url: String,
    /// Model name used in `models/{model}:generateContent`
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

/// YouTube Data API upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub api_key: Option<ApiKey>,
    pub base_url: String,
    /// `maxResults` forwarded on search calls
    pub max_results: u32,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.googleapis.com".to_string(),
            max_results: 10,
        }
    }
}

/// remove.bg upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoveBgConfig {
    pub api_key: Option<ApiKey>,
    pub base_url: String,
}

impl Default for RemoveBgConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.remove.bg".to_string(),
        }
    }
}

/// Providers whose routes are placeholders: only the key is checked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    pub api_key: Option<ApiKey>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Upstream providers known to keyward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    Youtube,
    RemoveBg,
    ElevenLabs,
    EmailJs,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Gemini,
        Provider::Youtube,
        Provider::RemoveBg,
        Provider::ElevenLabs,
        Provider::EmailJs,
    ];

    /// Name used in config sections, logs and the health document.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Youtube => "youtube",
            Provider::RemoveBg => "remove_bg",
            Provider::ElevenLabs => "eleven_labs",
            Provider::EmailJs => "emailjs",
        }
    }

    /// Environment variable consulted when the config file carries no key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_FLASH_KEY",
            Provider::Youtube => "YOUTUBE_DATA_KEY",
            Provider::RemoveBg => "REMOVE_BG_KEY",
            Provider::ElevenLabs => "ELEVEN_LABS_KEY",
            Provider::EmailJs => "EMAILJS_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` keeps the key out of logs and error messages;
/// the raw value is only reachable via `.expose_secret()` (grep-auditable).
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How a provider's API key was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Key was a literal string in config (no ${} references)
    Literal,
    /// Key contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Key was read from the provider's conventional env var (holds var name)
    Convention(String),
    /// No key available; routes for this provider answer KEY_MISSING_OR_INVALID
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Convention(var) => write!(f, "env ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Invalid env reference '{var}' for provider '{provider}': {message}")]
    EnvVar {
        var: String,
        provider: String,
        message: String,
    },

    #[error("Environment variable '{var}' is not set (referenced in provider '{provider}')")]
    UnsetVar { var: String, provider: String },
}

impl Config {
    /// Load configuration from a TOML file, without touching the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file and resolve keys from the environment.
    ///
    /// Returns the config and per-provider key source information.
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Vec<(Provider, KeySource)>), ConfigError> {
        let mut config = Self::from_file(path)?;
        let key_sources = config.resolve_keys()?;
        Ok((config, key_sources))
    }

    /// Built-in defaults with keys taken from the conventional env vars.
    ///
    /// Used when no config file exists, which is the usual deployment shape.
    pub fn from_env() -> Result<(Self, Vec<(Provider, KeySource)>), ConfigError> {
        let mut config = Config::default();
        let key_sources = config.resolve_keys()?;
        Ok((config, key_sources))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.body_limit_bytes must be greater than zero".to_string(),
            ));
        }
        if self.server.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "server.timeout_secs must be greater than zero".to_string(),
            ));
        }

        let urls = [
            (Provider::Gemini, &self.gemini.base_url),
            (Provider::Youtube, &self.youtube.base_url),
            (Provider::RemoveBg, &self.remove_bg.base_url),
        ];
        for (provider, url) in urls {
            if url.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Provider '{}' has empty base_url",
                    provider
                )));
            }
        }

        if self.gemini.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "gemini.model must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The resolved key for a provider, if any.
    pub fn api_key(&self, provider: Provider) -> Option<&ApiKey> {
        match provider {
            Provider::Gemini => self.gemini.api_key.as_ref(),
            Provider::Youtube => self.youtube.api_key.as_ref(),
            Provider::RemoveBg => self.remove_bg.api_key.as_ref(),
            Provider::ElevenLabs => self.eleven_labs.api_key.as_ref(),
            Provider::EmailJs => self.emailjs.api_key.as_ref(),
        }
    }

    /// Upstream base URL for providers that make real calls.
    pub fn base_url(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Gemini => Some(&self.gemini.base_url),
            Provider::Youtube => Some(&self.youtube.base_url),
            Provider::RemoveBg => Some(&self.remove_bg.base_url),
            Provider::ElevenLabs | Provider::EmailJs => None,
        }
    }

    fn key_slot_mut(&mut self, provider: Provider) -> &mut Option<ApiKey> {
        match provider {
            Provider::Gemini => &mut self.gemini.api_key,
            Provider::Youtube => &mut self.youtube.api_key,
            Provider::RemoveBg => &mut self.remove_bg.api_key,
            Provider::ElevenLabs => &mut self.eleven_labs.api_key,
            Provider::EmailJs => &mut self.emailjs.api_key,
        }
    }

    /// Resolve every provider key against the real environment.
    pub fn resolve_keys(&mut self) -> Result<Vec<(Provider, KeySource)>, ConfigError> {
        self.resolve_keys_with(|name| std::env::var(name).ok())
    }

    /// Resolve every provider key using a custom lookup function.
    ///
    /// For each provider:
    /// - If `api_key` contains `${VAR}`: expand it, source = `EnvExpanded`.
    ///   An unset variable disables the provider with a warning; a malformed
    ///   reference is an error.
    /// - If `api_key` is a non-empty literal: keep it, source = `Literal`
    /// - Otherwise: read the provider's conventional env var,
    ///   source = `Convention(var_name)` or `KeySource::None`
    ///
    /// Blank values count as absent, so a key that expands to "" disables
    /// the provider instead of being sent upstream.
    pub fn resolve_keys_with<F>(
        &mut self,
        lookup: F,
    ) -> Result<Vec<(Provider, KeySource)>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut key_sources = Vec::with_capacity(Provider::ALL.len());

        for provider in Provider::ALL {
            let slot = self.key_slot_mut(provider);
            let (key, source) = match slot.take() {
                Some(raw) if raw.expose_secret().contains("${") => {
                    match expand_env_vars_with(raw.expose_secret(), provider.name(), &lookup) {
                        Ok(expanded) if !expanded.trim().is_empty() => {
                            (Some(ApiKey::from(expanded)), KeySource::EnvExpanded)
                        }
                        Ok(_) => {
                            tracing::warn!(
                                provider = %provider,
                                "api_key expanded to an empty value, provider disabled"
                            );
                            (None, KeySource::None)
                        }
                        Err(ConfigError::UnsetVar { var, .. }) => {
                            tracing::warn!(
                                provider = %provider,
                                var = %var,
                                "api_key references an unset environment variable, provider disabled"
                            );
                            (None, KeySource::None)
                        }
                        Err(e) => return Err(e),
                    }
                }
                Some(raw) if !raw.expose_secret().trim().is_empty() => {
                    (Some(raw), KeySource::Literal)
                }
                _ => match lookup(provider.env_var()).filter(|v| !v.trim().is_empty()) {
                    Some(value) => (
                        Some(ApiKey::from(value)),
                        KeySource::Convention(provider.env_var().to_string()),
                    ),
                    None => (None, KeySource::None),
                },
            };

            *slot = key;
            key_sources.push((provider, source));
        }

        Ok(key_sources)
    }
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string (e.g., `${PREFIX}-${SUFFIX}`).
/// Fails on first missing variable (`UnsetVar`), unclosed `${`, or empty
/// variable name (`EnvVar`).
fn expand_env_vars_with<F>(
    input: &str,
    provider_name: &str,
    lookup: F,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        // The message never echoes the input: it may hold part of a secret.
        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            provider: provider_name.to_string(),
            message: "Unclosed '${' in api_key".to_string(),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                provider: provider_name.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::UnsetVar {
            var: var_name.to_string(),
            provider: provider_name.to_string(),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}
