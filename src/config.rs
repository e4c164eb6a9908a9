use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::log::warn;

/// Development fallbacks, a real deployment must override these.
const DEFAULT_USERNAME: &str = "@CallRelayUser";
const DEFAULT_PHONE_NUMBER: &str = "+440000000000";

const PHONE_MASK: &str = "****";
const PHONE_VISIBLE_CHARS: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub caller: CallerConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub http: HTTPConfig,

    #[serde(default = "default_false")]
    pub auto_call_on_start: bool,
}
impl AppConfig {
    /// Reads the optional TOML file, then applies environment overrides on top.
    pub fn load(config_filepath: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_filepath {
            Some(config_path) => {
                let config_content = fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

                toml::from_str::<AppConfig>(&config_content)
                    .with_context(|| format!("Failed to parse TOML config file: {config_path:?}"))?
            }
            None => AppConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.warn_development_defaults();
        Ok(config)
    }

    /// Overrides fields from named variables, `lookup` returns None for unset ones.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup("TELEGRAM_USERNAME") {
            self.caller.username = username;
        }
        if let Some(phone_number) = lookup("PHONE_NUMBER") {
            self.caller.phone_number = phone_number;
        }
        if let Some(message) = lookup("CALL_MESSAGE") {
            self.caller.message = message;
        }
        if let Some(voice_lang) = lookup("VOICE_LANG") {
            self.caller.voice_lang = voice_lang;
        }
        if let Some(repeat_count) = lookup("REPEAT_COUNT") {
            self.caller.repeat_count = parse_env("REPEAT_COUNT", &repeat_count)?;
        }
        if let Some(provider_url) = lookup("CALLMEBOT_URL") {
            self.caller.provider_url = provider_url;
        }
        if let Some(timeout_secs) = lookup("CALL_TIMEOUT_SECS") {
            self.caller.timeout_secs = Some(parse_env("CALL_TIMEOUT_SECS", &timeout_secs)?);
        }

        if let Some(api_key) = lookup("GROQ_API_KEY") {
            self.generation.api_key = Some(api_key);
        }
        if let Some(model) = lookup("GROQ_MODEL") {
            self.generation.model = model;
        }
        if let Some(api_url) = lookup("GROQ_API_URL") {
            self.generation.api_url = api_url;
        }

        // Empty keys are treated as missing, which disables generation.
        if self
            .generation
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            self.generation.api_key = None;
        }

        if let Some(port) = lookup("PORT") {
            self.http.address.set_port(parse_env("PORT", &port)?);
        }
        if let Some(failure_status) = lookup("HTTP_FAILURE_STATUS") {
            self.http.failure_status = failure_status == "true";
        }
        if let Some(token) = lookup("CALL_RELAY_HTTP_AUTH_TOKEN") {
            self.http.auth_token = Some(token).filter(|token| !token.is_empty());
        }

        if let Some(auto_call) = lookup("AUTO_CALL_ON_START") {
            self.auto_call_on_start = auto_call == "true";
        }

        Ok(())
    }

    fn warn_development_defaults(&self) {
        if self.caller.username == DEFAULT_USERNAME {
            warn!("TELEGRAM_USERNAME is not set, using development default {DEFAULT_USERNAME}!");
        }
        if self.caller.phone_number == DEFAULT_PHONE_NUMBER {
            warn!("PHONE_NUMBER is not set, using development default!");
        }
        if self.generation.api_key.is_none() {
            warn!("GROQ_API_KEY is not set, AI message generation is disabled!");
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallerConfig {
    /// Telegram handle registered with CallMeBot, not a phone number.
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_phone_number")]
    pub phone_number: String,

    #[serde(default = "default_call_message")]
    pub message: String,

    #[serde(default = "default_voice_lang")]
    pub voice_lang: String,

    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,

    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Outbound request timeout, the client default applies when unset or zero.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}
impl CallerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            phone_number: default_phone_number(),
            message: default_call_message(),
            voice_lang: default_voice_lang(),
            repeat_count: default_repeat_count(),
            provider_url: default_provider_url(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_generation_api_url")]
    pub api_url: String,
}
impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_generation_model(),
            api_url: default_generation_api_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HTTPConfig {
    #[serde(default = "default_http_address")]
    pub address: SocketAddr,

    /// Respond 502 instead of 200 when a call could not be placed.
    #[serde(default = "default_false")]
    pub failure_status: bool,

    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default)]
    pub tls: Option<TLSConfig>,
}
impl Default for HTTPConfig {
    fn default() -> Self {
        Self {
            address: default_http_address(),
            failure_status: default_false(),
            auth_token: None,
            tls: None,
        }
    }
}

#[cfg_attr(
    not(any(feature = "tls-rustls", feature = "tls-native")),
    allow(dead_code)
)]
#[derive(Debug, Clone, Deserialize)]
pub struct TLSConfig {
    #[serde(deserialize_with = "deserialize_existing_file")]
    pub certificate_path: PathBuf,

    #[serde(deserialize_with = "deserialize_existing_file")]
    pub key_path: PathBuf,
}

/// Keeps the first 8 characters, or half of a shorter number, then appends a fixed mask.
pub fn mask_phone_number(phone_number: &str) -> String {
    let length = phone_number.chars().count();
    let visible = if length > PHONE_VISIBLE_CHARS {
        PHONE_VISIBLE_CHARS
    } else {
        length / 2
    };

    let mut masked: String = phone_number.chars().take(visible).collect();
    masked.push_str(PHONE_MASK);
    masked
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("Invalid value for {name} environment variable: {value:?}"))
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}
fn default_phone_number() -> String {
    DEFAULT_PHONE_NUMBER.to_string()
}
fn default_call_message() -> String {
    "Hey! Your AI assistant is calling to check in on you. How are things going?".to_string()
}
fn default_voice_lang() -> String {
    "en-GB-Standard-B".to_string()
}
fn default_repeat_count() -> u32 {
    2
}
fn default_provider_url() -> String {
    "http://api.callmebot.com/start.php".to_string()
}
fn default_generation_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_generation_api_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}
fn default_false() -> bool {
    false
}

fn default_http_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3000)
}

fn deserialize_existing_file<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    if !path.is_file() {
        return Err(serde::de::Error::custom(format!(
            "File does not exist or is not a file: {}",
            path.display()
        )));
    }
    Ok(path)
}
