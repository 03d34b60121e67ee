use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::composer::ComposerOptions;
use crate::content::DEFAULT_BASE_URL;
use crate::directory::BadgePolicy;

const DEFAULT_ENV_PREFIX: &str = "LIBER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub badges: BadgeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("liber-console/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    #[serde(default = "default_channel")]
    pub default_channel: String,
    #[serde(default = "default_author")]
    pub default_author: String,
    #[serde(default = "default_tags")]
    pub default_tags: String,
    #[serde(default)]
    pub clear_tags_on_post: bool,
    #[serde(default = "default_guard_in_flight")]
    pub guard_in_flight: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            default_channel: default_channel(),
            default_author: default_author(),
            default_tags: default_tags(),
            clear_tags_on_post: false,
            guard_in_flight: default_guard_in_flight(),
        }
    }
}

impl ConsoleConfig {
    pub fn composer_options(&self) -> ComposerOptions {
        ComposerOptions {
            clear_tags_on_post: self.clear_tags_on_post,
            guard_in_flight: self.guard_in_flight,
        }
    }
}

fn default_channel() -> String {
    "mission-planning".into()
}

fn default_author() -> String {
    "Staff".into()
}

fn default_tags() -> String {
    "mission, canon, npc".into()
}

fn default_guard_in_flight() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BadgeConfig {
    #[serde(default = "default_public_channels")]
    pub public: Vec<String>,
    #[serde(default = "default_head_channels")]
    pub head_channels: Vec<String>,
    #[serde(default)]
    pub head_categories: Vec<String>,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        let policy = BadgePolicy::default();
        Self {
            public: policy.public,
            head_channels: policy.head_channels,
            head_categories: policy.head_categories,
        }
    }
}

impl BadgeConfig {
    pub fn policy(&self) -> BadgePolicy {
        BadgePolicy {
            public: self.public.clone(),
            head_channels: self.head_channels.clone(),
            head_categories: self.head_categories.clone(),
        }
    }
}

fn default_public_channels() -> Vec<String> {
    BadgePolicy::default().public
}

fn default_head_channels() -> Vec<String> {
    BadgePolicy::default().head_channels
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("liber-console").join("liber-console.log"))
}

fn default_log_filter() -> String {
    "liber_console=info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = apply_env(cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.content.base_url.trim().is_empty() {
        base.content.base_url = other.content.base_url;
    }
    if !other.content.user_agent.trim().is_empty() {
        base.content.user_agent = other.content.user_agent;
    }

    if !other.console.default_channel.trim().is_empty() {
        base.console.default_channel = other.console.default_channel;
    }
    if !other.console.default_author.is_empty() {
        base.console.default_author = other.console.default_author;
    }
    base.console.default_tags = other.console.default_tags;
    base.console.clear_tags_on_post = other.console.clear_tags_on_post;
    base.console.guard_in_flight = other.console.guard_in_flight;

    base.badges = other.badges;

    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }
    if !other.log.filter.trim().is_empty() {
        base.log.filter = other.log.filter;
    }

    base
}

/// Environment overrides win over the file. Only variables that are present
/// touch the config.
fn apply_env(mut cfg: Config, prefix: &str) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    cfg
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "content.base_url" => cfg.content.base_url = value,
        "content.user_agent" => cfg.content.user_agent = value,
        "console.default_channel" => cfg.console.default_channel = value,
        "console.default_author" => cfg.console.default_author = value,
        "console.default_tags" => cfg.console.default_tags = value,
        "console.clear_tags_on_post" => cfg.console.clear_tags_on_post = truthy(&value),
        "console.guard_in_flight" => cfg.console.guard_in_flight = truthy(&value),
        "badges.public" => cfg.badges.public = split_list(&value),
        "badges.head_channels" => cfg.badges.head_channels = split_list(&value),
        "badges.head_categories" => cfg.badges.head_categories = split_list(&value),
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        "log.filter" => cfg.log.filter = value,
        _ => {}
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("liber-console").join("config.yaml"))
}
