use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

pub const SETTINGS_FILE_NAME: &str = ".gitlab-code-search.toml";

const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";
const DEFAULT_MAX_PAGE_DEPTH: u32 = 1000;

/// Shape of the settings file. Every field is optional so a file written by
/// `setup-token` alone still parses.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gitlab_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_page_depth: Option<u32>,
}

/// Resolved configuration for one invocation: the settings file overridden by
/// environment variables, with the token validated up front.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base address of the GitLab instance, without a trailing slash.
    pub gitlab_url: String,

    /// Private token sent with every request.
    pub private_token: String,

    /// Upper bound on pages fetched per paginated call.
    pub max_page_depth: u32,
}

impl Settings {
    /// Load and validate settings.
    ///
    /// A missing token is a configuration error and is reported before any
    /// request is made.
    pub fn load() -> Result<Self, SearchError> {
        let stored = read_stored(&settings_path())?;
        resolve(
            stored,
            env_var("GITLAB_URL"),
            env_var("GITLAB_PRIVATE_TOKEN"),
            env_var("MAX_PAGE_DEPTH"),
        )
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn resolve(
    stored: StoredSettings,
    env_url: Option<String>,
    env_token: Option<String>,
    env_depth: Option<String>,
) -> Result<Settings, SearchError> {
    let gitlab_url = env_url
        .or(stored.gitlab_url)
        .unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string());

    let private_token = env_token
        .or(stored.private_token)
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| SearchError::Config("You must register your token.".to_string()))?;

    let max_page_depth = match env_depth {
        Some(raw) => raw
            .parse()
            .map_err(|_| SearchError::Config(format!("invalid MAX_PAGE_DEPTH '{raw}'")))?,
        None => stored.max_page_depth.unwrap_or(DEFAULT_MAX_PAGE_DEPTH),
    };

    Ok(Settings {
        gitlab_url: gitlab_url.trim_end_matches('/').to_string(),
        private_token,
        max_page_depth,
    })
}

fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SETTINGS_FILE_NAME)
}

fn read_stored(path: &Path) -> Result<StoredSettings, SearchError> {
    if !path.exists() {
        return Ok(StoredSettings::default());
    }
    Ok(toml::from_str(&fs::read_to_string(path)?)?)
}

fn update_stored(
    path: &Path,
    apply: impl FnOnce(&mut StoredSettings),
) -> Result<(), SearchError> {
    let mut stored = read_stored(path)?;
    apply(&mut stored);
    fs::write(path, toml::to_string_pretty(&stored)?)?;
    Ok(())
}

/// Persist the private token in the settings file, keeping other keys.
pub fn store_token(token: &str) -> Result<(), SearchError> {
    store_token_at(&settings_path(), token)
}

/// Persist the GitLab address in the settings file, keeping other keys.
pub fn store_gitlab_url(address: &str) -> Result<(), SearchError> {
    store_gitlab_url_at(&settings_path(), address)
}

fn store_token_at(path: &Path, token: &str) -> Result<(), SearchError> {
    update_stored(path, |stored| stored.private_token = Some(token.to_string()))
}

fn store_gitlab_url_at(path: &Path, address: &str) -> Result<(), SearchError> {
    update_stored(path, |stored| stored.gitlab_url = Some(address.to_string()))
}
