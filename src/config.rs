//! Server configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! Read once in `main` and shared through `AppState`. Every value has a
//! default so a bare `cargo run` serves against a backend on localhost.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_SITE_DIR: &str = "site";
pub const DEFAULT_SIGNIN_PATH: &str = "/signin";
pub const DEFAULT_PROTECTED_PATHS: &[&str] = &["/playlists", "/play-song", "/match"];
pub const DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Base URL of the external music/matching backend, without trailing `/`.
    pub backend_url: String,
    /// Origin used to rebuild the requested URL for `callbackUrl`.
    /// Falls back to `http://<Host>` when unset.
    pub public_origin: Option<String>,
    pub cookie_secure: bool,
    pub site_dir: PathBuf,
    pub protected_paths: Vec<String>,
    pub signin_path: String,
    pub backend_timeouts: BackendTimeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend_url: DEFAULT_BACKEND_URL.to_owned(),
            public_origin: None,
            cookie_secure: false,
            site_dir: PathBuf::from(DEFAULT_SITE_DIR),
            protected_paths: DEFAULT_PROTECTED_PATHS.iter().map(|p| (*p).to_owned()).collect(),
            signin_path: DEFAULT_SIGNIN_PATH.to_owned(),
            backend_timeouts: BackendTimeouts {
                request_secs: DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// - `PORT`: default 3000
    /// - `BACKEND_URL`: default `http://localhost:8000`
    /// - `PUBLIC_ORIGIN`: e.g. `https://tunematch.example`
    /// - `COOKIE_SECURE`: boolean word, default false
    /// - `SITE_DIR`: static page directory, default `site`
    /// - `PROTECTED_PATHS`: comma-separated prefixes
    /// - `SIGNIN_PATH`: default `/signin`
    /// - `BACKEND_REQUEST_TIMEOUT_SECS` / `BACKEND_CONNECT_TIMEOUT_SECS`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend_url = std::env::var("BACKEND_URL")
            .map(|raw| normalize_base_url(&raw))
            .unwrap_or(defaults.backend_url);
        let public_origin = std::env::var("PUBLIC_ORIGIN")
            .ok()
            .map(|raw| normalize_base_url(&raw))
            .filter(|origin| !origin.is_empty());
        let protected_paths = std::env::var("PROTECTED_PATHS")
            .ok()
            .map(|raw| parse_path_list(&raw))
            .filter(|paths| !paths.is_empty())
            .unwrap_or(defaults.protected_paths);

        Self {
            port: env_parse("PORT", defaults.port),
            backend_url,
            public_origin,
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(defaults.cookie_secure),
            site_dir: std::env::var("SITE_DIR").map(PathBuf::from).unwrap_or(defaults.site_dir),
            protected_paths,
            signin_path: std::env::var("SIGNIN_PATH").unwrap_or(defaults.signin_path),
            backend_timeouts: BackendTimeouts {
                request_secs: env_parse("BACKEND_REQUEST_TIMEOUT_SECS", DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("BACKEND_CONNECT_TIMEOUT_SECS", DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS),
            },
        }
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|raw| parse_bool(&raw))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

/// Split a comma-separated prefix list, dropping blanks and trailing slashes.
fn parse_path_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let trimmed = p.trim_end_matches('/');
            if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() }
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
