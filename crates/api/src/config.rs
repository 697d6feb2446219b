//! Startup configuration, read once from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use backoffice_auth::{PathPrefixes, Role, RoleRule};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SESSION_SECRET must be set to a non-empty value")]
    MissingSecret,

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    session_secret: String,
    pub auth_base_url: String,
    pub public_paths: PathPrefixes,
    pub protected_paths: PathPrefixes,
    pub role_rules: Vec<RoleRule>,
    pub auth_http_timeout: Duration,
    pub sign_out_timeout: Duration,
    pub session_max_age: Duration,
    pub secure_cookies: bool,
    pub bind_addr: SocketAddr,
    pub login_path: String,
    pub home_path: String,
}

// Hand-written so the secret never reaches a log line.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("session_secret", &"<redacted>")
            .field("auth_base_url", &self.auth_base_url)
            .field("public_paths", &self.public_paths)
            .field("protected_paths", &self.protected_paths)
            .field("role_rules", &self.role_rules)
            .field("auth_http_timeout", &self.auth_http_timeout)
            .field("sign_out_timeout", &self.sign_out_timeout)
            .field("session_max_age", &self.session_max_age)
            .field("secure_cookies", &self.secure_cookies)
            .field("bind_addr", &self.bind_addr)
            .field("login_path", &self.login_path)
            .field("home_path", &self.home_path)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let session_secret = get("SESSION_SECRET").ok_or(ConfigError::MissingSecret)?;

        let auth_base_url = get("AUTH_BASE_URL")
            .unwrap_or_else(|| "http://localhost:4000/api/auth".to_string());
        if !(auth_base_url.starts_with("http://") || auth_base_url.starts_with("https://")) {
            return Err(ConfigError::invalid("AUTH_BASE_URL", "must be an http(s) URL"));
        }

        let public_paths = PathPrefixes::new(split_list(
            &get("PUBLIC_PATHS").unwrap_or_else(|| "/login,/auth/register,/api/auth".to_string()),
        ));
        let protected_paths = PathPrefixes::new(split_list(
            &get("PROTECTED_PATHS").unwrap_or_else(|| "/dashboard,/admin,/protected".to_string()),
        ));
        let role_rules = parse_role_rules(&get("ROLE_RULES").unwrap_or_else(|| "/admin=admin".to_string()))?;

        let auth_http_timeout = Duration::from_millis(parse_num(&get, "AUTH_HTTP_TIMEOUT_MS", 10_000)?);
        let sign_out_timeout = Duration::from_millis(parse_num(&get, "SIGN_OUT_TIMEOUT_MS", 3_000)?);
        let session_max_age = Duration::from_secs(parse_num(&get, "SESSION_MAX_AGE_SECS", 2_592_000)?);
        if session_max_age.is_zero() {
            return Err(ConfigError::invalid("SESSION_MAX_AGE_SECS", "must be positive"));
        }

        let secure_cookies = match get("SECURE_COOKIES").as_deref() {
            None => true,
            Some("1" | "true" | "yes") => true,
            Some("0" | "false" | "no") => false,
            Some(other) => {
                return Err(ConfigError::invalid("SECURE_COOKIES", format!("expected a boolean, got {other:?}")));
            }
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", format!("{e}")))?;

        let login_path = get("LOGIN_PATH").unwrap_or_else(|| "/login".to_string());
        let home_path = get("HOME_PATH").unwrap_or_else(|| "/".to_string());
        for (key, path) in [("LOGIN_PATH", &login_path), ("HOME_PATH", &home_path)] {
            if !path.starts_with('/') {
                return Err(ConfigError::invalid(key, "must start with '/'"));
            }
        }

        Ok(Self {
            session_secret,
            auth_base_url,
            public_paths,
            protected_paths,
            role_rules,
            auth_http_timeout,
            sign_out_timeout,
            session_max_age,
            secure_cookies,
            bind_addr,
            login_path,
            home_path,
        })
    }

    pub fn session_secret(&self) -> &[u8] {
        self.session_secret.as_bytes()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_role_rules(raw: &str) -> Result<Vec<RoleRule>, ConfigError> {
    split_list(raw)
        .into_iter()
        .map(|entry| {
            let (prefix, role) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::invalid("ROLE_RULES", format!("expected prefix=role, got {entry:?}")))?;
            let role = role.trim();
            if role.is_empty() {
                return Err(ConfigError::invalid("ROLE_RULES", format!("empty role in {entry:?}")));
            }
            RoleRule::new(prefix.trim(), Role::new(role.to_string()))
                .ok_or_else(|| ConfigError::invalid("ROLE_RULES", format!("empty prefix in {entry:?}")))
        })
        .collect()
}

fn parse_num<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::invalid(key, format!("expected a non-negative integer, got {raw:?}"))),
    }
}
