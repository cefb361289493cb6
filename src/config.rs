//! Server configuration, read from environment variables at startup.

use std::path::PathBuf;

use crate::service::DEFAULT_RETENTION_DAYS;

/// Google's ID-token introspection endpoint.
pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite database file. Created (with parent directories) on first run.
    pub database_path: PathBuf,
    /// When true, all auth checks are skipped and a dev actor is injected.
    pub dev_mode: bool,
    /// Days a done task may sit untouched before the sweep archives it.
    pub retention_days: i64,
    /// Exact allowed CORS origin; permissive when unset.
    pub cors_origin: Option<String>,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client id; token audience must match.
    pub google_client_id: String,
    /// Emails allowed through after token verification.
    pub allowed_emails: Vec<String>,
    /// Shared key for service-account access via `X-API-Key`.
    pub api_key: Option<String>,
    /// Actor identity attributed to API-key requests.
    pub service_email: String,
    /// Token introspection endpoint; overridable for tests.
    pub tokeninfo_url: String,
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// - `HOST` (default `0.0.0.0`), `PORT` (default `3001`)
    /// - `DATABASE_PATH` (default `taskboard.db`)
    /// - `DEV_MODE` (`1`/`true` disables auth)
    /// - `ARCHIVE_RETENTION_DAYS` (default `7`)
    /// - `CORS_ORIGIN`
    /// - `GOOGLE_CLIENT_ID`, `ALLOWED_EMAILS` (comma-separated), `API_KEY`,
    ///   `API_SERVICE_EMAIL`, `TOKENINFO_URL`
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            database_path: PathBuf::from(env_or("DATABASE_PATH", "taskboard.db")),
            dev_mode: env_flag("DEV_MODE"),
            retention_days: std::env::var("ARCHIVE_RETENTION_DAYS")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|o| !o.is_empty()),
            auth: AuthConfig {
                google_client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
                allowed_emails: parse_email_list(
                    &std::env::var("ALLOWED_EMAILS").unwrap_or_default(),
                ),
                api_key: std::env::var("API_KEY").ok().filter(|k| !k.is_empty()),
                service_email: env_or("API_SERVICE_EMAIL", "service@localhost"),
                tokeninfo_url: env_or("TOKENINFO_URL", DEFAULT_TOKENINFO_URL),
            },
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("True")
    )
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}
