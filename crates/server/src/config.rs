use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use toml::{Table, Value};

pub const DEFAULT_SESSION_SECRET: &str = "dev-session-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub session_secret: String,
    pub session_ttl_seconds: i64,
    pub login_path: String,
    /// Second mount point for the dispatcher, e.g. an old page path that
    /// bookmarks still point at.
    pub legacy_mount_path: Option<String>,
    pub cookie_secure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/police_tablet.db".into(),
            session_secret: DEFAULT_SESSION_SECRET.into(),
            session_ttl_seconds: 8 * 3600,
            login_path: "/login".into(),
            legacy_mount_path: None,
            cookie_secure: false,
        }
    }
}

/// Paths the router always serves itself.
const RESERVED_PATHS: &[&str] = &["/", "/logout", "/healthz"];

impl Settings {
    /// Configured mount points must not overlap each other or the built-in
    /// routes.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_route_path("login_path", &self.login_path)?;
        if let Some(legacy) = self.legacy_mount_path.as_deref() {
            check_route_path("legacy_mount_path", legacy)?;
            if legacy == self.login_path {
                bail!("legacy_mount_path `{legacy}` is already used as the login path");
            }
        }
        Ok(())
    }
}

fn check_route_path(name: &str, path: &str) -> anyhow::Result<()> {
    if RESERVED_PATHS.contains(&path) {
        bail!("{name} `{path}` collides with a built-in route");
    }
    if path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        bail!("{name} `{path}` must not contain route parameters");
    }
    Ok(())
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    settings
}

/// `server.toml` is a flat table. Numbers and booleans may also be given
/// as strings, matching the environment variables.
pub fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<Table>(raw) else {
        return;
    };
    let text = |key: &str| file_cfg.get(key).and_then(Value::as_str);

    if let Some(v) = text("bind_addr") {
        settings.server_bind = v.to_string();
    }
    if let Some(v) = text("database_url") {
        settings.database_url = v.to_string();
    }
    if let Some(v) = text("session_secret") {
        settings.session_secret = v.to_string();
    }
    if let Some(v) = file_cfg.get("session_ttl_seconds").and_then(|v| {
        v.as_integer()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    }) {
        settings.session_ttl_seconds = v;
    }
    if let Some(v) = text("login_path") {
        settings.login_path = login_path(v);
    }
    if let Some(v) = text("legacy_mount_path") {
        settings.legacy_mount_path = mount_path(v);
    }
    if let Some(v) = file_cfg
        .get("cookie_secure")
        .and_then(|v| v.as_bool().or_else(|| v.as_str().map(truthy)))
    {
        settings.cookie_secure = v;
    }
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = lookup("APP__SESSION_SECRET") {
        settings.session_secret = v;
    }
    if let Some(v) = lookup("APP__SESSION_TTL_SECONDS") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.session_ttl_seconds = parsed;
        }
    }

    if let Some(v) = lookup("APP__LOGIN_PATH") {
        settings.login_path = login_path(&v);
    }
    if let Some(v) = lookup("APP__LEGACY_MOUNT_PATH") {
        settings.legacy_mount_path = mount_path(&v);
    }
    if let Some(v) = lookup("APP__COOKIE_SECURE") {
        settings.cookie_secure = truthy(&v);
    }
}

fn truthy(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "yes")
}

fn login_path(raw: &str) -> String {
    mount_path(raw).unwrap_or_else(|| Settings::default().login_path)
}

fn mount_path(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "/" {
        return None;
    }
    if raw.starts_with('/') {
        Some(raw.to_string())
    } else {
        Some(format!("/{raw}"))
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
