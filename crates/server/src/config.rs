use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context};
use crm_api::DEFAULT_EVENT_BUFFER;
use serde::Deserialize;
use storage::RemoteSettings;

/// Where records live: a local SQLite file or the hosted table API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Sqlite,
    Remote,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "remote" | "hosted" => Ok(Backend::Remote),
            other => bail!("unknown backend '{other}'; expected 'sqlite' or 'remote'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub backend: Backend,
    pub database_url: String,
    pub remote_base_url: Option<String>,
    pub remote_project_id: Option<String>,
    pub remote_public_key: Option<String>,
    pub event_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            backend: Backend::Sqlite,
            database_url: "sqlite://./data/crm.db".into(),
            remote_base_url: None,
            remote_project_id: None,
            remote_public_key: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl Settings {
    /// Connection details for the hosted backend; base url and project id are
    /// required, the public key may be blank.
    pub fn remote(&self) -> anyhow::Result<RemoteSettings> {
        let Some(base_url) = self.remote_base_url.clone() else {
            bail!("remote backend selected but APP__REMOTE_BASE_URL is not set");
        };
        let Some(project_id) = self.remote_project_id.clone() else {
            bail!("remote backend selected but APP__REMOTE_PROJECT_ID is not set");
        };
        Ok(RemoteSettings {
            base_url,
            project_id,
            public_key: self.remote_public_key.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    backend: Option<String>,
    database_url: Option<String>,
    remote_base_url: Option<String>,
    remote_project_id: Option<String>,
    remote_public_key: Option<String>,
    event_buffer: Option<usize>,
}

/// Defaults, then `server.toml`, then environment overrides.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            tracing::warn!(%error, "ignoring unreadable server.toml");
            return;
        }
    };

    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.backend {
        set_backend(settings, &v);
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if file_cfg.remote_base_url.is_some() {
        settings.remote_base_url = file_cfg.remote_base_url;
    }
    if file_cfg.remote_project_id.is_some() {
        settings.remote_project_id = file_cfg.remote_project_id;
    }
    if file_cfg.remote_public_key.is_some() {
        settings.remote_public_key = file_cfg.remote_public_key;
    }
    if let Some(v) = file_cfg.event_buffer {
        settings.event_buffer = v.max(1);
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("APP__BACKEND") {
        set_backend(settings, &v);
    }
    if let Some(v) = var("APP__REMOTE_BASE_URL") {
        settings.remote_base_url = Some(v);
    }
    if let Some(v) = var("APP__REMOTE_PROJECT_ID") {
        settings.remote_project_id = Some(v);
    }
    if let Some(v) = var("APP__REMOTE_PUBLIC_KEY") {
        settings.remote_public_key = Some(v);
    }

    if let Some(v) = var("APP__EVENT_BUFFER") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.event_buffer = parsed.max(1);
        }
    }
}

fn set_backend(settings: &mut Settings, raw: &str) {
    match raw.parse() {
        Ok(backend) => settings.backend = backend,
        Err(error) => tracing::warn!(%error, "keeping {:?} backend", settings.backend),
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
