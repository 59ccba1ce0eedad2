use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn blank_database_url_falls_back_to_default() {
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn creates_parent_dir_for_sqlite_path() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("crm_server_test_{suffix}"));
    let db_path = temp_root.join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.join("data").exists());

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("crm_server_open_test_{suffix}"));
    let db_path = temp_root.join("nested").join("crm.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn file_settings_select_remote_backend() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
bind_addr = "0.0.0.0:9000"
backend = "remote"
remote_base_url = "https://records.example.test/api/"
remote_project_id = "crm-prod"
event_buffer = 64
"#,
    );

    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.backend, Backend::Remote);
    assert_eq!(settings.event_buffer, 64);
    let remote = settings.remote().expect("remote settings");
    assert_eq!(remote.project_id, "crm-prod");
    assert_eq!(remote.public_key, "");
}

#[test]
fn unreadable_file_keeps_defaults() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "bind_addr = [");
    assert_eq!(settings.server_bind, Settings::default().server_bind);
}

#[test]
fn app_prefixed_env_wins_over_plain_names() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("SERVER_BIND", "127.0.0.1:1"),
            ("APP__BIND_ADDR", "127.0.0.1:2"),
            ("DATABASE_URL", "sqlite://./a.db"),
            ("APP__DATABASE_URL", "sqlite://./b.db"),
            ("APP__EVENT_BUFFER", "0"),
        ]),
    );

    assert_eq!(settings.server_bind, "127.0.0.1:2");
    assert_eq!(settings.database_url, "sqlite://./b.db");
    assert_eq!(settings.event_buffer, 1);
}

#[test]
fn unknown_backend_name_is_ignored() {
    let mut settings = Settings::default();
    apply_env(&mut settings, env_from(&[("APP__BACKEND", "postgres")]));
    assert_eq!(settings.backend, Backend::Sqlite);
}

#[test]
fn remote_backend_requires_base_url_and_project() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("APP__BACKEND", "Remote"),
            ("APP__REMOTE_BASE_URL", "https://records.example.test/"),
        ]),
    );
    assert_eq!(settings.backend, Backend::Remote);
    let err = settings.remote().expect_err("project id missing");
    assert!(err.to_string().contains("APP__REMOTE_PROJECT_ID"));
}
