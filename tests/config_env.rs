// tests/config_env.rs
use article_rater::config::{AppConfig, ENV_CONFIG_PATH, ENV_PREFERENCES_PATH};
use std::{env, fs, path::PathBuf};

#[serial_test::serial]
#[test]
fn env_paths_take_precedence() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg_path = tmp.path().join("rater.toml");
    fs::write(
        &cfg_path,
        r#"
preferences_path = "from_file.json"

[ai]
enabled = true
provider = "mock"
"#,
    )
    .unwrap();

    env::set_var(ENV_CONFIG_PATH, cfg_path.display().to_string());
    env::remove_var(ENV_PREFERENCES_PATH);
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.preferences_path, PathBuf::from("from_file.json"));
    assert_eq!(cfg.ai.provider, "mock");

    env::set_var(ENV_PREFERENCES_PATH, "/tmp/override.json");
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.preferences_path, PathBuf::from("/tmp/override.json"));

    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_PREFERENCES_PATH);
}

#[serial_test::serial]
#[test]
fn missing_config_file_falls_back_to_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("absent.toml").display().to_string());
    env::remove_var(ENV_PREFERENCES_PATH);
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.preferences_path, PathBuf::from("user_preferences.json"));
    assert!(!cfg.ai.enabled);
    env::remove_var(ENV_CONFIG_PATH);
}

#[serial_test::serial]
#[test]
fn enabled_openai_without_key_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg_path = tmp.path().join("rater.toml");
    fs::write(&cfg_path, "[ai]\nenabled = true\nprovider = \"openai\"\napi_key = \"ENV\"\n").unwrap();
    let saved = env::var("OPENAI_API_KEY").ok();
    env::remove_var("OPENAI_API_KEY");

    assert!(AppConfig::load_from_file(&cfg_path).is_err());

    if let Some(k) = saved {
        env::set_var("OPENAI_API_KEY", k);
    }
}
