use std::fs;
use std::path::PathBuf;

use cataloguer::config::{Config, ConfigError, ConfigOverrides};
use cataloguer::naming::Template;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Build the figment by hand so the environment cannot interfere
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config = Config::from_figment(&figment).unwrap();

    assert!(config.format_pattern.is_none());
    assert!(!config.follow_symlinks);
    assert!(config.storage_location.ends_with(".catalogues"));
    assert!(!config.storage_location.starts_with("~"));
}

#[test]
fn test_config_load_from_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
format_pattern = "%Y/%m/{media_type}/{file}"
unknown_format_pattern = "unknown/{relative_path}/{file}"
storage_location = "/srv/catalogues"
skip_hidden = true
"#,
    )
    .unwrap();

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&path));
    let config = Config::from_figment(&figment).unwrap();

    assert_eq!(
        config.format_pattern.unwrap().as_str(),
        "%Y/%m/{media_type}/{file}"
    );
    assert_eq!(
        config.unknown_format_pattern.unwrap().as_str(),
        "unknown/{relative_path}/{file}"
    );
    assert_eq!(config.storage_location, PathBuf::from("/srv/catalogues"));
    assert!(config.skip_hidden);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("CATALOGUER_UNKNOWN_FORMAT_PATTERN", "undated/{file}");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("CATALOGUER_").only(&["unknown_format_pattern"]));
    let config = Config::from_figment(&figment).unwrap();

    assert_eq!(
        config.unknown_format_pattern.unwrap().as_str(),
        "undated/{file}"
    );

    std::env::remove_var("CATALOGUER_UNKNOWN_FORMAT_PATTERN");
}

#[test]
fn test_cli_overrides_win() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "format_pattern = \"%Y/{file}\"\n").unwrap();
    let overrides = ConfigOverrides {
        format_pattern: Some(Template::parse("%Y/%m/{file}").unwrap()),
        storage_location: Some(dir.path().join("store")),
        ..ConfigOverrides::default()
    };

    let config = Config::load(Some(&path), &overrides).unwrap();

    assert_eq!(config.format_pattern.unwrap().as_str(), "%Y/%m/{file}");
    assert_eq!(config.storage_location, dir.path().join("store"));
}

#[test]
fn test_unknown_key_suggests_fix() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "format_patern = \"%Y/{file}\"\n").unwrap();

    let err = Config::load(Some(&path), &ConfigOverrides::default()).unwrap_err();

    match err {
        ConfigError::UnknownKey { key, suggestion } => {
            assert_eq!(key, "format_patern");
            assert_eq!(suggestion, Some("format_pattern"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_template_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "format_pattern = \"%Y/{flie}\"\n").unwrap();

    let err = Config::load(Some(&path), &ConfigOverrides::default()).unwrap_err();

    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("file"));
}

#[test]
fn test_missing_explicit_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = Config::load(Some(&path), &ConfigOverrides::default()).unwrap_err();

    assert!(matches!(err, ConfigError::MissingFile(_)));
}
