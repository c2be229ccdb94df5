use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use toko_backup::config::{Config, ConfigLoader, ConfigOverrides};
use toko_backup::delay::Pacing;
use toko_backup::domain::Coordinate;
use toko_backup::error::BackupError;

#[test]
fn parse_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("toko-backup.json");
    std::fs::write(
        &path,
        r#"{
            "input": "lists/bandung.txt",
            "smoke_test_code": " t001 ",
            "latitude": -6.2,
            "longitude": 106.8,
            "timeout_secs": 5,
            "pacing_min_ms": 2000,
            "pacing_max_ms": 4000
        }"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(Some(path.to_str().unwrap()), ConfigOverrides::default()).unwrap();
    assert_eq!(resolved.input, Utf8PathBuf::from("lists/bandung.txt"));
    assert_eq!(resolved.snapshot, Utf8PathBuf::from("toko.json"));
    assert_eq!(resolved.smoke_test_code, "T001");
    assert_eq!(resolved.coordinate, Coordinate::new(-6.2, 106.8));
    assert_eq!(resolved.timeout, Duration::from_secs(5));
    assert_eq!(resolved.pacing, Pacing::new(2000, 4000));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap()), ConfigOverrides::default())
        .unwrap_err();
    assert_matches!(err, BackupError::MissingConfig(_));
}

#[test]
fn unknown_keys_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("toko-backup.json");
    std::fs::write(&path, r#"{ "imput": "typo.txt" }"#).unwrap();
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap()), ConfigOverrides::default())
        .unwrap_err();
    assert_matches!(err, BackupError::ConfigParse(_));
}

#[test]
fn token_file_override() {
    let overrides = ConfigOverrides {
        token_file: Some(Utf8PathBuf::from("/run/secrets/toko")),
        ..ConfigOverrides::default()
    };
    let resolved = ConfigLoader::resolve_config(Config::default(), overrides).unwrap();
    assert_eq!(resolved.token_file, Utf8PathBuf::from("/run/secrets/toko"));
}
