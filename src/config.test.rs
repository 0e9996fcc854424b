use super::*;
use tempfile::tempdir;

#[test]
fn byte_size_parses_kb_and_mb() {
    assert_eq!(ByteSize::parse("512KB").unwrap().bytes(), 512 * 1024);
    assert_eq!(ByteSize::parse("1MB").unwrap().bytes(), 1024 * 1024);
}

#[test]
fn byte_size_rejects_missing_unit() {
    assert!(ByteSize::parse("512").is_err());
    assert!(ByteSize::parse("KB").is_err());
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load(&dir.path().join("config.json"));
    assert_eq!(config, Config::default());
}

#[test]
fn unknown_key_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"totallyUnknown": true}"#).unwrap();
    let config = Config::load(&path);
    assert_eq!(config, Config::default());
}

#[test]
fn underscore_prefixed_keys_round_trip_verbatim() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"include": [], "exclude": [], "respectGitignore": true, "maxFileSize": "1MB", "maxFiles": 50000, "_comment": "hand edited"}"#,
    )
    .unwrap();
    let config = Config::load(&path);
    assert_eq!(
        config.extra.get("_comment").unwrap(),
        &serde_json::json!("hand edited")
    );

    let out_path = dir.path().join("roundtrip.json");
    config.save(&out_path).unwrap();
    let reloaded = Config::load(&out_path);
    assert_eq!(reloaded.extra, config.extra);
}

#[test]
fn recognized_keys_round_trip_byte_for_byte_values() {
    let config = Config {
        include: vec!["src/**".to_string()],
        exclude: vec!["**/*.test.ts".to_string()],
        respect_gitignore: false,
        max_file_size: ByteSize::parse("2MB").unwrap(),
        max_files: 1000,
        extra: BTreeMap::new(),
    };
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    config.save(&path).unwrap();
    let reloaded = Config::load(&path);
    assert_eq!(reloaded, config);
}
