use datactx_fs::{ConfigStore, Error, NormalizedPath};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestConfig {
    name: String,
    count: i32,
}

#[test]
fn test_load_yaml() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("datactx.yml");
    fs::write(&file_path, "name: test\ncount: 42").unwrap();

    let store = ConfigStore::new();
    let config: TestConfig = store.load(&NormalizedPath::new(&file_path)).unwrap();

    assert_eq!(config, TestConfig { name: "test".into(), count: 42 });
}

#[test]
fn test_load_toml() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.toml");
    fs::write(&file_path, "name = \"test\"\ncount = 42").unwrap();

    let config: TestConfig = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(config.count, 42);
}

#[test]
fn test_load_json() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("suite.json");
    fs::write(&file_path, r#"{"name": "test", "count": 42}"#).unwrap();

    let config: TestConfig = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(config.name, "test");
}

#[test]
fn test_save_yaml_round_trips() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("datactx.yml"));
    let config = TestConfig { name: "test".into(), count: 42 };

    let store = ConfigStore::new();
    store.save(&path, &config).unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert!(content.contains("name: test"));
    let loaded: TestConfig = store.load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_invalid_yaml_reports_format() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("broken.yml");
    fs::write(&file_path, "name: [unclosed").unwrap();

    let result: Result<TestConfig, _> = ConfigStore::new().load(&NormalizedPath::new(&file_path));
    match result {
        Err(Error::ConfigParse { format, .. }) => assert_eq!(format, "YAML"),
        other => panic!("expected ConfigParse, got {other:?}"),
    }
}

#[test]
fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("config.ini"));
    let config = TestConfig { name: "x".into(), count: 1 };

    let err = ConfigStore::new().save(&path, &config).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { extension } if extension == "ini"));
}
