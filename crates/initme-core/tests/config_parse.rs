use std::path::PathBuf;

use uuid::Uuid;

use initme_core::args::build_sc_args;
use initme_core::settings::{load_config, ConfigError, ControllerSettings};

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("initme-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        Self(dir)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[test]
fn parse_full_config() {
    let dir = TempDir::new();
    let path = dir.0.join("initme.json");
    std::fs::write(
        &path,
        r#"{
            "service": {
                "name": "initme-demo",
                "bin_path": "C:\\initme\\initme-agent.exe --config C:\\initme\\initme.json run",
                "start_type": "auto",
                "display_name": "initme demo"
            },
            "controller": { "fast_heartbeat_ms": 250, "job_grace_ms": 1000 }
        }"#,
    )
    .unwrap();

    let config = load_config(&path).expect("load config");
    assert_eq!(config.service.name, "initme-demo");
    assert_eq!(config.controller.fast_heartbeat_ms, 250);
    assert_eq!(config.controller.job_grace_ms, 1000);
    assert_eq!(config.controller.slow_heartbeat_ms, ControllerSettings::default().slow_heartbeat_ms);
    assert_eq!(config.controller.sc_program, "sc.exe");

    let args = build_sc_args(&config.service, &["create"]).unwrap();
    assert_eq!(&args[..2], ["create", "initme-demo"]);
    assert!(args.contains(&"DisplayName=".to_string()));
}

#[test]
fn controller_section_is_optional() {
    let dir = TempDir::new();
    let path = dir.0.join("initme.json");
    std::fs::write(&path, r#"{ "service": { "name": "a", "bin_path": "b" } }"#).unwrap();
    let config = load_config(&path).unwrap();
    assert_eq!(config.controller, ControllerSettings::default());
}

#[test]
fn missing_file_and_bad_json_are_distinguished() {
    let dir = TempDir::new();
    let missing = load_config(&dir.0.join("nope.json")).unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));

    let path = dir.0.join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();
    let bad = load_config(&path).unwrap_err();
    assert!(matches!(bad, ConfigError::Parse { .. }));
}
