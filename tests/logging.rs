//! Installs the global subscriber, so it runs in its own test binary.

use imagegen::logger::{init, LogConfig, LOG_FILE_PREFIX};

#[test]
fn test_init_writes_daily_file() {
    let dir = std::env::temp_dir().join(format!("imagegen-logs-{}", std::process::id()));
    let config = LogConfig {
        filter: Some("logging=info".into()),
        log_dir: Some(dir.clone()),
        ansi: false,
    };

    let guard = init(&config).unwrap();
    assert!(guard.is_some());
    tracing::info!("logger ready");
    drop(guard);

    let names: Vec<String> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with(LOG_FILE_PREFIX)));

    // A second global subscriber is refused.
    assert!(init(&LogConfig::default()).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
