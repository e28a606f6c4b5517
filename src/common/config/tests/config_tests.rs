//! Unit tests for the common-config crate.

use common_config::{ExecutionConfig, VeldConfig};

#[test]
fn test_veld_config_default() {
    let config = VeldConfig::default();
    assert_eq!(config.execution.parallelism, 1);
    assert_eq!(config.execution.chunk_rows, 0);
}

#[test]
fn test_execution_config_serialization() {
    let config = ExecutionConfig::default()
        .with_parallelism(8)
        .with_chunk_rows(4096);

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("8"));
    assert!(json.contains("4096"));

    let deserialized: ExecutionConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.parallelism, 8);
    assert_eq!(deserialized.chunk_rows, 4096);
}

#[test]
fn test_config_roundtrip() {
    let config = VeldConfig {
        execution: ExecutionConfig::default().with_parallelism(0),
    };
    let json = serde_json::to_string(&config).unwrap();
    let deserialized: VeldConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.execution.parallelism, 0);
    assert!(deserialized.execution.is_parallel());
}

#[test]
fn test_invalid_parallelism_deserialization() {
    // usize cannot be negative.
    let json = r#"{"parallelism": -2, "chunk_rows": 0}"#;
    let result: Result<ExecutionConfig, _> = serde_json::from_str(json);
    assert!(result.is_err());
}
