use llm_relay::observability::{OutputFormat, TracingConfig, init_tracing};

#[test]
fn second_init_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let config = TracingConfig::builder()
        .log_level(tracing::Level::DEBUG)
        .output_format(OutputFormat::Json)
        .log_dir(dir.path())
        .file_prefix("relay-test.log")
        .build();

    let first = init_tracing(config.clone()).unwrap();
    assert!(first.is_some());

    let second = init_tracing(config).unwrap();
    assert!(second.is_none());
}

#[test]
fn production_preset_writes_json_to_a_directory() {
    let config = TracingConfig::production("/var/log/relay".into());
    assert_eq!(config.output_format, OutputFormat::Json);
    assert_eq!(config.log_level, tracing::Level::WARN);
    assert!(config.log_dir.is_some());
}
