use estore_logger::{LevelFilter, Logger, LoggerError};

#[test]
fn second_init_reports_subscriber_error() {
    let logger = Logger::builder()
        .name("integration-first")
        .level(LevelFilter::DEBUG)
        .init()
        .expect("first init should succeed");
    assert!(!logger.writes_file());
    assert_eq!(logger.name(), "integration-first");

    let err = Logger::builder()
        .name("integration-second")
        .init()
        .expect_err("second init should fail");

    assert!(matches!(err, LoggerError::Subscriber { .. }));
}
