/*!
 * Tests for app configuration functionality
 */

use anyhow::Result;
use stsync::app_config::{Config, LogLevel};

use crate::common;

#[test]
fn test_save_thenLoad_shouldPreserveEveryField() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("config.json");
    let mut config = Config::default();
    config.primary_language = "de".to_string();
    config.log_level = LogLevel::Trace;
    config.operations.confidence_threshold = 0.9;
    config.operations.detect_moves = false;
    config.repository.name = Some("books".to_string());

    config.save(&path)?;
    let loaded = Config::load(&path)?;

    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
    Ok(())
}

#[test]
fn test_load_existingFile_shouldNotOverwrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "stsync.json", r#"{"primary_language": "fr"}"#)?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.primary_language, "fr");
    assert_eq!(std::fs::read_to_string(&path)?, r#"{"primary_language": "fr"}"#);
    Ok(())
}

#[test]
fn test_load_malformedJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "stsync.json", "{ not json")?;

    assert!(Config::load(&path).is_err());
    Ok(())
}

#[test]
fn test_validate_negativeWeight_shouldFail() {
    let mut config = Config::default();
    config.alignment.lexical_weight = -0.1;
    assert!(config.validate().is_err());
}

#[test]
fn test_logLevel_conversion_shouldMatchFilter() {
    assert_eq!(log::LevelFilter::from(LogLevel::Warn), log::LevelFilter::Warn);
    assert_eq!(log::LevelFilter::from(LogLevel::default()), log::LevelFilter::Info);
}
