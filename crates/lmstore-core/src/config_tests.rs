//! Tests for config module

#[cfg(test)]
mod tests {
    use crate::config::*;

    // ========================================================================
    // StorageKind tests
    // ========================================================================

    #[test]
    fn test_storage_kind_default_is_uncompressed() {
        assert_eq!(StorageKind::default(), StorageKind::Uncompressed);
    }

    #[test]
    fn test_storage_kind_serialization() {
        // Arrange
        let kind = StorageKind::Quantized;

        // Act
        let json = serde_json::to_string(&kind).expect("serialize");
        let deserialized: StorageKind = serde_json::from_str(&json).expect("deserialize");

        // Assert
        assert_eq!(json, "\"quantized\"");
        assert_eq!(deserialized, kind);
    }

    // ========================================================================
    // LmConfig default tests
    // ========================================================================

    #[test]
    fn test_config_default_values() {
        let config = LmConfig::default();

        assert!((config.lm.unknown_word_log_prob - (-100.0)).abs() < f32::EPSILON);
        assert!(config.lm.max_order.is_none());
        assert_eq!(config.storage.kind, StorageKind::Uncompressed);
        assert_eq!(config.storage.quantization_bits, 8);
        assert_eq!(config.storage.block_size, 32);
        assert_eq!(config.cache.capacity, 1 << 18);
        assert!(config.caching_enabled());
    }

    #[test]
    fn test_config_default_is_valid() {
        assert!(LmConfig::default().validate().is_ok());
    }

    // ========================================================================
    // TOML parsing tests
    // ========================================================================

    #[test]
    fn test_config_from_toml_minimal() {
        // Arrange
        let toml = r#"
[storage]
kind = "compressed"
"#;

        // Act
        let config = LmConfig::from_toml(toml).expect("parse");

        // Assert
        assert_eq!(config.storage.kind, StorageKind::Compressed);
        assert_eq!(config.storage.block_size, 32);
        assert_eq!(config.cache.capacity, 1 << 18);
    }

    #[test]
    fn test_config_from_toml_full() {
        let toml = r#"
[lm]
unknown_word_log_prob = 0.0
max_order = 3

[storage]
kind = "quantized"
quantization_bits = 12
block_size = 64

[cache]
capacity = 0
"#;

        let config = LmConfig::from_toml(toml).expect("parse");

        assert!(config.lm.unknown_word_log_prob.abs() < f32::EPSILON);
        assert_eq!(config.lm.max_order, Some(3));
        assert_eq!(config.storage.kind, StorageKind::Quantized);
        assert_eq!(config.storage.quantization_bits, 12);
        assert_eq!(config.storage.block_size, 64);
        assert!(!config.caching_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml_invalid_kind() {
        let toml = r#"
[storage]
kind = "zstd"
"#;

        let result = LmConfig::from_toml(toml);

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    // ========================================================================
    // Validation tests
    // ========================================================================

    #[test]
    fn test_validate_rejects_positive_unknown_log_prob() {
        let mut config = LmConfig::default();
        config.lm.unknown_word_log_prob = 0.5;

        let err = config.validate().expect_err("positive log prob");

        assert!(err.to_string().contains("lm.unknown_word_log_prob"));
    }

    #[test]
    fn test_validate_rejects_zero_max_order() {
        let mut config = LmConfig::default();
        config.lm.max_order = Some(0);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_quantization_bits_out_of_range() {
        let mut config = LmConfig::default();
        config.storage.quantization_bits = 0;
        assert!(config.validate().is_err());

        config.storage.quantization_bits = 25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_block_size() {
        let mut config = LmConfig::default();
        config.storage.block_size = 0;

        let err = config.validate().expect_err("zero block size");

        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "storage.block_size"
        ));
    }

    // ========================================================================
    // File and serialization tests
    // ========================================================================

    #[test]
    fn test_config_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");

        let config = LmConfig::load_from_path(dir.path().join("absent.toml")).expect("load");

        assert_eq!(config.storage.kind, StorageKind::Uncompressed);
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lmstore.toml");
        std::fs::write(&path, "[cache]\ncapacity = 1024\n").expect("write");

        let config = LmConfig::load_from_path(&path).expect("load");

        assert_eq!(config.cache.capacity, 1024);
    }

    #[test]
    fn test_config_to_toml_roundtrip() {
        let mut config = LmConfig::default();
        config.storage.kind = StorageKind::Compressed;
        config.lm.max_order = Some(4);

        let toml = config.to_toml().expect("serialize");
        let parsed = LmConfig::from_toml(&toml).expect("parse");

        assert_eq!(parsed.storage.kind, StorageKind::Compressed);
        assert_eq!(parsed.lm.max_order, Some(4));
    }
}
