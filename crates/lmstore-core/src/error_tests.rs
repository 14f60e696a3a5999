//! Tests for `error` module

use super::error::*;

#[test]
fn test_error_codes_are_unique() {
    // Arrange - create all error variants
    let errors: Vec<Error> = vec![
        Error::InvalidOrder {
            order: 5,
            max_order: 3,
        },
        Error::OffsetOutOfRange {
            offset: 10,
            order: 1,
            size: 4,
        },
        Error::ResourceExhausted {
            order: 2,
            requested: u64::MAX,
        },
        Error::Corrupted("test".into()),
        Error::MissingContext {
            order: 1,
            link: "prefix",
        },
        Error::NotFinalized(0),
        Error::Config("test".into()),
        Error::Io(std::io::Error::other("test")),
        Error::Serialization("test".into()),
        Error::BuildOrder { current: 2, got: 1 },
        Error::AlreadyFinalized(1),
    ];

    // Act
    let codes: Vec<&str> = errors.iter().map(Error::code).collect();

    // Assert
    let mut unique_codes = codes.clone();
    unique_codes.sort_unstable();
    unique_codes.dedup();
    assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");

    for code in &codes {
        assert!(code.starts_with("LMS-"), "Code {code} should start with LMS-");
    }
}

#[test]
fn test_error_display_includes_code() {
    let err = Error::OffsetOutOfRange {
        offset: 9,
        order: 2,
        size: 8,
    };

    let display = format!("{err}");

    assert!(display.contains("[LMS-002]"));
    assert!(display.contains("Offset 9"));
    assert!(display.contains("size 8"));
}

#[test]
fn test_corruption_is_not_recoverable() {
    assert!(!Error::Corrupted("short stream".into()).is_recoverable());
    assert!(!Error::ResourceExhausted {
        order: 0,
        requested: 1
    }
    .is_recoverable());
    assert!(Error::NotFinalized(1).is_recoverable());
    assert!(Error::MissingContext {
        order: 2,
        link: "suffix"
    }
    .is_recoverable());
}

#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "blob missing");

    let err: Error = io_err.into();

    assert_eq!(err.code(), "LMS-008");
    assert!(err.to_string().contains("blob missing"));
}
