use std::io;

use kiln::error::Error;

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let kiln_err: Error = io_err.into();

    match kiln_err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }
}

#[test]
fn test_error_display() {
    let err = Error::ConfigError("invalid config".to_string());
    assert_eq!(err.to_string(), "Configuration error: invalid config.");

    let err = Error::UnresolvedVariable { name: "AppName".to_string() };
    assert_eq!(err.to_string(), "Template references unresolved variable 'AppName'.");

    let err = Error::PathTraversal { path: "../x".to_string(), root: "out".to_string() };
    assert_eq!(err.to_string(), "Path '../x' escapes the output root 'out'.");
}

#[test]
fn test_error_kind() {
    let cases = [
        (Error::NotFound { path: "a".to_string() }, "NotFound"),
        (Error::UndefinedVariable { name: "a".to_string() }, "UndefinedVariable"),
        (Error::FrozenContext { name: "a".to_string() }, "FrozenContext"),
        (Error::Collision { path: "a".to_string() }, "Collision"),
        (
            Error::WriteFailure {
                path: "a".to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            },
            "WriteFailure",
        ),
    ];
    for (err, kind) in cases {
        assert_eq!(err.kind(), kind);
    }
}
