//! Error categories and messages as tool callers see them.

mod common;

use std::time::Duration;

use common::{registry, session};
use net_expect::{
    ErrorResponse, ErrorType, ExpectationStatus, NetExpectError, NewExpectation, ResponseId,
    SessionId,
};
use serde_json::json;

#[test]
fn validation_errors_map_to_argument_categories() {
    let cases = [
        (
            NetExpectError::invalid_pattern("url_pattern", "(", "unclosed group"),
            ErrorType::InvalidPattern,
        ),
        (
            NetExpectError::InvalidStatusCode { code: 700 },
            ErrorType::InvalidArgument,
        ),
        (
            NetExpectError::InvalidTimeout {
                timeout_ms: 10,
                min: 1_000,
                max: 300_000,
            },
            ErrorType::InvalidArgument,
        ),
        (
            NetExpectError::InvalidMethod {
                method: "BREW".into(),
            },
            ErrorType::InvalidArgument,
        ),
    ];
    for (err, expected) in cases {
        assert!(err.is_validation(), "{err}");
        assert!(!err.is_wait_timeout());
        assert_eq!(err.error_type(), expected);
    }
}

#[test]
fn lookup_errors_name_both_ids() {
    let err = NetExpectError::not_found(&SessionId::from("tab-1"), &ResponseId::from("r9"));
    assert_eq!(err.error_type(), ErrorType::ResponseNotFound);
    let message = err.to_string();
    assert!(message.contains("tab-1"));
    assert!(message.contains("r9"));

    let err = NetExpectError::duplicate(&SessionId::from("tab-1"), &ResponseId::from("r9"));
    assert_eq!(err.error_type(), ErrorType::DuplicateExpectation);
}

#[test]
fn wait_timeout_explains_the_expectation_is_live() {
    let err = NetExpectError::WaitTimeout {
        response_id: ResponseId::from("login"),
        waited: Duration::from_secs(2),
        status: ExpectationStatus::Waiting,
    };
    assert!(err.is_wait_timeout());
    assert!(!err.is_validation());
    let message = err.to_string();
    assert!(message.contains("'login'"));
    assert!(message.contains("waiting"));
    assert!(message.contains("Tip:"));
}

#[test]
fn error_response_wire_shape() {
    let response = ErrorResponse::from(NetExpectError::session_not_found(&SessionId::from("x")));
    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["error_type"], json!("session_not_found"));
    assert_eq!(wire["message"], json!("session 'x' not found"));
    assert!(wire["timestamp"].is_string());

    let back: ErrorResponse = serde_json::from_value(wire).unwrap();
    assert_eq!(back.error_type, ErrorType::SessionNotFound);
}

#[test]
fn io_errors_keep_their_source() {
    use std::error::Error as _;

    let err = NetExpectError::io_context(
        "reading config file /nope.toml",
        std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
    );
    assert_eq!(err.error_type(), ErrorType::SetupFailed);
    assert!(err.to_string().starts_with("reading config file /nope.toml"));
    assert!(err.source().is_some());
}

#[tokio::test(start_paused = true)]
async fn registry_errors_carry_the_right_category() {
    let registry = registry();
    registry
        .register(NewExpectation::new(common::SESSION, "/a").response_id("r1"))
        .unwrap();

    let duplicate = registry
        .register(NewExpectation::new(common::SESSION, "/a").response_id("r1"))
        .unwrap_err();
    assert_eq!(duplicate.error_type(), ErrorType::DuplicateExpectation);

    let timeout = registry
        .register(NewExpectation::new(common::SESSION, "/a").timeout_ms(500))
        .unwrap_err();
    assert_eq!(timeout.error_type(), ErrorType::InvalidArgument);

    let missing = registry
        .get_status(&session(), &ResponseId::from("nope"))
        .unwrap_err();
    assert_eq!(missing.error_type(), ErrorType::ResponseNotFound);
}
