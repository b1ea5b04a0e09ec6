//! Error classification as consumed through the facade.

use ctf_console::api_client::{classify_http_error, ApiError, EndReason, ForbiddenReason};

#[test]
fn full_taxonomy_from_status_and_code() {
    assert!(classify_http_error(401, "{}").is_unauthorized());

    assert!(matches!(
        classify_http_error(403, r#"{"code":"PENDING_APPROVAL"}"#),
        ApiError::Forbidden(ForbiddenReason::PendingApproval)
    ));
    assert!(matches!(
        classify_http_error(403, r#"{"code":"ADMIN_ACCESS_REQUIRED"}"#),
        ApiError::Forbidden(ForbiddenReason::AdminAccessRequired)
    ));
    assert!(matches!(
        classify_http_error(403, r#"{"message":"nope"}"#),
        ApiError::Forbidden(ForbiddenReason::Other(_))
    ));

    assert!(matches!(
        classify_http_error(400, r#"{"code":"CHALLENGE_NOT_STARTED"}"#),
        ApiError::NotStarted
    ));
    assert!(matches!(
        classify_http_error(400, r#"{"message":"flag required"}"#),
        ApiError::Validation(_)
    ));
    assert!(matches!(
        classify_http_error(500, "boom"),
        ApiError::Http { status: 500, .. }
    ));
}

#[test]
fn gone_always_means_expired() {
    assert_eq!(
        classify_http_error(410, "").ended_reason(),
        Some(EndReason::Expired)
    );
    // Even a body claiming completion does not override the status.
    assert_eq!(
        classify_http_error(410, r#"{"code":"CHALLENGE_ALREADY_ENDED","reason":"completed"}"#)
            .ended_reason(),
        Some(EndReason::Expired)
    );
}

#[test]
fn ended_code_on_other_statuses_keeps_its_reason() {
    assert_eq!(
        classify_http_error(400, r#"{"code":"CHALLENGE_ALREADY_ENDED","reason":"completed"}"#)
            .ended_reason(),
        Some(EndReason::Completed)
    );
    assert_eq!(
        classify_http_error(400, r#"{"code":"CHALLENGE_ALREADY_ENDED"}"#).ended_reason(),
        Some(EndReason::Expired)
    );
}

#[test]
fn only_transport_and_server_failures_are_transient() {
    assert!(ApiError::Network("refused".to_string()).is_transient());
    assert!(ApiError::Timeout("deadline".to_string()).is_transient());
    assert!(classify_http_error(503, "").is_transient());

    assert!(!classify_http_error(401, "{}").is_transient());
    assert!(!classify_http_error(410, "").is_transient());
    assert!(!classify_http_error(400, r#"{"message":"bad"}"#).is_transient());
}

#[test]
fn garbled_error_bodies_still_classify_by_status() {
    assert!(classify_http_error(401, "<html>gateway</html>").is_unauthorized());
    assert_eq!(
        classify_http_error(410, "not json at all").ended_reason(),
        Some(EndReason::Expired)
    );
    assert!(matches!(
        classify_http_error(502, "<html>bad gateway</html>"),
        ApiError::Http { status: 502, .. }
    ));
}
