// Unit tests for the service error taxonomy
// Each category maps to one status code and one JSON body shape.

use pixvariant::error::{ErrorBody, ServiceError, TRANSFORM_FAILED};
use rstest::rstest;

#[rstest]
#[case(ServiceError::InvalidSignature, 403, r#"{"error":"Invalid signature"}"#)]
#[case(ServiceError::MissingKey, 400, r#"{"error":"No image key provided"}"#)]
#[case(
    ServiceError::InvalidParameter("Quality must be 1-100".to_string()),
    400,
    r#"{"error":"Quality must be 1-100"}"#
)]
#[case(ServiceError::NotFound, 404, r#"{"error":"Image not found"}"#)]
#[case(
    ServiceError::TransformFailure("Failed to decode image: truncated".to_string()),
    500,
    r#"{"error":"Image transformation failed","message":"Failed to decode image: truncated"}"#
)]
#[case(
    ServiceError::Unknown("redis: connection reset".to_string()),
    500,
    r#"{"error":"Image transformation failed","message":"Unknown error"}"#
)]
fn test_status_and_body(#[case] err: ServiceError, #[case] status: u16, #[case] json: &str) {
    assert_eq!(err.to_http_status(), status);
    assert_eq!(err.to_body().to_json(), json);
    assert_eq!(err.is_server_error(), status >= 500);
}

#[test]
fn test_unknown_detail_only_in_display() {
    // Test: the detail is available for logs but never in the body
    let err = ServiceError::Unknown("disk on fire".to_string());
    assert!(err.to_string().contains("disk on fire"));
    assert!(!err.to_body().to_json().contains("disk on fire"));
}

#[test]
fn test_error_body_round_trips_optional_message() {
    let body: ErrorBody = serde_json::from_str(r#"{"error":"Image not found"}"#).unwrap();
    assert_eq!(body, ErrorBody::new("Image not found"));
    assert!(body.message.is_none());

    let body = ErrorBody::with_message(TRANSFORM_FAILED, "boom");
    let parsed: ErrorBody = serde_json::from_str(&body.to_json()).unwrap();
    assert_eq!(parsed, body);
}

#[test]
fn test_service_error_implements_error_trait() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
    assert_error::<ServiceError>();
}
