use super::*;

#[test]
fn employee_decodes_camel_case() {
    let emp: Employee = serde_json::from_str(
        r#"{"uuid":"5f0c6b9e-8b1a-4b0e-9f6a-0d2f3a4b5c6d","email":"pat@example.com","name":"Pat","roles":["MANAGER"]}"#,
    )
    .expect("decode");
    assert_eq!(emp.email, "pat@example.com");
    assert_eq!(emp.roles, vec!["MANAGER".to_owned()]);
    assert!(emp.has_identity());
}

#[test]
fn employee_missing_optionals_default() {
    let emp: Employee = serde_json::from_str(r#"{"uuid":"5f0c6b9e-8b1a-4b0e-9f6a-0d2f3a4b5c6d"}"#).expect("decode");
    assert!(emp.email.is_empty());
    assert!(emp.roles.is_empty());
}

#[test]
fn nil_uuid_has_no_identity() {
    let emp: Employee =
        serde_json::from_str(r#"{"uuid":"00000000-0000-0000-0000-000000000000"}"#).expect("decode");
    assert!(!emp.has_identity());
}

#[test]
fn session_data_decodes_with_defaults() {
    let data: SessionData = serde_json::from_str(r#"{"token":"t1","userId":"u1"}"#).expect("decode");
    assert_eq!(data.token.as_deref(), Some("t1"));
    assert_eq!(data.user_id, "u1");
    assert!(data.roles.is_empty());
    assert!(data.refresh_token.is_none());
}

#[test]
fn token_validity_uses_camel_case_keys() {
    let validity: TokenValidity =
        serde_json::from_str(r#"{"tokenActive":true,"refreshTokenActive":false}"#).expect("decode");
    assert!(validity.token_active);
    assert!(!validity.refresh_token_active);
}

#[test]
fn credentials_serialize_camel_case() {
    let creds = Credentials { email: "pat@example.com".to_owned(), password: "hunter2".to_owned() };
    let json = serde_json::to_value(&creds).expect("encode");
    assert_eq!(json["email"], "pat@example.com");
    assert_eq!(json["password"], "hunter2");
}
