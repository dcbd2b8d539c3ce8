use super::*;

fn provider() -> OidcProvider {
    OidcProvider::new(
        reqwest::Client::new(),
        IdpConfig {
            issuer_url: "https://sso.example.com/".to_owned(),
            realm: "hrdesk".to_owned(),
            client_id: "hrdesk-web".to_owned(),
        },
    )
}

#[test]
fn endpoint_layout_is_keycloak_shaped() {
    let provider = provider();
    assert_eq!(
        provider.endpoint("token"),
        "https://sso.example.com/realms/hrdesk/protocol/openid-connect/token"
    );
    assert_eq!(
        provider.endpoint("logout"),
        "https://sso.example.com/realms/hrdesk/protocol/openid-connect/logout"
    );
}

#[test]
fn authorize_url_carries_client_and_flow() {
    let url = provider().authorize_url();
    assert!(url.starts_with("https://sso.example.com/realms/hrdesk/protocol/openid-connect/auth?"));
    assert!(url.contains("client_id=hrdesk-web"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains("scope=openid"));
}

#[test]
fn token_response_expiry_is_absolute() {
    let body: TokenResponse =
        serde_json::from_str(r#"{"access_token":"a","refresh_token":"r","expires_in":300}"#).expect("decode");
    let tokens = body.into_tokens();
    assert_eq!(tokens.access_token, "a");
    assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
    assert!(!tokens.expires_within(time::Duration::seconds(60)));
    assert!(tokens.expires_within(time::Duration::seconds(600)));
}

#[test]
fn missing_expires_in_counts_as_already_stale() {
    let body: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).expect("decode");
    let tokens = body.into_tokens();
    assert!(tokens.refresh_token.is_none());
    assert!(tokens.expires_within(time::Duration::seconds(30)));
}

#[tokio::test]
async fn init_without_prior_refresh_token_is_clean_signed_out() {
    let outcome = provider().init(None).await.expect("no network needed");
    assert!(outcome.is_none());
}
