use bandstand::domain::token::OAuthToken;
use bandstand::error::AppError;
use bandstand::storage::TokenStore;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

#[tokio::test]
async fn test_code_exchange_persists_token_for_user() {
    let server = MockServer::start().await;
    let (service, store, observer) = common::oauth_service(&server.uri());
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_fresh",
            "token_type": "bearer",
            "scope": "read:org,user:email"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = service.finish_authorization(user_id, "authz-code".to_string()).await.expect("exchange");

    assert_eq!(token.access_token, "gho_fresh");
    assert_eq!(token.token_type, "bearer");

    let stored = store.load(user_id).await.expect("load").expect("stored token");
    assert_eq!(stored.access_token, "gho_fresh");
    assert_eq!(observer.seen(), 0);
}

#[tokio::test]
async fn test_provider_rejection_notifies_observer() {
    let server = MockServer::start().await;
    let (service, store, observer) = common::oauth_service(&server.uri());
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "incorrect_client_credentials",
            "error_description": "The client_id and/or client_secret passed are incorrect."
        })))
        .mount(&server)
        .await;

    let err = service.finish_authorization(user_id, "authz-code".to_string()).await.expect_err("rejected");

    assert!(matches!(err, AppError::TokenExchange(_)));
    assert_eq!(observer.seen(), 1);
    assert!(store.load(user_id).await.expect("load").is_none());
}

#[tokio::test]
async fn test_discard_token_removes_stored_material() {
    let server = MockServer::start().await;
    let (service, store, _observer) = common::oauth_service(&server.uri());
    let user_id = Uuid::new_v4();

    store.save(user_id, &OAuthToken::bearer("gho_old")).await.expect("seed");
    service.discard_token(user_id).await.expect("discard");
    assert!(store.load(user_id).await.expect("load").is_none());
}

#[tokio::test]
async fn test_get_emails_uses_the_users_own_token() {
    let server = MockServer::start().await;
    let (service, store) = common::org_service(&server.uri());
    let user_id = Uuid::new_v4();

    store.save(user_id, &OAuthToken::bearer("gho_user")).await.expect("seed");

    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .and(header("Authorization", "Bearer gho_user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "billie@example.org", "verified": true, "primary": true},
            {"email": "old@example.org", "verified": false, "primary": false}
        ])))
        .mount(&server)
        .await;

    let emails = service.get_emails(user_id).await.expect("emails");

    assert_eq!(emails.len(), 2);
    assert!(emails[0].verified && emails[0].primary);

    // The user-scoped call must not carry the app credential.
    let received = server.received_requests().await.expect("requests");
    assert!(received.iter().all(|r| !r.url.query().unwrap_or_default().contains("client_secret")));
}

#[tokio::test]
async fn test_get_emails_without_stored_token_fails_closed() {
    let server = MockServer::start().await;
    let (service, _store) = common::org_service(&server.uri());

    let err = service.get_emails(Uuid::new_v4()).await.expect_err("no token");
    assert!(matches!(err, AppError::AuthError));
}
