use actix_web::{dev::Payload, test, FromRequest};
use chrono::Utc;
use circle::{
    auth::{decode_token, issue_token_pair, refresh_access, Auth, AuthError, TokenType},
    models::{Profile, User},
};
use std::env;

// Helper that guarantees a sufficiently long secret for tests.
fn set_secret() {
    env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

fn profile() -> Profile {
    Profile {
        user: User {
            id: 42,
            username: "tester".into(),
            email: "tester@x.com".into(),
            first_name: "Tess".into(),
            last_name: "Ter".into(),
            bio: String::new(),
            gender: None,
            profile_picture: None,
            location: "Lisbon".into(),
            phone_number: None,
            website: None,
            date_of_birth: None,
            age: None,
            created_at: Utc::now(),
        },
        followers: vec![1, 2, 3],
        following: vec![7],
    }
}

async fn extract(token: &str) -> Result<Auth, circle::error::ApiError> {
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    Auth::from_request(&req, &mut pl).await
}

#[actix_web::test]
#[serial_test::serial]
async fn access_token_roundtrip_carries_profile_snapshot() {
    set_secret();
    let pair = issue_token_pair(&profile()).expect("pair");
    let auth = extract(&pair.access).await.expect("extract");
    assert_eq!(auth.user_id, 42);
    assert_eq!(auth.claims.token_type, TokenType::Access);
    assert_eq!(auth.claims.profile.username, "tester");
    assert_eq!(auth.claims.profile.location, "Lisbon");
    assert_eq!(auth.claims.profile.followers_count, 3);
    assert_eq!(auth.claims.profile.following_count, 1);
}

#[actix_web::test]
#[serial_test::serial]
async fn refresh_token_is_not_an_access_token() {
    set_secret();
    let pair = issue_token_pair(&profile()).unwrap();
    assert!(extract(&pair.refresh).await.is_err());
    assert_eq!(decode_token(&pair.refresh).unwrap().token_type, TokenType::Refresh);
}

#[actix_web::test]
#[serial_test::serial]
async fn refresh_mints_new_access_token() {
    set_secret();
    let pair = issue_token_pair(&profile()).unwrap();
    let access = refresh_access(&pair.refresh).expect("refresh");
    let auth = extract(&access).await.expect("extract");
    assert_eq!(auth.user_id, 42);
    assert_eq!(auth.claims.profile.email, "tester@x.com");
    assert_ne!(auth.claims.jti, decode_token(&pair.access).unwrap().jti);

    // an access token cannot be used to refresh
    assert!(matches!(refresh_access(&pair.access), Err(AuthError::WrongTokenType)));
}

#[actix_web::test]
#[serial_test::serial]
async fn extractor_rejects_garbage_and_foreign_signatures() {
    set_secret();
    assert!(extract("notatoken").await.is_err());

    let pair = issue_token_pair(&profile()).unwrap();
    env::set_var("JWT_SECRET", "a-completely-different-secret-of-32+");
    assert!(extract(&pair.access).await.is_err());
    set_secret();
    assert!(extract(&pair.access).await.is_ok());
}

#[actix_web::test]
#[serial_test::serial]
async fn expired_token_rejected() {
    set_secret();
    env::set_var("JWT_ACCESS_TTL_SECS", "-120");
    let pair = issue_token_pair(&profile()).unwrap();
    env::remove_var("JWT_ACCESS_TTL_SECS");
    assert!(extract(&pair.access).await.is_err());
}

#[actix_web::test]
#[serial_test::serial]
async fn missing_header_is_unauthenticated() {
    set_secret();
    let req = test::TestRequest::default().to_http_request();
    let mut pl = Payload::None;
    let err = Auth::from_request(&req, &mut pl).await.unwrap_err();
    assert_eq!(actix_web::ResponseError::status_code(&err), 401);
}
