#![cfg(feature = "inmem-store")]

mod common;

use std::time::Duration;

use actix_web::{test, web, App};
use circle::config;
use circle::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use common::{bearer, setup, user};
use serde_json::json;
use serial_test::serial;

fn tight(login: usize, register: usize, post: usize) -> RateLimiterFacade {
    let window = Duration::from_secs(300);
    let cfg = RateLimitConfig {
        login_limit: login,
        login_window: window,
        register_limit: register,
        register_window: window,
        post_limit: post,
        post_window: window,
    };
    RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg)
}

#[actix_web::test]
#[serial]
async fn registration_limited_per_client() {
    let (_repo, state) = setup();
    let state = state.with_rate_limiter(Some(tight(100, 1, 100)));
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let reg = |name: &str| {
        test::TestRequest::post().uri("/api/register/").set_json(&json!({
            "username": name, "email": format!("{name}@x.com"), "password": "s3cret-pass", "password2": "s3cret-pass"
        }))
    };
    let (status, _) = send!(app, reg("alice"));
    assert_eq!(status, 201);
    let (status, v) = send!(app, reg("bob"));
    assert_eq!(status, 429);
    assert_eq!(v["error"], "too many requests");
}

#[actix_web::test]
#[serial]
async fn content_creation_limited_but_reads_are_not() {
    let (repo, state) = setup();
    let (_alice, a_tok) = user(&repo, "alice").await;
    let state = state.with_rate_limiter(Some(tight(100, 100, 1)));
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let create = || {
        test::TestRequest::post().uri("/api/posts/create/").insert_header(bearer(&a_tok)).set_json(&json!({"content":"x"}))
    };
    let (status, _) = send!(app, create());
    assert_eq!(status, 201);
    let (status, _) = send!(app, create());
    assert_eq!(status, 429);

    for _ in 0..3 {
        let (status, _) = send!(app, test::TestRequest::get().uri("/api/posts/").insert_header(bearer(&a_tok)));
        assert_eq!(status, 200);
    }
}

#[actix_web::test]
#[serial]
async fn login_attempts_limited() {
    let (_repo, state) = setup();
    let state = state.with_rate_limiter(Some(tight(2, 100, 100)));
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let login = || test::TestRequest::post().uri("/api/token/").set_json(&json!({"username":"ghost","password":"nope-nope"}));
    assert_eq!(send!(app, login()).0, 401);
    assert_eq!(send!(app, login()).0, 401);
    assert_eq!(send!(app, login()).0, 429);
}

#[actix_web::test]
#[serial]
async fn no_limiter_means_no_limits() {
    std::env::remove_var("RATE_LIMIT_ENABLED");
    assert!(RateLimiterFacade::from_env().is_none());
    std::env::set_var("RATE_LIMIT_ENABLED", "true");
    std::env::set_var("RL_POST_LIMIT", "7");
    let f = RateLimiterFacade::from_env().expect("enabled");
    assert_eq!(f.cfg.post_limit, 7);
    std::env::remove_var("RATE_LIMIT_ENABLED");
    std::env::remove_var("RL_POST_LIMIT");
}
