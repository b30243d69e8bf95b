#![cfg(feature = "inmem-store")]

mod common;

use actix_web::{test, web, App};
use circle::config;
use common::{bearer, setup, user};
use serde_json::json;
use serial_test::serial;

#[actix_web::test]
#[serial]
async fn registration_validation_and_login() {
    let (_repo, state) = setup();
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let body = json!({"username":"alice","email":"alice@x.com","password":"s3cret-pass","password2":"s3cret-pass"});
    let (status, v) = send!(app, test::TestRequest::post().uri("/api/register/").set_json(&body));
    assert_eq!(status, 201);
    assert_eq!(v["message"], "User created successfully");
    assert_eq!(v["user"]["username"], "alice");
    let user_obj = v["user"].as_object().unwrap();
    assert!(!user_obj.contains_key("password") && !user_obj.contains_key("password2"));

    let body = json!({"username":"alice","email":"other@x.com","password":"s3cret-pass","password2":"s3cret-pass"});
    let (status, v) = send!(app, test::TestRequest::post().uri("/api/register/").set_json(&body));
    assert_eq!(status, 400);
    assert_eq!(v["error"], "validation failed");
    assert_eq!(v["fields"]["username"][0], "Username is already taken.");

    let body = json!({"username":"bob","email":"alice@x.com","password":"s3cret-pass","password2":"s3cret-pass"});
    let (status, v) = send!(app, test::TestRequest::post().uri("/api/register/").set_json(&body));
    assert_eq!(status, 400);
    assert_eq!(v["fields"]["email"][0], "Email is already in use.");
    assert!(v["fields"].get("username").is_none());

    let body = json!({"username":"carol","email":"carol@x.com","password":"s3cret-pass","password2":"different"});
    let (status, v) = send!(app, test::TestRequest::post().uri("/api/register/").set_json(&body));
    assert_eq!(status, 400);
    assert_eq!(v["fields"]["password"][0], "Password fields do not match.");

    let body = json!({"username":"dave","email":"not-an-email","password":"short","password2":"short"});
    let (status, v) = send!(app, test::TestRequest::post().uri("/api/register/").set_json(&body));
    assert_eq!(status, 400);
    assert!(v["fields"]["email"].is_array());
    assert!(v["fields"]["password"].is_array());

    // login
    let (status, v) = send!(
        app,
        test::TestRequest::post().uri("/api/token/").set_json(&json!({"username":"alice","password":"s3cret-pass"}))
    );
    assert_eq!(status, 200);
    let access = v["access"].as_str().unwrap().to_string();
    let refresh = v["refresh"].as_str().unwrap().to_string();

    let (status, _) = send!(
        app,
        test::TestRequest::post().uri("/api/token/").set_json(&json!({"username":"alice","password":"wrong-pass"}))
    );
    assert_eq!(status, 401);
    let (status, _) = send!(
        app,
        test::TestRequest::post().uri("/api/token/").set_json(&json!({"username":"nobody","password":"s3cret-pass"}))
    );
    assert_eq!(status, 401);

    // refresh
    let (status, v) =
        send!(app, test::TestRequest::post().uri("/api/token/refresh/").set_json(&json!({"refresh": refresh})));
    assert_eq!(status, 200);
    assert!(v["access"].is_string());
    let (status, _) =
        send!(app, test::TestRequest::post().uri("/api/token/refresh/").set_json(&json!({"refresh": access})));
    assert_eq!(status, 401);

    // the new access token works and the refresh token does not
    let (status, v) = send!(app, test::TestRequest::get().uri("/api/profiles/").insert_header(bearer(&access)));
    assert_eq!(status, 200);
    assert_eq!(v.as_array().unwrap().len(), 1);
    let (status, _) = send!(app, test::TestRequest::get().uri("/api/profiles/").insert_header(bearer(&refresh)));
    assert_eq!(status, 401);
}

#[actix_web::test]
#[serial]
async fn unauthenticated_before_lookup() {
    let (_repo, state) = setup();
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let (status, v) = send!(app, test::TestRequest::get().uri("/api/profiles/999/"));
    assert_eq!(status, 401);
    assert_eq!(v["error"], "Authentication credentials were not provided.");
    let (status, _) = send!(app, test::TestRequest::delete().uri("/api/posts/999/"));
    assert_eq!(status, 401);
    let (status, _) = send!(app, test::TestRequest::post().uri("/api/posts/999/like/").insert_header(bearer("junk")));
    assert_eq!(status, 401);
}

#[actix_web::test]
#[serial]
async fn follow_toggle_and_relation_lists() {
    let (repo, state) = setup();
    let (alice, a_tok) = user(&repo, "alice").await;
    let (_bob, b_tok) = user(&repo, "bob").await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/follow-unfollow/bob/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 200);
    assert_eq!(v["is_following"], true);
    assert_eq!(v["followers_count"], 1);

    let (_, v) = send!(app, test::TestRequest::get().uri("/api/bob/followers/").insert_header(bearer(&b_tok)));
    assert_eq!(v[0]["id"], alice);
    let (_, v) = send!(app, test::TestRequest::get().uri("/api/alice/following/").insert_header(bearer(&b_tok)));
    assert_eq!(v[0]["username"], "bob");
    let (_, v) = send!(app, test::TestRequest::get().uri(&format!("/api/profiles/{alice}/")).insert_header(bearer(&b_tok)));
    assert_eq!(v["following_count"], 1);
    assert_eq!(v["is_following"], false);

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/follow-unfollow/bob/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 200);
    assert_eq!(v["is_following"], false);
    assert_eq!(v["followers_count"], 0);

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/follow-unfollow/alice/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 400);
    assert_eq!(v["fields"]["username"][0], "You cannot follow yourself.");

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/follow-unfollow/ghost/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 404);
    assert_eq!(v["error"], "not found");
}

#[actix_web::test]
#[serial]
async fn explicit_follow_and_unfollow_routes() {
    let (repo, state) = setup();
    let (_alice, a_tok) = user(&repo, "alice").await;
    let (bob, _b_tok) = user(&repo, "bob").await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/follow/bob/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 200);
    assert_eq!(v, json!({"message":"You are now following bob.","is_following":true,"followers_count":1}));

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/follow/bob/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 400);
    assert_eq!(v["fields"]["username"][0], "You are already following this user.");
    let (_, v) = send!(app, test::TestRequest::get().uri(&format!("/api/profiles/{bob}/")).insert_header(bearer(&a_tok)));
    assert_eq!(v["followers_count"], 1, "a repeated follow does not flip the edge");

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/unfollow/bob/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 200);
    assert_eq!(v["is_following"], false);
    assert_eq!(v["followers_count"], 0);

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/unfollow/bob/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 400);
    assert_eq!(v["fields"]["username"][0], "You are not following this user.");

    let (status, v) = send!(app, test::TestRequest::post().uri("/api/follow/alice/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 400);
    assert_eq!(v["fields"]["username"][0], "You cannot follow yourself.");
    let (status, v) = send!(app, test::TestRequest::post().uri("/api/unfollow/alice/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 400);
    assert_eq!(v["fields"]["username"][0], "You cannot unfollow yourself.");

    let (status, _) = send!(app, test::TestRequest::post().uri("/api/unfollow/ghost/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 404);
}

#[actix_web::test]
#[serial]
async fn private_posts_are_closed_to_other_users() {
    let (repo, state) = setup();
    let (_alice, a_tok) = user(&repo, "alice").await;
    let (_bob, b_tok) = user(&repo, "bob").await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let (_, secret) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/posts/create/")
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"content":"for my eyes only","is_public":false}))
    );
    let (_, c) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/comments/create/")
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"post": secret["id"], "content":"note to self"}))
    );
    let (_, s) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/comments/{}/subcomments/", c["id"]))
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"content":"and another"}))
    );

    let (status, v) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/posts/repost/")
            .insert_header(bearer(&b_tok))
            .set_json(&json!({"post_id": secret["id"], "is_public": true}))
    );
    assert_eq!(status, 403);
    assert_eq!(v["error"], "You do not have permission to view this post.");
    let (_, anon) = send!(app, test::TestRequest::get().uri("/api/posts/"));
    assert!(!anon.to_string().contains("for my eyes only"));

    let denied = [
        test::TestRequest::post().uri(&format!("/api/posts/{}/like/", secret["id"])),
        test::TestRequest::post().uri(&format!("/api/posts/{}/dislike/", secret["id"])),
        test::TestRequest::get().uri(&format!("/api/posts/{}/comments/", secret["id"])),
        test::TestRequest::post()
            .uri("/api/comments/create/")
            .set_json(&json!({"post": secret["id"], "content":"let me in"})),
        test::TestRequest::get().uri(&format!("/api/comments/{}/", c["id"])),
        test::TestRequest::post().uri(&format!("/api/comments/{}/like/", c["id"])),
        test::TestRequest::get().uri(&format!("/api/comments/{}/subcomments/list/", c["id"])),
        test::TestRequest::post()
            .uri(&format!("/api/comments/{}/subcomments/", c["id"]))
            .set_json(&json!({"content":"let me in"})),
        test::TestRequest::get().uri(&format!("/api/subcomments/{}/", s["id"])),
        test::TestRequest::post().uri(&format!("/api/subcomments/{}/like/", s["id"])),
    ];
    for req in denied {
        let (status, _) = send!(app, req.insert_header(bearer(&b_tok)));
        assert_eq!(status, 403);
    }

    // nothing leaked into the owner's view either
    let (_, list) = send!(app, test::TestRequest::get().uri(&format!("/api/posts/{}/comments/", secret["id"])).insert_header(bearer(&a_tok)));
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["like_count"], 0);
    let (_, v) = send!(app, test::TestRequest::get().uri(&format!("/api/posts/{}/", secret["id"])).insert_header(bearer(&a_tok)));
    assert_eq!(v["like_count"], 0);
    assert_eq!(v["dislike_count"], 0);
}

#[actix_web::test]
#[serial]
async fn post_visibility_and_listing() {
    let (repo, state) = setup();
    let (_alice, a_tok) = user(&repo, "alice").await;
    let (_bob, b_tok) = user(&repo, "bob").await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let create = |tok: &str, content: &str, public: bool| {
        test::TestRequest::post()
            .uri("/api/posts/create/")
            .insert_header(bearer(tok))
            .set_json(&json!({"content": content, "is_public": public}))
    };
    let (status, public) = send!(app, create(&a_tok, "hello world", true));
    assert_eq!(status, 201);
    assert_eq!(public["author"]["username"], "alice");
    assert_eq!(public["like_count"], 0);
    let (_, private) = send!(app, create(&a_tok, "just me", false));
    let (_, bob_private) = send!(app, create(&b_tok, "bob only", false));

    let (_, anon) = send!(app, test::TestRequest::get().uri("/api/posts/"));
    let ids: Vec<_> = anon.as_array().unwrap().iter().map(|p| p["id"].clone()).collect();
    assert_eq!(ids, vec![public["id"].clone()]);

    let (_, mine) = send!(app, test::TestRequest::get().uri("/api/posts/").insert_header(bearer(&a_tok)));
    let ids: Vec<_> = mine.as_array().unwrap().iter().map(|p| p["id"].clone()).collect();
    assert_eq!(ids, vec![private["id"].clone(), public["id"].clone()]);
    assert!(!ids.contains(&bob_private["id"]));

    let (status, v) = send!(
        app,
        test::TestRequest::get().uri(&format!("/api/posts/{}/", private["id"])).insert_header(bearer(&b_tok))
    );
    assert_eq!(status, 403);
    assert_eq!(v["error"], "You do not have permission to view this post.");
    let (status, _) = send!(
        app,
        test::TestRequest::get().uri(&format!("/api/posts/{}/", private["id"])).insert_header(bearer(&a_tok))
    );
    assert_eq!(status, 200);
    let (status, _) = send!(app, test::TestRequest::get().uri("/api/posts/424242/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 404);

    let (status, v) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/posts/create/")
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"content": "x".repeat(1001)}))
    );
    assert_eq!(status, 400);
    assert!(v["fields"]["content"].is_array());
}

#[actix_web::test]
#[serial]
async fn reactions_toggle_independently() {
    let (repo, state) = setup();
    let (alice, a_tok) = user(&repo, "alice").await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let (_, post) = send!(
        app,
        test::TestRequest::post().uri("/api/posts/create/").insert_header(bearer(&a_tok)).set_json(&json!({"content":"hi"}))
    );
    let id = &post["id"];

    let (status, v) = send!(app, test::TestRequest::post().uri(&format!("/api/posts/{id}/like/")).insert_header(bearer(&a_tok)));
    assert_eq!(status, 200);
    assert_eq!(v, json!({"message":"You have liked the post.","liked":true,"like_count":1}));

    let (_, v) = send!(app, test::TestRequest::post().uri(&format!("/api/posts/{id}/dislike/")).insert_header(bearer(&a_tok)));
    assert_eq!(v, json!({"message":"You have disliked the post.","disliked":true,"dislike_count":1}));

    let (_, v) = send!(app, test::TestRequest::get().uri(&format!("/api/posts/{id}/")).insert_header(bearer(&a_tok)));
    assert_eq!(v["likes"], json!([alice]));
    assert_eq!(v["is_liked"], true);
    assert_eq!(v["is_disliked"], true);

    let (_, v) = send!(app, test::TestRequest::post().uri(&format!("/api/posts/{id}/like/")).insert_header(bearer(&a_tok)));
    assert_eq!(v, json!({"message":"You have unliked the post.","liked":false,"like_count":0}));
    let (_, v) = send!(app, test::TestRequest::get().uri(&format!("/api/posts/{id}/")).insert_header(bearer(&a_tok)));
    assert_eq!(v["dislike_count"], 1);

    let (status, _) = send!(app, test::TestRequest::post().uri("/api/posts/999/like/").insert_header(bearer(&a_tok)));
    assert_eq!(status, 404);
}

#[actix_web::test]
#[serial]
async fn repost_snapshot_and_edit_policy() {
    let (repo, state) = setup();
    let (_alice, a_tok) = user(&repo, "alice").await;
    let (bob, b_tok) = user(&repo, "bob").await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let (_, origin) = send!(
        app,
        test::TestRequest::post().uri("/api/posts/create/").insert_header(bearer(&a_tok)).set_json(&json!({"content":"original"}))
    );
    let (status, rp) = send!(
        app,
        test::TestRequest::post().uri("/api/posts/repost/").insert_header(bearer(&b_tok)).set_json(&json!({"post_id": origin["id"]}))
    );
    assert_eq!(status, 201);
    assert_eq!(rp["reposted_from"], origin["id"]);
    assert_eq!(rp["reposted_by"], bob);
    assert_eq!(rp["content"], "original");
    assert_eq!(rp["is_public"], true);

    let (status, v) = send!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/posts/{}/", origin["id"]))
            .insert_header(bearer(&b_tok))
            .set_json(&json!({"content":"hijack"}))
    );
    assert_eq!(status, 403);
    assert_eq!(v["error"], "You do not have permission to edit this post.");

    let (status, v) = send!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/posts/{}/", origin["id"]))
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"content":"edited"}))
    );
    assert_eq!(status, 200);
    assert_eq!(v["content"], "edited");
    assert_eq!(v["is_public"], true, "absent fields are untouched");

    let (_, v) = send!(app, test::TestRequest::get().uri(&format!("/api/posts/{}/", rp["id"])).insert_header(bearer(&a_tok)));
    assert_eq!(v["content"], "original");

    let (status, _) = send!(
        app,
        test::TestRequest::post().uri("/api/posts/repost/").insert_header(bearer(&b_tok)).set_json(&json!({"post_id": 9999}))
    );
    assert_eq!(status, 404);
}

#[actix_web::test]
#[serial]
async fn profile_edit_rules() {
    let (repo, state) = setup();
    let (alice, a_tok) = user(&repo, "alice").await;
    let (_bob, b_tok) = user(&repo, "bob").await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let (status, v) = send!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/profiles/{alice}/edit/"))
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"bio":"hi there","date_of_birth":"2000-01-01"}))
    );
    assert_eq!(status, 200);
    assert_eq!(v["bio"], "hi there");
    assert!(v["age"].as_i64().unwrap() >= 24);
    assert_eq!(v["username"], "alice");

    let (status, v) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/profiles/{alice}/"))
            .insert_header(bearer(&b_tok))
            .set_json(&json!({"bio":"pwned"}))
    );
    assert_eq!(status, 403);
    assert_eq!(v["error"], "You do not have permission to edit this profile.");

    let (status, v) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/profiles/{alice}/"))
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"username":"bob","website":"not a url"}))
    );
    assert_eq!(status, 400);
    assert_eq!(v["fields"]["username"][0], "Username is already taken.");
    assert!(v["fields"]["website"].is_array());

    let (status, _) = send!(
        app,
        test::TestRequest::put().uri("/api/profiles/777/").insert_header(bearer(&a_tok)).set_json(&json!({}))
    );
    assert_eq!(status, 404);
}

#[actix_web::test]
#[serial]
async fn comments_and_subcomments_flow() {
    let (repo, state) = setup();
    let (_alice, a_tok) = user(&repo, "alice").await;
    let (_bob, b_tok) = user(&repo, "bob").await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

    let (_, post) = send!(
        app,
        test::TestRequest::post().uri("/api/posts/create/").insert_header(bearer(&a_tok)).set_json(&json!({"content":"topic"}))
    );
    let (status, c) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/comments/create/")
            .insert_header(bearer(&b_tok))
            .set_json(&json!({"post": post["id"], "content": "first!"}))
    );
    assert_eq!(status, 201);
    assert_eq!(c["post"], post["id"]);
    assert_eq!(c["author"]["username"], "bob");

    let (_, list) = send!(app, test::TestRequest::get().uri(&format!("/api/posts/{}/comments/", post["id"])).insert_header(bearer(&a_tok)));
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, v) = send!(app, test::TestRequest::post().uri(&format!("/api/comments/{}/like/", c["id"])).insert_header(bearer(&a_tok)));
    assert_eq!(v, json!({"message":"You have liked the comment.","liked":true,"like_count":1}));

    let (status, _) = send!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/comments/{}/", c["id"]))
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"content":"edited by post author"}))
    );
    assert_eq!(status, 403);

    let (status, v) = send!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/comments/{}/", c["id"]))
            .insert_header(bearer(&b_tok))
            .set_json(&json!({"content": "x".repeat(501)}))
    );
    assert_eq!(status, 400);
    assert!(v["fields"]["content"].is_array());
    let (_, v) = send!(app, test::TestRequest::get().uri(&format!("/api/comments/{}/", c["id"])).insert_header(bearer(&b_tok)));
    assert_eq!(v["content"], "first!");

    let (status, s) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/comments/{}/subcomments/", c["id"]))
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"content":"reply"}))
    );
    assert_eq!(status, 201);
    assert_eq!(s["comment"], c["id"]);

    let (_, subs) = send!(
        app,
        test::TestRequest::get().uri(&format!("/api/comments/{}/subcomments/list/", c["id"])).insert_header(bearer(&b_tok))
    );
    assert_eq!(subs[0]["content"], "reply");

    let (status, v) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/subcomments/{}/", s["id"]))
            .insert_header(bearer(&a_tok))
            .set_json(&json!({"content":"reply, edited"}))
    );
    assert_eq!(status, 200);
    assert_eq!(v["content"], "reply, edited");

    let (_, v) = send!(app, test::TestRequest::post().uri(&format!("/api/subcomments/{}/like/", s["id"])).insert_header(bearer(&b_tok)));
    assert_eq!(v["message"], "You have liked the sub-comment.");

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/comments/create/")
            .insert_header(bearer(&b_tok))
            .set_json(&json!({"post": 31337, "content": "into the void"}))
    );
    assert_eq!(status, 404);
    let (status, v) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/comments/create/")
            .insert_header(bearer(&b_tok))
            .set_json(&json!({"post": post["id"], "content": ""}))
    );
    assert_eq!(status, 400);
    assert!(v["fields"]["content"].is_array());
}
