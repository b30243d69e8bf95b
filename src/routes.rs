use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpRequest};
use validator::Validate;

use crate::error::{push_field, ApiError, FieldErrors};
use crate::models::{Comment, Id, Post};
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;
use crate::storage::{is_valid_hash, ImageStore};
use crate::views::AuthorView;

pub mod accounts;
pub mod discussion;
pub mod images;
pub mod posts;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("rejected json body: {err}");
        ApiError::field("body", &err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|_err, _req| ApiError::NotFound.into()));

    cfg.service(
        web::scope("/api")
            // identity
            .service(web::resource("/token/").route(web::post().to(accounts::obtain_token)))
            .service(web::resource("/token/refresh/").route(web::post().to(accounts::refresh_token)))
            .service(web::resource("/register/").route(web::post().to(accounts::register)))
            .service(web::resource("/profiles/").route(web::get().to(accounts::list_profiles)))
            .service(
                web::resource("/profiles/{id}/")
                    .route(web::get().to(accounts::get_profile))
                    .route(web::put().to(accounts::update_profile))
                    .route(web::patch().to(accounts::update_profile)),
            )
            .service(
                web::resource("/profiles/{id}/edit/")
                    .route(web::put().to(accounts::update_profile))
                    .route(web::patch().to(accounts::update_profile)),
            )
            .service(web::resource("/follow-unfollow/{username}/").route(web::post().to(accounts::toggle_follow)))
            .service(web::resource("/follow/{username}/").route(web::post().to(accounts::follow)))
            .service(web::resource("/unfollow/{username}/").route(web::post().to(accounts::unfollow)))
            // posts: fixed paths before `{id}`
            .service(web::resource("/posts/").route(web::get().to(posts::list_posts)))
            .service(web::resource("/posts/create/").route(web::post().to(posts::create_post)))
            .service(web::resource("/posts/repost/").route(web::post().to(posts::repost)))
            .service(
                web::resource("/posts/{id}/")
                    .route(web::get().to(posts::get_post))
                    .route(web::put().to(posts::update_post))
                    .route(web::patch().to(posts::update_post))
                    .route(web::delete().to(posts::delete_post)),
            )
            .service(web::resource("/posts/{id}/like/").route(web::post().to(posts::like_post)))
            .service(web::resource("/posts/{id}/dislike/").route(web::post().to(posts::dislike_post)))
            .service(web::resource("/posts/{id}/comments/").route(web::get().to(discussion::list_comments)))
            // comments
            .service(web::resource("/comments/create/").route(web::post().to(discussion::create_comment)))
            .service(
                web::resource("/comments/{id}/")
                    .route(web::get().to(discussion::get_comment))
                    .route(web::put().to(discussion::update_comment))
                    .route(web::patch().to(discussion::update_comment))
                    .route(web::delete().to(discussion::delete_comment)),
            )
            .service(web::resource("/comments/{id}/like/").route(web::post().to(discussion::like_comment)))
            .service(web::resource("/comments/{id}/subcomments/").route(web::post().to(discussion::create_subcomment)))
            .service(web::resource("/comments/{id}/subcomments/list/").route(web::get().to(discussion::list_subcomments)))
            .service(
                web::resource("/subcomments/{id}/")
                    .route(web::get().to(discussion::get_subcomment))
                    .route(web::put().to(discussion::update_subcomment))
                    .route(web::patch().to(discussion::update_subcomment))
                    .route(web::delete().to(discussion::delete_subcomment)),
            )
            .service(web::resource("/subcomments/{id}/like/").route(web::post().to(discussion::like_subcomment)))
            .service(web::resource("/images/").route(web::post().to(images::upload_image)))
            // username-addressed lists last so they never shadow fixed prefixes
            .service(web::resource("/{username}/followers/").route(web::get().to(accounts::list_followers)))
            .service(web::resource("/{username}/following/").route(web::get().to(accounts::list_following))),
    );
    // outside /api so stored hashes can be used directly as <img src>
    cfg.route("/images/{hash}", web::get().to(images::get_image));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub image_store: Arc<dyn ImageStore>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, image_store: Arc<dyn ImageStore>) -> Self {
        Self { repo, image_store, rate_limiter: None }
    }

    pub fn with_rate_limiter(mut self, limiter: Option<RateLimiterFacade>) -> Self {
        self.rate_limiter = limiter;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    Login,
    Register,
    Post,
}

/// 429 when the per-IP limiter is configured and the window is full.
pub(crate) fn throttle(state: &AppState, req: &HttpRequest, action: Action) -> Result<(), ApiError> {
    let Some(limiter) = &state.rate_limiter else { return Ok(()) };
    let info = req.connection_info();
    let ip = info.realip_remote_addr().unwrap_or("unknown");
    let allowed = match action {
        Action::Login => limiter.allow_login(ip),
        Action::Register => limiter.allow_register(ip),
        Action::Post => limiter.allow_post(ip),
    };
    if allowed {
        Ok(())
    } else {
        log::warn!("rate limited {action:?} from {ip}");
        Err(ApiError::TooManyRequests)
    }
}

pub(crate) fn validated<T: Validate>(value: T) -> Result<T, ApiError> {
    value.validate()?;
    Ok(value)
}

/// Image fields hold a content hash returned by the upload endpoint.
pub(crate) fn check_image_ref(fields: &mut FieldErrors, name: &str, value: Option<&str>) {
    if let Some(hash) = value {
        if !is_valid_hash(hash) {
            push_field(fields, name, "Upload the image first and pass its hash.");
        }
    }
}

/// Load a post the viewer may see; another user's private post is a 403.
pub(crate) async fn visible_post(repo: &dyn Repo, viewer: Id, id: Id) -> Result<Post, ApiError> {
    let post = repo.get_post(id).await?;
    crate::policy::view_post(viewer, &post)?;
    Ok(post)
}

/// A comment is visible exactly when its post is.
pub(crate) async fn visible_comment(repo: &dyn Repo, viewer: Id, id: Id) -> Result<Comment, ApiError> {
    let comment = repo.get_comment(id).await?;
    visible_post(repo, viewer, comment.post_id).await?;
    Ok(comment)
}

/// Attach author blocks to `items`, fetching every author in one call.
pub(crate) async fn with_authors<T, V>(
    repo: &dyn Repo,
    items: Vec<T>,
    viewer: Option<Id>,
    author_of: impl Fn(&T) -> Id,
    build: impl Fn(T, AuthorView, Option<Id>) -> V,
) -> Result<Vec<V>, ApiError> {
    let mut ids: Vec<Id> = items.iter().map(&author_of).collect();
    ids.sort_unstable();
    ids.dedup();
    let authors: HashMap<Id, AuthorView> = repo
        .users_by_ids(&ids)
        .await?
        .iter()
        .map(|u| (u.id, AuthorView::from(u)))
        .collect();
    items
        .into_iter()
        .map(|item| {
            let id = author_of(&item);
            let author = authors.get(&id).cloned().ok_or_else(|| {
                log::error!("content references missing author {id}");
                ApiError::Internal
            })?;
            Ok(build(item, author, viewer))
        })
        .collect()
}

pub(crate) async fn with_author<T, V>(
    repo: &dyn Repo,
    item: T,
    viewer: Option<Id>,
    author_of: impl Fn(&T) -> Id,
    build: impl Fn(T, AuthorView, Option<Id>) -> V,
) -> Result<V, ApiError> {
    with_authors(repo, vec![item], viewer, author_of, build)
        .await?
        .pop()
        .ok_or(ApiError::Internal)
}
