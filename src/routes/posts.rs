use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use super::{check_image_ref, throttle, validated, visible_post, with_author, with_authors, Action, AppState};
use crate::auth::Auth;
use crate::error::{collect_field_errors, ApiError, FieldErrors};
use crate::models::*;
use crate::policy;
use crate::views::{DislikeToggleResponse, LikeToggleResponse, PostView};

fn author_of(p: &Post) -> Id {
    p.author_id
}

async fn render(data: &AppState, post: Post, viewer: Option<Id>) -> Result<PostView, ApiError> {
    with_author(data.repo.as_ref(), post, viewer, author_of, PostView::build).await
}

#[utoipa::path(
    get,
    path = "/api/posts/",
    responses(
        (status = 200, description = "Public posts plus the caller's own, newest first", body = [PostView])
    )
)]
pub async fn list_posts(auth: Option<Auth>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let viewer = auth.map(|a| a.user_id);
    let posts = data.repo.list_visible_posts(viewer).await?;
    let views = with_authors(data.repo.as_ref(), posts, viewer, author_of, PostView::build).await?;
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    post,
    path = "/api/posts/create/",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = PostView),
        (status = 400, description = "Validation failed"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn create_post(
    auth: Auth,
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<NewPost>,
) -> Result<HttpResponse, ApiError> {
    throttle(&data, &req, Action::Post)?;
    let new = payload.into_inner();
    let mut fields: FieldErrors = new.validate().err().map(|e| collect_field_errors(&e)).unwrap_or_default();
    check_image_ref(&mut fields, "image", new.image.as_deref());
    ApiError::check(fields)?;

    let post = data.repo.create_post(auth.user_id, new).await?;
    Ok(HttpResponse::Created().json(render(&data, post, Some(auth.user_id)).await?))
}

#[utoipa::path(
    post,
    path = "/api/posts/repost/",
    request_body = RepostRequest,
    responses(
        (status = 201, description = "Repost created with the origin's content and image", body = PostView),
        (status = 403, description = "Origin is another user's private post"),
        (status = 404, description = "Origin post not found")
    )
)]
pub async fn repost(
    auth: Auth,
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<RepostRequest>,
) -> Result<HttpResponse, ApiError> {
    throttle(&data, &req, Action::Post)?;
    let RepostRequest { post_id, is_public } = payload.into_inner();
    visible_post(data.repo.as_ref(), auth.user_id, post_id).await?;
    let post = data.repo.create_repost(auth.user_id, post_id, is_public).await?;
    log::info!("user {} reposted post {post_id} as {}", auth.user_id, post.id);
    Ok(HttpResponse::Created().json(render(&data, post, Some(auth.user_id)).await?))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}/",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = PostView),
        (status = 403, description = "Private post of another user"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = visible_post(data.repo.as_ref(), auth.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(render(&data, post, Some(auth.user_id)).await?))
}

#[utoipa::path(
    put,
    path = "/api/posts/{id}/",
    request_body = UpdatePost,
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Updated post", body = PostView),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn update_post(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdatePost>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    policy::edit_post(auth.user_id, &post)?;
    let upd = validated(payload.into_inner())?;
    let mut fields = FieldErrors::new();
    check_image_ref(&mut fields, "image", upd.image.as_deref());
    ApiError::check(fields)?;

    let post = data.repo.update_post(post.id, upd).await?;
    Ok(HttpResponse::Ok().json(render(&data, post, Some(auth.user_id)).await?))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}/",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post, its comments and their sub-comments removed"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    policy::delete_post(auth.user_id, &post)?;
    data.repo.delete_post(post.id).await?;
    log::info!("user {} deleted post {}", auth.user_id, post.id);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/like/",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "New like state", body = LikeToggleResponse),
        (status = 403, description = "Private post of another user"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn like_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = visible_post(data.repo.as_ref(), auth.user_id, path.into_inner()).await?;
    let toggled = data.repo.toggle_post_like(post.id, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(LikeToggleResponse::new(toggled, "post")))
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/dislike/",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "New dislike state", body = DislikeToggleResponse),
        (status = 403, description = "Private post of another user"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn dislike_post(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = visible_post(data.repo.as_ref(), auth.user_id, path.into_inner()).await?;
    let toggled = data.repo.toggle_post_dislike(post.id, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(DislikeToggleResponse::from(toggled)))
}
