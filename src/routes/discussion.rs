//! Comments on posts and sub-comments on comments.

use actix_web::{web, HttpRequest, HttpResponse};

use super::{throttle, validated, visible_comment, visible_post, with_author, with_authors, Action, AppState};
use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::*;
use crate::policy;
use crate::views::{CommentView, LikeToggleResponse, SubCommentView};

fn comment_author(c: &Comment) -> Id {
    c.author_id
}

fn subcomment_author(s: &SubComment) -> Id {
    s.author_id
}

#[utoipa::path(
    post,
    path = "/api/comments/create/",
    request_body = NewComment,
    responses(
        (status = 201, description = "Comment created", body = CommentView),
        (status = 403, description = "Private post of another user"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn create_comment(
    auth: Auth,
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<NewComment>,
) -> Result<HttpResponse, ApiError> {
    throttle(&data, &req, Action::Post)?;
    let NewComment { post, content } = validated(payload.into_inner())?;
    visible_post(data.repo.as_ref(), auth.user_id, post).await?;
    let comment = data.repo.create_comment(auth.user_id, post, content).await?;
    let view = with_author(data.repo.as_ref(), comment, Some(auth.user_id), comment_author, CommentView::build).await?;
    Ok(HttpResponse::Created().json(view))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}/comments/",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments, newest first", body = [CommentView]),
        (status = 403, description = "Private post of another user"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn list_comments(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = visible_post(data.repo.as_ref(), auth.user_id, path.into_inner()).await?;
    let comments = data.repo.list_comments(post.id).await?;
    let views = with_authors(data.repo.as_ref(), comments, Some(auth.user_id), comment_author, CommentView::build).await?;
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/comments/{id}/",
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment", body = CommentView),
        (status = 403, description = "Under another user's private post"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn get_comment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let comment = visible_comment(data.repo.as_ref(), auth.user_id, path.into_inner()).await?;
    let view = with_author(data.repo.as_ref(), comment, Some(auth.user_id), comment_author, CommentView::build).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    put,
    path = "/api/comments/{id}/",
    request_body = UpdateComment,
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Updated comment", body = CommentView),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn update_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateComment>,
) -> Result<HttpResponse, ApiError> {
    let comment = data.repo.get_comment(path.into_inner()).await?;
    policy::edit_comment(auth.user_id, &comment)?;
    let comment = match validated(payload.into_inner())?.content {
        Some(content) => data.repo.update_comment(comment.id, content).await?,
        None => comment,
    };
    let view = with_author(data.repo.as_ref(), comment, Some(auth.user_id), comment_author, CommentView::build).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    delete,
    path = "/api/comments/{id}/",
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment and its sub-comments removed"),
        (status = 403, description = "Neither the comment author nor the post author"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let comment = data.repo.get_comment(path.into_inner()).await?;
    let post = data.repo.get_post(comment.post_id).await?;
    policy::delete_comment(auth.user_id, &comment, post.author_id)?;
    data.repo.delete_comment(comment.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/comments/{id}/like/",
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "New like state", body = LikeToggleResponse),
        (status = 403, description = "Under another user's private post"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn like_comment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let comment = visible_comment(data.repo.as_ref(), auth.user_id, path.into_inner()).await?;
    let toggled = data.repo.toggle_comment_like(comment.id, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(LikeToggleResponse::new(toggled, "comment")))
}

#[utoipa::path(
    post,
    path = "/api/comments/{id}/subcomments/",
    request_body = NewSubComment,
    params(("id" = Id, Path, description = "Parent comment id")),
    responses(
        (status = 201, description = "Sub-comment created", body = SubCommentView),
        (status = 403, description = "Under another user's private post"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn create_subcomment(
    auth: Auth,
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewSubComment>,
) -> Result<HttpResponse, ApiError> {
    throttle(&data, &req, Action::Post)?;
    let NewSubComment { content } = validated(payload.into_inner())?;
    let parent = visible_comment(data.repo.as_ref(), auth.user_id, path.into_inner()).await?;
    let sub = data.repo.create_subcomment(auth.user_id, parent.id, content).await?;
    let view = with_author(data.repo.as_ref(), sub, Some(auth.user_id), subcomment_author, SubCommentView::build).await?;
    Ok(HttpResponse::Created().json(view))
}

#[utoipa::path(
    get,
    path = "/api/comments/{id}/subcomments/list/",
    params(("id" = Id, Path, description = "Parent comment id")),
    responses(
        (status = 200, description = "Sub-comments, newest first", body = [SubCommentView]),
        (status = 403, description = "Under another user's private post"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn list_subcomments(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let parent = visible_comment(data.repo.as_ref(), auth.user_id, path.into_inner()).await?;
    let subs = data.repo.list_subcomments(parent.id).await?;
    let views = with_authors(data.repo.as_ref(), subs, Some(auth.user_id), subcomment_author, SubCommentView::build).await?;
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/subcomments/{id}/",
    params(("id" = Id, Path, description = "Sub-comment id")),
    responses(
        (status = 200, description = "Sub-comment", body = SubCommentView),
        (status = 403, description = "Under another user's private post"),
        (status = 404, description = "Sub-comment not found")
    )
)]
pub async fn get_subcomment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let sub = data.repo.get_subcomment(path.into_inner()).await?;
    visible_comment(data.repo.as_ref(), auth.user_id, sub.comment_id).await?;
    let view = with_author(data.repo.as_ref(), sub, Some(auth.user_id), subcomment_author, SubCommentView::build).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    put,
    path = "/api/subcomments/{id}/",
    request_body = UpdateSubComment,
    params(("id" = Id, Path, description = "Sub-comment id")),
    responses(
        (status = 200, description = "Updated sub-comment", body = SubCommentView),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Sub-comment not found")
    )
)]
pub async fn update_subcomment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateSubComment>,
) -> Result<HttpResponse, ApiError> {
    let sub = data.repo.get_subcomment(path.into_inner()).await?;
    policy::edit_subcomment(auth.user_id, &sub)?;
    let sub = match validated(payload.into_inner())?.content {
        Some(content) => data.repo.update_subcomment(sub.id, content).await?,
        None => sub,
    };
    let view = with_author(data.repo.as_ref(), sub, Some(auth.user_id), subcomment_author, SubCommentView::build).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    delete,
    path = "/api/subcomments/{id}/",
    params(("id" = Id, Path, description = "Sub-comment id")),
    responses(
        (status = 204, description = "Sub-comment removed"),
        (status = 403, description = "Neither the sub-comment author nor the comment author"),
        (status = 404, description = "Sub-comment not found")
    )
)]
pub async fn delete_subcomment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let sub = data.repo.get_subcomment(path.into_inner()).await?;
    let parent = data.repo.get_comment(sub.comment_id).await?;
    policy::delete_subcomment(auth.user_id, &sub, parent.author_id)?;
    data.repo.delete_subcomment(sub.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/subcomments/{id}/like/",
    params(("id" = Id, Path, description = "Sub-comment id")),
    responses(
        (status = 200, description = "New like state", body = LikeToggleResponse),
        (status = 403, description = "Under another user's private post"),
        (status = 404, description = "Sub-comment not found")
    )
)]
pub async fn like_subcomment(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let sub = data.repo.get_subcomment(path.into_inner()).await?;
    visible_comment(data.repo.as_ref(), auth.user_id, sub.comment_id).await?;
    let toggled = data.repo.toggle_subcomment_like(sub.id, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(LikeToggleResponse::new(toggled, "sub-comment")))
}
