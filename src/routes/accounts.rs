use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use super::{check_image_ref, throttle, Action, AppState};
use crate::auth::{issue_token_pair, refresh_access, Auth, AuthError};
use crate::error::{collect_field_errors, push_field, ApiError, FieldErrors};
use crate::models::*;
use crate::password::{check_strength, hash_password, verify_password};
use crate::policy;
use crate::repo::RepoError;
use crate::views::{FollowToggleResponse, ProfileView, RegisterResponse, RegisteredUser};

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessToken {
    pub access: String,
}

#[utoipa::path(
    post,
    path = "/api/token/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = crate::auth::TokenPair),
        (status = 401, description = "Bad credentials"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn obtain_token(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    throttle(&data, &req, Action::Login)?;
    let LoginRequest { username, password } = payload.into_inner();
    let user = match data.repo.find_user_by_username(&username).await {
        Ok(u) => u,
        Err(RepoError::NotFound) => return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into())),
        Err(e) => return Err(e.into()),
    };
    let stored = data.repo.password_hash(user.id).await?;
    if !verify_password(&password, &stored)? {
        log::info!("failed login for user {}", user.id);
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    }
    let profile = data.repo.get_profile(user.id).await?;
    Ok(HttpResponse::Ok().json(issue_token_pair(&profile)?))
}

#[utoipa::path(
    post,
    path = "/api/token/refresh/",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Refresh token invalid, expired or of the wrong type")
    )
)]
pub async fn refresh_token(payload: web::Json<RefreshRequest>) -> Result<HttpResponse, ApiError> {
    let access = refresh_access(&payload.refresh).map_err(|e| match e {
        AuthError::MissingSecret => ApiError::from(e),
        _ => ApiError::Unauthorized("Token is invalid or expired".into()),
    })?;
    Ok(HttpResponse::Ok().json(AccessToken { access }))
}

#[utoipa::path(
    post,
    path = "/api/register/",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Field-keyed validation errors"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn register(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    throttle(&data, &req, Action::Register)?;
    let body = payload.into_inner();

    let mut fields = body.validate().err().map(|e| collect_field_errors(&e)).unwrap_or_default();
    if data.repo.username_exists(&body.username).await? {
        push_field(&mut fields, "username", "Username is already taken.");
    }
    if data.repo.email_exists(&body.email).await? {
        push_field(&mut fields, "email", "Email is already in use.");
    }
    if body.password != body.password2 {
        push_field(&mut fields, "password", "Password fields do not match.");
    }
    if let Err(msg) = check_strength(&body.password) {
        push_field(&mut fields, "password", msg);
    }
    check_image_ref(&mut fields, "profile_picture", body.profile_picture.as_deref());
    ApiError::check(fields)?;

    let hash = hash_password(&body.password)?;
    let user = match data.repo.create_user(body.to_new_user(), hash).await {
        Ok(u) => u,
        Err(e) => return Err(uniqueness_error(&data, e, Some(&body.username)).await),
    };
    log::info!("registered user {} ({})", user.id, user.username);
    Ok(HttpResponse::Created().json(RegisterResponse {
        user: RegisteredUser::from(&user),
        message: "User created successfully".into(),
    }))
}

/// A `Conflict` here means a concurrent write took the username or email
/// after the pre-checks passed. Reported like the pre-check would have.
async fn uniqueness_error(data: &AppState, e: RepoError, username: Option<&str>) -> ApiError {
    if !matches!(e, RepoError::Conflict) {
        return e.into();
    }
    let taken = match username {
        Some(u) => data.repo.username_exists(u).await.unwrap_or(false),
        None => false,
    };
    if taken {
        ApiError::field("username", "Username is already taken.")
    } else {
        ApiError::field("email", "Email is already in use.")
    }
}

#[utoipa::path(
    get,
    path = "/api/profiles/",
    responses(
        (status = 200, description = "All profiles", body = [ProfileView]),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn list_profiles(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profiles = data.repo.list_profiles().await?;
    let views: Vec<ProfileView> = profiles.iter().map(|p| ProfileView::build(p, Some(auth.user_id))).collect();
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/profiles/{id}/",
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile", body = ProfileView),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_profile(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.get_profile(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ProfileView::build(&profile, Some(auth.user_id))))
}

#[utoipa::path(
    put,
    path = "/api/profiles/{id}/",
    request_body = UpdateProfile,
    params(("id" = Id, Path, description = "User id")),
    responses(
        (status = 200, description = "Updated profile", body = ProfileView),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not your profile"),
        (status = 404, description = "No such user")
    )
)]
pub async fn update_profile(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateProfile>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let current = data.repo.get_user(id).await?;
    policy::edit_profile(auth.user_id, current.id)?;

    let upd = payload.into_inner();
    let mut fields: FieldErrors = upd.validate().err().map(|e| collect_field_errors(&e)).unwrap_or_default();
    if let Some(username) = upd.username.as_deref().filter(|u| *u != current.username) {
        if data.repo.username_exists(username).await? {
            push_field(&mut fields, "username", "Username is already taken.");
        }
    }
    if let Some(email) = upd.email.as_deref().filter(|e| *e != current.email) {
        if data.repo.email_exists(email).await? {
            push_field(&mut fields, "email", "Email is already in use.");
        }
    }
    check_image_ref(&mut fields, "profile_picture", upd.profile_picture.as_deref());
    ApiError::check(fields)?;

    let renamed = upd.username.clone().filter(|u| *u != current.username);
    if let Err(e) = data.repo.update_user(id, upd).await {
        return Err(uniqueness_error(&data, e, renamed.as_deref()).await);
    }
    let profile = data.repo.get_profile(id).await?;
    Ok(HttpResponse::Ok().json(ProfileView::build(&profile, Some(auth.user_id))))
}

#[utoipa::path(
    post,
    path = "/api/follow-unfollow/{username}/",
    params(("username" = String, Path, description = "User to follow or unfollow")),
    responses(
        (status = 200, description = "New follow state", body = FollowToggleResponse),
        (status = 400, description = "Tried to follow yourself"),
        (status = 404, description = "No such user")
    )
)]
pub async fn toggle_follow(auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let target = data.repo.find_user_by_username(&path.into_inner()).await?;
    if target.id == auth.user_id {
        return Err(ApiError::from(RepoError::SelfFollow));
    }
    let toggled = data.repo.toggle_follow(auth.user_id, target.id).await?;
    Ok(HttpResponse::Ok().json(FollowToggleResponse::from(toggled)))
}

#[utoipa::path(
    post,
    path = "/api/follow/{username}/",
    params(("username" = String, Path, description = "User to follow")),
    responses(
        (status = 200, description = "Now following", body = FollowToggleResponse),
        (status = 400, description = "Yourself, or already following"),
        (status = 404, description = "No such user")
    )
)]
pub async fn follow(auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let target = data.repo.find_user_by_username(&path.into_inner()).await?;
    if target.id == auth.user_id {
        return Err(ApiError::field("username", "You cannot follow yourself."));
    }
    let followed = data.repo.follow(auth.user_id, target.id).await?;
    Ok(HttpResponse::Ok().json(FollowToggleResponse::named(followed, &target.username)))
}

#[utoipa::path(
    post,
    path = "/api/unfollow/{username}/",
    params(("username" = String, Path, description = "User to stop following")),
    responses(
        (status = 200, description = "No longer following", body = FollowToggleResponse),
        (status = 400, description = "Yourself, or not following"),
        (status = 404, description = "No such user")
    )
)]
pub async fn unfollow(auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let target = data.repo.find_user_by_username(&path.into_inner()).await?;
    if target.id == auth.user_id {
        return Err(ApiError::field("username", "You cannot unfollow yourself."));
    }
    let unfollowed = data.repo.unfollow(auth.user_id, target.id).await?;
    Ok(HttpResponse::Ok().json(FollowToggleResponse::named(unfollowed, &target.username)))
}

#[utoipa::path(
    get,
    path = "/api/{username}/followers/",
    params(("username" = String, Path, description = "User whose followers to list")),
    responses(
        (status = 200, description = "Followers", body = [ProfileView]),
        (status = 404, description = "No such user")
    )
)]
pub async fn list_followers(auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user = data.repo.find_user_by_username(&path.into_inner()).await?;
    let profiles = data.repo.list_followers(user.id).await?;
    let views: Vec<ProfileView> = profiles.iter().map(|p| ProfileView::build(p, Some(auth.user_id))).collect();
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/{username}/following/",
    params(("username" = String, Path, description = "User whose followees to list")),
    responses(
        (status = 200, description = "Followed users", body = [ProfileView]),
        (status = 404, description = "No such user")
    )
)]
pub async fn list_following(auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user = data.repo.find_user_by_username(&path.into_inner()).await?;
    let profiles = data.repo.list_following(user.id).await?;
    let views: Vec<ProfileView> = profiles.iter().map(|p| ProfileView::build(p, Some(auth.user_id))).collect();
    Ok(HttpResponse::Ok().json(views))
}
