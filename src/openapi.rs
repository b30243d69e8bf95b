use crate::auth::TokenPair;
use crate::models::{
    LoginRequest, NewComment, NewPost, NewSubComment, RefreshRequest, RegisterRequest, RepostRequest, UpdateComment,
    UpdatePost, UpdateProfile, UpdateSubComment,
};
use crate::routes::{accounts, discussion, images, posts};
use crate::views::{
    AuthorView, CommentView, DislikeToggleResponse, FollowToggleResponse, LikeToggleResponse, PostView, ProfileView,
    RegisterResponse, RegisteredUser, SubCommentView,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::obtain_token,
        accounts::refresh_token,
        accounts::register,
        accounts::list_profiles,
        accounts::get_profile,
        accounts::update_profile,
        accounts::toggle_follow,
        accounts::follow,
        accounts::unfollow,
        accounts::list_followers,
        accounts::list_following,
        posts::list_posts,
        posts::create_post,
        posts::repost,
        posts::get_post,
        posts::update_post,
        posts::delete_post,
        posts::like_post,
        posts::dislike_post,
        discussion::create_comment,
        discussion::list_comments,
        discussion::get_comment,
        discussion::update_comment,
        discussion::delete_comment,
        discussion::like_comment,
        discussion::create_subcomment,
        discussion::list_subcomments,
        discussion::get_subcomment,
        discussion::update_subcomment,
        discussion::delete_subcomment,
        discussion::like_subcomment,
        images::upload_image,
        images::get_image,
    ),
    components(schemas(
        LoginRequest, RefreshRequest, TokenPair, accounts::AccessToken,
        RegisterRequest, RegisterResponse, RegisteredUser, UpdateProfile, ProfileView, FollowToggleResponse,
        NewPost, UpdatePost, RepostRequest, PostView, AuthorView, LikeToggleResponse, DislikeToggleResponse,
        NewComment, NewSubComment, UpdateComment, UpdateSubComment, CommentView, SubCommentView,
        images::ImageUploadResponse
    ))
)]
pub struct ApiDoc;
