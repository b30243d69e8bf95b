use async_trait::async_trait;

use crate::graph::FollowError;
use crate::models::*;
use crate::toggle::Toggled;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("cannot follow yourself")] SelfFollow,
    #[error("already following")] AlreadyFollowing,
    #[error("not following")] NotFollowing,
    #[error("internal: {0}")] Internal(String),
}

impl From<FollowError> for RepoError {
    fn from(e: FollowError) -> Self {
        match e {
            FollowError::SelfFollow => RepoError::SelfFollow,
            FollowError::AlreadyFollowing => RepoError::AlreadyFollowing,
            FollowError::NotFollowing => RepoError::NotFollowing,
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `Conflict` when the username or email is already taken.
    async fn create_user(&self, new: NewUser, password_hash: String) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<User>;
    async fn username_exists(&self, username: &str) -> RepoResult<bool>;
    async fn email_exists(&self, email: &str) -> RepoResult<bool>;
    /// Missing ids are skipped, not reported.
    async fn users_by_ids(&self, ids: &[Id]) -> RepoResult<Vec<User>>;
    async fn get_profile(&self, id: Id) -> RepoResult<Profile>;
    async fn list_profiles(&self) -> RepoResult<Vec<Profile>>;
    async fn update_user(&self, id: Id, upd: UpdateProfile) -> RepoResult<User>;
    /// Removes the account and everything it owns: posts, comments,
    /// sub-comments, follow edges and reaction memberships.
    async fn delete_user(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CredentialRepo: Send + Sync {
    async fn password_hash(&self, user_id: Id) -> RepoResult<String>;
}

#[async_trait]
pub trait FollowRepo: Send + Sync {
    /// Atomic follow/unfollow; the count is the followee's follower count.
    async fn toggle_follow(&self, follower: Id, followee: Id) -> RepoResult<Toggled>;
    /// Non-flipping variants: `AlreadyFollowing` / `NotFollowing` instead of toggling.
    async fn follow(&self, follower: Id, followee: Id) -> RepoResult<Toggled>;
    async fn unfollow(&self, follower: Id, followee: Id) -> RepoResult<Toggled>;
    async fn list_followers(&self, user_id: Id) -> RepoResult<Vec<Profile>>;
    async fn list_following(&self, user_id: Id) -> RepoResult<Vec<Profile>>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, author: Id, new: NewPost) -> RepoResult<Post>;
    /// Snapshot `origin`'s content and image into a fresh post owned by `actor`.
    async fn create_repost(&self, actor: Id, origin: Id, is_public: Option<bool>) -> RepoResult<Post>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    /// Public posts plus the viewer's own, newest first.
    async fn list_visible_posts(&self, viewer: Option<Id>) -> RepoResult<Vec<Post>>;
    async fn update_post(&self, id: Id, upd: UpdatePost) -> RepoResult<Post>;
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
    async fn toggle_post_like(&self, id: Id, user: Id) -> RepoResult<Toggled>;
    async fn toggle_post_dislike(&self, id: Id, user: Id) -> RepoResult<Toggled>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, author: Id, post: Id, content: String) -> RepoResult<Comment>;
    async fn get_comment(&self, id: Id) -> RepoResult<Comment>;
    async fn list_comments(&self, post: Id) -> RepoResult<Vec<Comment>>;
    async fn update_comment(&self, id: Id, content: String) -> RepoResult<Comment>;
    async fn delete_comment(&self, id: Id) -> RepoResult<()>;
    async fn toggle_comment_like(&self, id: Id, user: Id) -> RepoResult<Toggled>;
}

#[async_trait]
pub trait SubCommentRepo: Send + Sync {
    async fn create_subcomment(&self, author: Id, comment: Id, content: String) -> RepoResult<SubComment>;
    async fn get_subcomment(&self, id: Id) -> RepoResult<SubComment>;
    async fn list_subcomments(&self, comment: Id) -> RepoResult<Vec<SubComment>>;
    async fn update_subcomment(&self, id: Id, content: String) -> RepoResult<SubComment>;
    async fn delete_subcomment(&self, id: Id) -> RepoResult<()>;
    async fn toggle_subcomment_like(&self, id: Id, user: Id) -> RepoResult<Toggled>;
}

pub trait Repo: UserRepo + CredentialRepo + FollowRepo + PostRepo + CommentRepo + SubCommentRepo {}

impl<T> Repo for T where
    T: UserRepo + CredentialRepo + FollowRepo + PostRepo + CommentRepo + SubCommentRepo
{
}

#[cfg(feature = "inmem-store")]
pub mod inmem;

#[cfg(feature = "postgres-store")]
pub mod pg;
