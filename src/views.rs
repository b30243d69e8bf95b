//! Response shapes. Each use case gets its own struct instead of one
//! schema with per-endpoint field lists.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Comment, Id, Post, Profile, SubComment, User};
use crate::toggle::{self, Toggled};

/// What registration echoes back: profile fields, no credentials, no graph.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredUser {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub gender: Option<String>,
    pub profile_picture: Option<String>,
    pub location: String,
    pub phone_number: Option<String>,
    pub website: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
}

impl From<&User> for RegisteredUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            bio: u.bio.clone(),
            gender: u.gender.clone(),
            profile_picture: u.profile_picture.clone(),
            location: u.location.clone(),
            phone_number: u.phone_number.clone(),
            website: u.website.clone(),
            date_of_birth: u.date_of_birth,
            age: u.age,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: RegisteredUser,
    pub message: String,
}

/// Full profile as seen by `viewer`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: RegisteredUser,
    pub followers: Vec<Id>,
    pub following: Vec<Id>,
    pub followers_count: usize,
    pub following_count: usize,
    pub is_following: bool,
}

impl ProfileView {
    pub fn build(p: &Profile, viewer: Option<Id>) -> Self {
        Self {
            user: RegisteredUser::from(&p.user),
            followers_count: p.followers.len(),
            following_count: p.following.len(),
            is_following: viewer.is_some_and(|v| p.followers.binary_search(&v).is_ok()),
            followers: p.followers.clone(),
            following: p.following.clone(),
        }
    }
}

/// Compact author block embedded in content views.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorView {
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
}

impl From<&User> for AuthorView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            profile_picture: u.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostView {
    pub id: Id,
    pub author: AuthorView,
    pub content: Option<String>,
    pub image: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes: Vec<Id>,
    pub dislikes: Vec<Id>,
    pub like_count: usize,
    pub dislike_count: usize,
    pub is_liked: bool,
    pub is_disliked: bool,
    pub reposted_from: Option<Id>,
    pub reposted_by: Option<Id>,
}

impl PostView {
    pub fn build(p: Post, author: AuthorView, viewer: Option<Id>) -> Self {
        Self {
            id: p.id,
            author,
            is_liked: viewer.is_some_and(|v| toggle::contains(&p.likes, v)),
            is_disliked: viewer.is_some_and(|v| toggle::contains(&p.dislikes, v)),
            like_count: p.likes.len(),
            dislike_count: p.dislikes.len(),
            content: p.content,
            image: p.image,
            is_public: p.is_public,
            created_at: p.created_at,
            updated_at: p.updated_at,
            likes: p.likes,
            dislikes: p.dislikes,
            reposted_from: p.reposted_from,
            reposted_by: p.reposted_by,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentView {
    pub id: Id,
    pub post: Id,
    pub author: AuthorView,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Id>,
    pub like_count: usize,
    pub is_liked: bool,
}

impl CommentView {
    pub fn build(c: Comment, author: AuthorView, viewer: Option<Id>) -> Self {
        Self {
            id: c.id,
            post: c.post_id,
            author,
            is_liked: viewer.is_some_and(|v| toggle::contains(&c.likes, v)),
            like_count: c.likes.len(),
            content: c.content,
            created_at: c.created_at,
            likes: c.likes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubCommentView {
    pub id: Id,
    pub comment: Id,
    pub author: AuthorView,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes: Vec<Id>,
    pub like_count: usize,
    pub is_liked: bool,
}

impl SubCommentView {
    pub fn build(s: SubComment, author: AuthorView, viewer: Option<Id>) -> Self {
        Self {
            id: s.id,
            comment: s.comment_id,
            author,
            is_liked: viewer.is_some_and(|v| toggle::contains(&s.likes, v)),
            like_count: s.likes.len(),
            content: s.content,
            created_at: s.created_at,
            updated_at: s.updated_at,
            likes: s.likes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowToggleResponse {
    pub message: String,
    pub is_following: bool,
    pub followers_count: usize,
}

impl From<Toggled> for FollowToggleResponse {
    fn from(t: Toggled) -> Self {
        let message = if t.active { "You are now following the user." } else { "You have unfollowed the user." };
        Self { message: message.into(), is_following: t.active, followers_count: t.count }
    }
}

impl FollowToggleResponse {
    /// Message names the other user, for the explicit follow/unfollow routes.
    pub fn named(t: Toggled, username: &str) -> Self {
        let message = if t.active { format!("You are now following {username}.") } else { format!("You have unfollowed {username}.") };
        Self { message, is_following: t.active, followers_count: t.count }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeToggleResponse {
    pub message: String,
    pub liked: bool,
    pub like_count: usize,
}

impl LikeToggleResponse {
    /// `noun` names the target, e.g. "post" or "sub-comment".
    pub fn new(t: Toggled, noun: &str) -> Self {
        let message = if t.active { format!("You have liked the {noun}.") } else { format!("You have unliked the {noun}.") };
        Self { message, liked: t.active, like_count: t.count }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DislikeToggleResponse {
    pub message: String,
    pub disliked: bool,
    pub dislike_count: usize,
}

impl From<Toggled> for DislikeToggleResponse {
    fn from(t: Toggled) -> Self {
        let message = if t.active { "You have disliked the post." } else { "You have undisliked the post." };
        Self { message: message.into(), disliked: t.active, dislike_count: t.count }
    }
}
