use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub type Id = i64;

/// Profile half of an account. The password hash lives in a separate
/// credential record keyed by the same id and never passes through here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub gender: Option<String>,
    pub profile_picture: Option<String>, // image hash in the image store
    pub location: String,
    pub phone_number: Option<String>,
    pub website: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>, // derived from date_of_birth on every write
    pub created_at: DateTime<Utc>,
}

/// A user together with both directions of the follow graph.
/// `followers` is always read back from the graph, never stored on the row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub user: User,
    pub followers: Vec<Id>,
    pub following: Vec<Id>,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
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
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub username: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 500, message = "Ensure this field has no more than 500 characters."))]
    pub bio: Option<String>,
    #[validate(length(max = 10, message = "Ensure this field has no more than 10 characters."))]
    pub gender: Option<String>,
    pub profile_picture: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub location: Option<String>,
    #[validate(length(max = 15, message = "Ensure this field has no more than 15 characters."))]
    pub phone_number: Option<String>,
    #[validate(url(message = "Enter a valid URL."))]
    pub website: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
    pub password2: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Ensure this field has no more than 500 characters."))]
    pub bio: String,
    #[validate(length(max = 10, message = "Ensure this field has no more than 10 characters."))]
    pub gender: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub location: String,
    #[validate(length(max = 15, message = "Ensure this field has no more than 15 characters."))]
    pub phone_number: Option<String>,
    #[validate(url(message = "Enter a valid URL."))]
    pub website: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl RegisterRequest {
    /// Profile fields only; the passwords stay behind.
    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            bio: self.bio.clone(),
            gender: self.gender.clone(),
            profile_picture: self.profile_picture.clone(),
            location: self.location.clone(),
            phone_number: self.phone_number.clone(),
            website: self.website.clone(),
            date_of_birth: self.date_of_birth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub author_id: Id,
    pub content: Option<String>,
    pub image: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes: Vec<Id>,    // sorted, duplicate-free
    pub dislikes: Vec<Id>, // sorted, duplicate-free
    pub reposted_from: Option<Id>,
    pub reposted_by: Option<Id>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewPost {
    #[validate(length(max = 1000, message = "Ensure this field has no more than 1000 characters."))]
    pub content: Option<String>,
    pub image: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdatePost {
    #[validate(length(max = 1000, message = "Ensure this field has no more than 1000 characters."))]
    pub content: Option<String>,
    pub image: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepostRequest {
    pub post_id: Id,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub post_id: Id,
    pub author_id: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewComment {
    pub post: Id,
    #[validate(length(min = 1, max = 500, message = "Ensure this field has between 1 and 500 characters."))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct SubComment {
    pub id: Id,
    pub comment_id: Id,
    pub author_id: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes: Vec<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewSubComment {
    #[validate(length(min = 1, max = 1000, message = "Ensure this field has between 1 and 1000 characters."))]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateComment {
    #[validate(length(min = 1, max = 500, message = "Ensure this field has between 1 and 500 characters."))]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateSubComment {
    #[validate(length(min = 1, max = 1000, message = "Ensure this field has between 1 and 1000 characters."))]
    pub content: Option<String>,
}

/// Whole years elapsed between `dob` and `today`.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let before_birthday = (today.month(), today.day()) < (dob.month(), dob.day());
    today.year() - dob.year() - i32::from(before_birthday)
}

/// Age as of the current UTC date.
pub fn age_from(dob: Option<NaiveDate>) -> Option<i32> {
    dob.map(|d| age_on(d, Utc::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn age_counts_completed_years_only() {
        assert_eq!(age_on(d(2000, 6, 15), d(2024, 6, 14)), 23);
        assert_eq!(age_on(d(2000, 6, 15), d(2024, 6, 15)), 24);
        assert_eq!(age_on(d(2000, 6, 15), d(2024, 12, 1)), 24);
    }

    #[test]
    fn leap_day_birthday() {
        assert_eq!(age_on(d(2004, 2, 29), d(2023, 2, 28)), 18);
        assert_eq!(age_on(d(2004, 2, 29), d(2023, 3, 1)), 19);
    }
}
