use log::error;
use sqlx::{Pool, Postgres, Transaction};

use super::*;

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.first_name, u.last_name, u.bio, u.gender, \
    u.profile_picture, u.location, u.phone_number, u.website, u.date_of_birth, u.age, u.created_at";

const POST_SELECT: &str = r#"
    SELECT p.id, p.author_id, p.content, p.image, p.is_public, p.created_at, p.updated_at,
           ARRAY(SELECT l.user_id FROM post_likes l WHERE l.post_id = p.id ORDER BY l.user_id) AS likes,
           ARRAY(SELECT d.user_id FROM post_dislikes d WHERE d.post_id = p.id ORDER BY d.user_id) AS dislikes,
           p.reposted_from, p.reposted_by
    FROM posts p"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, c.content, c.created_at,
           ARRAY(SELECT l.user_id FROM comment_likes l WHERE l.comment_id = c.id ORDER BY l.user_id) AS likes
    FROM comments c"#;

const SUBCOMMENT_SELECT: &str = r#"
    SELECT s.id, s.comment_id, s.author_id, s.content, s.created_at, s.updated_at,
           ARRAY(SELECT l.user_id FROM subcomment_likes l WHERE l.subcomment_id = s.id ORDER BY l.user_id) AS likes
    FROM subcomments s"#;

fn profile_select() -> String {
    format!(
        "SELECT {USER_COLUMNS}, \
         ARRAY(SELECT f.follower_id FROM follows f WHERE f.followee_id = u.id ORDER BY f.follower_id) AS followers, \
         ARRAY(SELECT f.followee_id FROM follows f WHERE f.follower_id = u.id ORDER BY f.followee_id) AS following \
         FROM users u"
    )
}

fn db_err(e: sqlx::Error) -> RepoError {
    match e {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::Conflict,
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => RepoError::NotFound,
        other => {
            error!("postgres error: {other}");
            RepoError::Internal(other.to_string())
        }
    }
}

/// Membership sets backed by a `(parent_id, user_id)` join table.
#[derive(Clone, Copy, Debug)]
enum Membership {
    PostLikes,
    PostDislikes,
    CommentLikes,
    SubCommentLikes,
}

impl Membership {
    /// (parent table, join table, parent key column)
    fn tables(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Membership::PostLikes => ("posts", "post_likes", "post_id"),
            Membership::PostDislikes => ("posts", "post_dislikes", "post_id"),
            Membership::CommentLikes => ("comments", "comment_likes", "comment_id"),
            Membership::SubCommentLikes => ("subcomments", "subcomment_likes", "subcomment_id"),
        }
    }
}

#[derive(Clone)]
pub struct PgRepo { pool: Pool<Postgres> }

impl PgRepo {
    pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn begin(&self) -> RepoResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(db_err)
    }

    async fn exists(&self, table: &'static str, id: Id) -> RepoResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)");
        let (found,): (bool,) = sqlx::query_as(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(found)
    }

    /// Lock the parent row, then flip the membership. The row lock serialises
    /// concurrent toggles on the same entity.
    async fn toggle_membership(&self, set: Membership, parent: Id, user: Id) -> RepoResult<Toggled> {
        let (parent_table, join_table, key) = set.tables();
        let mut tx = self.begin().await?;

        let lock = format!("SELECT id FROM {parent_table} WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, (Id,)>(&lock)
            .bind(parent)
            .fetch_optional(&mut *tx).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;

        let remove = format!("DELETE FROM {join_table} WHERE {key} = $1 AND user_id = $2");
        let removed = sqlx::query(&remove)
            .bind(parent).bind(user)
            .execute(&mut *tx).await.map_err(db_err)?
            .rows_affected();
        let active = if removed == 0 {
            let insert = format!("INSERT INTO {join_table} ({key}, user_id) VALUES ($1, $2)");
            sqlx::query(&insert).bind(parent).bind(user).execute(&mut *tx).await.map_err(db_err)?;
            true
        } else {
            false
        };

        let count_sql = format!("SELECT COUNT(*) FROM {join_table} WHERE {key} = $1");
        let (count,): (i64,) = sqlx::query_as(&count_sql).bind(parent).fetch_one(&mut *tx).await.map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(Toggled { active, count: count as usize })
    }

    /// The edge set belongs to the follower, so the follower row is the lock.
    async fn lock_follow_pair(&self, follower: Id, followee: Id) -> RepoResult<Transaction<'static, Postgres>> {
        if follower == followee {
            return Err(RepoError::SelfFollow);
        }
        let mut tx = self.begin().await?;
        sqlx::query_as::<_, (Id,)>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(follower)
            .fetch_optional(&mut *tx).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;
        sqlx::query_as::<_, (Id,)>("SELECT id FROM users WHERE id = $1")
            .bind(followee)
            .fetch_optional(&mut *tx).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;
        Ok(tx)
    }

    async fn profiles_where(&self, clause: &str, id: Id) -> RepoResult<Vec<Profile>> {
        let sql = format!("{} WHERE {clause} ORDER BY u.id", profile_select());
        sqlx::query_as::<_, Profile>(&sql).bind(id).fetch_all(&self.pool).await.map_err(db_err)
    }
}

async fn remove_edge(tx: &mut Transaction<'static, Postgres>, follower: Id, followee: Id) -> RepoResult<bool> {
    let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
        .bind(follower).bind(followee)
        .execute(&mut **tx).await.map_err(db_err)?
        .rows_affected();
    Ok(removed > 0)
}

async fn insert_edge(tx: &mut Transaction<'static, Postgres>, follower: Id, followee: Id) -> RepoResult<bool> {
    let inserted = sqlx::query("INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(follower).bind(followee)
        .execute(&mut **tx).await.map_err(db_err)?
        .rows_affected();
    Ok(inserted > 0)
}

async fn finish_follow(mut tx: Transaction<'static, Postgres>, followee: Id, active: bool) -> RepoResult<Toggled> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE followee_id = $1")
        .bind(followee).fetch_one(&mut *tx).await.map_err(db_err)?;
    tx.commit().await.map_err(db_err)?;
    Ok(Toggled { active, count: count as usize })
}

/// Subcomment rows hanging off the given comment filter, removed first so the
/// comment rows can go without dangling children.
async fn purge_comments(tx: &mut Transaction<'static, Postgres>, filter: &str, id: Id) -> RepoResult<()> {
    let subs = format!("DELETE FROM subcomments WHERE comment_id IN (SELECT id FROM comments WHERE {filter})");
    sqlx::query(&subs).bind(id).execute(&mut **tx).await.map_err(db_err)?;
    let comments = format!("DELETE FROM comments WHERE {filter}");
    sqlx::query(&comments).bind(id).execute(&mut **tx).await.map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl UserRepo for PgRepo {
    async fn create_user(&self, new: NewUser, password_hash: String) -> RepoResult<User> {
        let mut tx = self.begin().await?;
        let user = sqlx::query_as::<_, User>(r#"
            INSERT INTO users (username, email, first_name, last_name, bio, gender, profile_picture,
                               location, phone_number, website, date_of_birth, age)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            RETURNING id, username, email, first_name, last_name, bio, gender, profile_picture,
                      location, phone_number, website, date_of_birth, age, created_at
        "#)
            .bind(&new.username).bind(&new.email).bind(&new.first_name).bind(&new.last_name)
            .bind(&new.bio).bind(&new.gender).bind(&new.profile_picture).bind(&new.location)
            .bind(&new.phone_number).bind(&new.website).bind(new.date_of_birth)
            .bind(age_from(new.date_of_birth))
            .fetch_one(&mut *tx).await.map_err(db_err)?;
        sqlx::query("INSERT INTO credentials (user_id, password_hash) VALUES ($1, $2)")
            .bind(user.id).bind(&password_hash)
            .execute(&mut *tx).await.map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(user)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        sqlx::query_as::<_, User>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = $1");
        sqlx::query_as::<_, User>(&sql).bind(username).fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        let (found,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username).fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(found)
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let (found,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email).fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(found)
    }

    async fn users_by_ids(&self, ids: &[Id]) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ANY($1)");
        sqlx::query_as::<_, User>(&sql).bind(ids).fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn get_profile(&self, id: Id) -> RepoResult<Profile> {
        let sql = format!("{} WHERE u.id = $1", profile_select());
        sqlx::query_as::<_, Profile>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn list_profiles(&self) -> RepoResult<Vec<Profile>> {
        let sql = format!("{} ORDER BY u.id", profile_select());
        sqlx::query_as::<_, Profile>(&sql).fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn update_user(&self, id: Id, upd: UpdateProfile) -> RepoResult<User> {
        let mut tx = self.begin().await?;
        let mut user = sqlx::query_as::<_, User>(r#"
            UPDATE users u SET
                username = COALESCE($2, username), email = COALESCE($3, email),
                first_name = COALESCE($4, first_name), last_name = COALESCE($5, last_name),
                bio = COALESCE($6, bio), gender = COALESCE($7, gender),
                profile_picture = COALESCE($8, profile_picture), location = COALESCE($9, location),
                phone_number = COALESCE($10, phone_number), website = COALESCE($11, website),
                date_of_birth = COALESCE($12, date_of_birth)
            WHERE u.id = $1
            RETURNING u.id, u.username, u.email, u.first_name, u.last_name, u.bio, u.gender, u.profile_picture,
                      u.location, u.phone_number, u.website, u.date_of_birth, u.age, u.created_at
        "#)
            .bind(id)
            .bind(upd.username.as_ref()).bind(upd.email.as_ref())
            .bind(upd.first_name.as_ref()).bind(upd.last_name.as_ref())
            .bind(upd.bio.as_ref()).bind(upd.gender.as_ref())
            .bind(upd.profile_picture.as_ref()).bind(upd.location.as_ref())
            .bind(upd.phone_number.as_ref()).bind(upd.website.as_ref())
            .bind(upd.date_of_birth)
            .fetch_one(&mut *tx).await.map_err(db_err)?;
        if user.date_of_birth.is_some() {
            user.age = age_from(user.date_of_birth);
            sqlx::query("UPDATE users SET age = $2 WHERE id = $1")
                .bind(id).bind(user.age)
                .execute(&mut *tx).await.map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(user)
    }

    async fn delete_user(&self, id: Id) -> RepoResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query_as::<_, (Id,)>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;

        // content under the user's posts, then the posts themselves
        sqlx::query("UPDATE posts SET reposted_from = NULL WHERE reposted_from IN (SELECT id FROM posts WHERE author_id = $1)")
            .bind(id).execute(&mut *tx).await.map_err(db_err)?;
        purge_comments(&mut tx, "post_id IN (SELECT id FROM posts WHERE author_id = $1)", id).await?;
        sqlx::query("DELETE FROM posts WHERE author_id = $1").bind(id).execute(&mut *tx).await.map_err(db_err)?;

        // the user's own comments and sub-comments elsewhere
        purge_comments(&mut tx, "author_id = $1", id).await?;
        sqlx::query("DELETE FROM subcomments WHERE author_id = $1").bind(id).execute(&mut *tx).await.map_err(db_err)?;
        sqlx::query("UPDATE posts SET reposted_by = NULL WHERE reposted_by = $1").bind(id).execute(&mut *tx).await.map_err(db_err)?;

        // credentials, follow edges and reaction rows cascade from here
        sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&mut *tx).await.map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl CredentialRepo for PgRepo {
    async fn password_hash(&self, user_id: Id) -> RepoResult<String> {
        let (hash,): (String,) = sqlx::query_as("SELECT password_hash FROM credentials WHERE user_id = $1")
            .bind(user_id).fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(hash)
    }
}

#[async_trait]
impl FollowRepo for PgRepo {
    async fn toggle_follow(&self, follower: Id, followee: Id) -> RepoResult<Toggled> {
        let mut tx = self.lock_follow_pair(follower, followee).await?;
        let active = if remove_edge(&mut tx, follower, followee).await? {
            false
        } else {
            insert_edge(&mut tx, follower, followee).await?;
            true
        };
        finish_follow(tx, followee, active).await
    }

    async fn follow(&self, follower: Id, followee: Id) -> RepoResult<Toggled> {
        let mut tx = self.lock_follow_pair(follower, followee).await?;
        if !insert_edge(&mut tx, follower, followee).await? {
            return Err(RepoError::AlreadyFollowing);
        }
        finish_follow(tx, followee, true).await
    }

    async fn unfollow(&self, follower: Id, followee: Id) -> RepoResult<Toggled> {
        let mut tx = self.lock_follow_pair(follower, followee).await?;
        if !remove_edge(&mut tx, follower, followee).await? {
            return Err(RepoError::NotFollowing);
        }
        finish_follow(tx, followee, false).await
    }

    async fn list_followers(&self, user_id: Id) -> RepoResult<Vec<Profile>> {
        if !self.exists("users", user_id).await? { return Err(RepoError::NotFound); }
        self.profiles_where("u.id IN (SELECT follower_id FROM follows WHERE followee_id = $1)", user_id).await
    }

    async fn list_following(&self, user_id: Id) -> RepoResult<Vec<Profile>> {
        if !self.exists("users", user_id).await? { return Err(RepoError::NotFound); }
        self.profiles_where("u.id IN (SELECT followee_id FROM follows WHERE follower_id = $1)", user_id).await
    }
}

#[async_trait]
impl PostRepo for PgRepo {
    async fn create_post(&self, author: Id, new: NewPost) -> RepoResult<Post> {
        let (id,): (Id,) = sqlx::query_as(
            "INSERT INTO posts (author_id, content, image, is_public) VALUES ($1, $2, $3, $4) RETURNING id",
        )
            .bind(author).bind(&new.content).bind(&new.image).bind(new.is_public.unwrap_or(true))
            .fetch_one(&self.pool).await.map_err(db_err)?;
        self.get_post(id).await
    }

    async fn create_repost(&self, actor: Id, origin: Id, is_public: Option<bool>) -> RepoResult<Post> {
        let mut tx = self.begin().await?;
        let (content, image): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT content, image FROM posts WHERE id = $1 FOR SHARE")
                .bind(origin)
                .fetch_optional(&mut *tx).await.map_err(db_err)?
                .ok_or(RepoError::NotFound)?;
        let (id,): (Id,) = sqlx::query_as(r#"
            INSERT INTO posts (author_id, content, image, is_public, reposted_from, reposted_by)
            VALUES ($1, $2, $3, $4, $5, $1) RETURNING id
        "#)
            .bind(actor).bind(content).bind(image).bind(is_public.unwrap_or(true)).bind(origin)
            .fetch_one(&mut *tx).await.map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        self.get_post(id).await
    }

    async fn get_post(&self, id: Id) -> RepoResult<Post> {
        let sql = format!("{POST_SELECT} WHERE p.id = $1");
        sqlx::query_as::<_, Post>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn list_visible_posts(&self, viewer: Option<Id>) -> RepoResult<Vec<Post>> {
        let sql = format!("{POST_SELECT} WHERE p.is_public OR p.author_id = $1 ORDER BY p.created_at DESC, p.id DESC");
        sqlx::query_as::<_, Post>(&sql).bind(viewer).fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn update_post(&self, id: Id, upd: UpdatePost) -> RepoResult<Post> {
        sqlx::query_as::<_, (Id,)>(r#"
            UPDATE posts SET content = COALESCE($2, content), image = COALESCE($3, image),
                             is_public = COALESCE($4, is_public), updated_at = now()
            WHERE id = $1 RETURNING id
        "#)
            .bind(id).bind(upd.content.as_ref()).bind(upd.image.as_ref()).bind(upd.is_public)
            .fetch_optional(&self.pool).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;
        self.get_post(id).await
    }

    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query_as::<_, (Id,)>("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;
        sqlx::query("UPDATE posts SET reposted_from = NULL WHERE reposted_from = $1")
            .bind(id).execute(&mut *tx).await.map_err(db_err)?;
        purge_comments(&mut tx, "post_id = $1", id).await?;
        sqlx::query("DELETE FROM posts WHERE id = $1").bind(id).execute(&mut *tx).await.map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn toggle_post_like(&self, id: Id, user: Id) -> RepoResult<Toggled> {
        self.toggle_membership(Membership::PostLikes, id, user).await
    }

    async fn toggle_post_dislike(&self, id: Id, user: Id) -> RepoResult<Toggled> {
        self.toggle_membership(Membership::PostDislikes, id, user).await
    }
}

#[async_trait]
impl CommentRepo for PgRepo {
    async fn create_comment(&self, author: Id, post: Id, content: String) -> RepoResult<Comment> {
        let (id,): (Id,) = sqlx::query_as("INSERT INTO comments (post_id, author_id, content) VALUES ($1, $2, $3) RETURNING id")
            .bind(post).bind(author).bind(&content)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        self.get_comment(id).await
    }

    async fn get_comment(&self, id: Id) -> RepoResult<Comment> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = $1");
        sqlx::query_as::<_, Comment>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn list_comments(&self, post: Id) -> RepoResult<Vec<Comment>> {
        if !self.exists("posts", post).await? { return Err(RepoError::NotFound); }
        let sql = format!("{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at DESC, c.id DESC");
        sqlx::query_as::<_, Comment>(&sql).bind(post).fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn update_comment(&self, id: Id, content: String) -> RepoResult<Comment> {
        sqlx::query_as::<_, (Id,)>("UPDATE comments SET content = $2 WHERE id = $1 RETURNING id")
            .bind(id).bind(&content)
            .fetch_optional(&self.pool).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;
        self.get_comment(id).await
    }

    async fn delete_comment(&self, id: Id) -> RepoResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query_as::<_, (Id,)>("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;
        purge_comments(&mut tx, "id = $1", id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn toggle_comment_like(&self, id: Id, user: Id) -> RepoResult<Toggled> {
        self.toggle_membership(Membership::CommentLikes, id, user).await
    }
}

#[async_trait]
impl SubCommentRepo for PgRepo {
    async fn create_subcomment(&self, author: Id, comment: Id, content: String) -> RepoResult<SubComment> {
        let (id,): (Id,) = sqlx::query_as("INSERT INTO subcomments (comment_id, author_id, content) VALUES ($1, $2, $3) RETURNING id")
            .bind(comment).bind(author).bind(&content)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        self.get_subcomment(id).await
    }

    async fn get_subcomment(&self, id: Id) -> RepoResult<SubComment> {
        let sql = format!("{SUBCOMMENT_SELECT} WHERE s.id = $1");
        sqlx::query_as::<_, SubComment>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn list_subcomments(&self, comment: Id) -> RepoResult<Vec<SubComment>> {
        if !self.exists("comments", comment).await? { return Err(RepoError::NotFound); }
        let sql = format!("{SUBCOMMENT_SELECT} WHERE s.comment_id = $1 ORDER BY s.created_at DESC, s.id DESC");
        sqlx::query_as::<_, SubComment>(&sql).bind(comment).fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn update_subcomment(&self, id: Id, content: String) -> RepoResult<SubComment> {
        sqlx::query_as::<_, (Id,)>("UPDATE subcomments SET content = $2, updated_at = now() WHERE id = $1 RETURNING id")
            .bind(id).bind(&content)
            .fetch_optional(&self.pool).await.map_err(db_err)?
            .ok_or(RepoError::NotFound)?;
        self.get_subcomment(id).await
    }

    async fn delete_subcomment(&self, id: Id) -> RepoResult<()> {
        let done = sqlx::query("DELETE FROM subcomments WHERE id = $1")
            .bind(id).execute(&self.pool).await.map_err(db_err)?;
        if done.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }

    async fn toggle_subcomment_like(&self, id: Id, user: Id) -> RepoResult<Toggled> {
        self.toggle_membership(Membership::SubCommentLikes, id, user).await
    }
}
