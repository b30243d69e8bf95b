use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::*;
use crate::graph::FollowGraph;
use crate::toggle;

const SNAPSHOT_FILE: &str = "state.json";

#[derive(Default, Serialize, Deserialize)]
struct State {
    users: BTreeMap<Id, User>,
    credentials: HashMap<Id, String>,
    graph: FollowGraph,
    posts: BTreeMap<Id, Post>,
    comments: BTreeMap<Id, Comment>,
    subcomments: BTreeMap<Id, SubComment>,
    next_id: Id,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: Id) -> RepoResult<&User> {
        self.users.get(&id).ok_or(RepoError::NotFound)
    }

    fn profile(&self, user: &User) -> Profile {
        Profile {
            user: user.clone(),
            followers: self.graph.followers(user.id),
            following: self.graph.following(user.id),
        }
    }

    fn profiles(&self, ids: Vec<Id>) -> Vec<Profile> {
        ids.into_iter()
            .filter_map(|id| self.users.get(&id))
            .map(|u| self.profile(u))
            .collect()
    }

    fn username_taken(&self, username: &str, except: Option<Id>) -> bool {
        self.users.values().any(|u| u.username == username && Some(u.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<Id>) -> bool {
        self.users.values().any(|u| u.email == email && Some(u.id) != except)
    }

    fn remove_subcomment(&mut self, id: Id) {
        self.subcomments.remove(&id);
    }

    fn remove_comment(&mut self, id: Id) {
        let children: Vec<Id> = self
            .subcomments
            .values()
            .filter(|s| s.comment_id == id)
            .map(|s| s.id)
            .collect();
        for sid in children {
            self.remove_subcomment(sid);
        }
        self.comments.remove(&id);
    }

    fn remove_post(&mut self, id: Id) {
        for repost in self.posts.values_mut().filter(|p| p.reposted_from == Some(id)) {
            repost.reposted_from = None;
        }
        let comments: Vec<Id> = self.comments.values().filter(|c| c.post_id == id).map(|c| c.id).collect();
        for cid in comments {
            self.remove_comment(cid);
        }
        self.posts.remove(&id);
    }

    fn remove_user(&mut self, id: Id) {
        let posts: Vec<Id> = self.posts.values().filter(|p| p.author_id == id).map(|p| p.id).collect();
        for pid in posts {
            self.remove_post(pid);
        }
        let comments: Vec<Id> = self.comments.values().filter(|c| c.author_id == id).map(|c| c.id).collect();
        for cid in comments {
            self.remove_comment(cid);
        }
        self.subcomments.retain(|_, s| s.author_id != id);

        for p in self.posts.values_mut() {
            if p.reposted_by == Some(id) {
                p.reposted_by = None;
            }
            toggle::forget(&mut p.likes, id);
            toggle::forget(&mut p.dislikes, id);
        }
        for c in self.comments.values_mut() {
            toggle::forget(&mut c.likes, id);
        }
        for s in self.subcomments.values_mut() {
            toggle::forget(&mut s.likes, id);
        }
        self.graph.remove_user(id);
        self.credentials.remove(&id);
        self.users.remove(&id);
    }
}

fn newest_first<T>(v: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Id)) {
    v.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// Process-local store. Every operation runs under one lock acquisition,
/// which is what makes toggles and cascading deletes atomic. When a snapshot
/// path is configured the whole state is written out after each mutation.
#[derive(Clone)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl InMemRepo {
    fn data_dir() -> PathBuf {
        std::env::var("CIRCLE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"))
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    info!("[inmem] loaded snapshot '{}'", path.display());
                    s
                }
                Err(e) => {
                    warn!("[inmem] failed to parse snapshot '{}': {e}. Starting empty.", path.display());
                    State::default()
                }
            },
            Err(e) => {
                info!("[inmem] no snapshot at '{}': {e}. Starting empty.", path.display());
                State::default()
            }
        }
    }

    /// Persistent store rooted at `$CIRCLE_DATA_DIR` (default `data/`).
    pub fn new() -> Self {
        let mut path = Self::data_dir();
        path.push(SNAPSHOT_FILE);
        Self::with_snapshot(path)
    }

    pub fn with_snapshot(path: PathBuf) -> Self {
        let state = Self::load_state_from(&path);
        Self {
            state: Arc::new(RwLock::new(state)),
            snapshot_path: Some(Arc::new(path)),
        }
    }

    /// Store that never touches the filesystem.
    pub fn ephemeral() -> Self {
        Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
    }

    fn persist(&self, state: &State) {
        let Some(path) = self.snapshot_path.as_deref() else { return };
        match serde_json::to_vec_pretty(state) {
            Ok(bytes) => {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(path, bytes) {
                    error!("[inmem] failed to write snapshot '{}': {e}", path.display());
                }
            }
            Err(e) => error!("[inmem] failed to serialise snapshot: {e}"),
        }
    }

    fn inspect<T>(&self, f: impl FnOnce(&State) -> RepoResult<T>) -> RepoResult<T> {
        let s = self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))?;
        f(&s)
    }

    /// Run `f` under the write lock; the snapshot is written only if it succeeds.
    fn mutate<T>(&self, f: impl FnOnce(&mut State) -> RepoResult<T>) -> RepoResult<T> {
        let mut s = self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))?;
        let out = f(&mut s)?;
        self.persist(&s);
        Ok(out)
    }
}

impl Default for InMemRepo {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl UserRepo for InMemRepo {
    async fn create_user(&self, new: NewUser, password_hash: String) -> RepoResult<User> {
        self.mutate(|s| {
            if s.username_taken(&new.username, None) || s.email_taken(&new.email, None) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let user = User {
                id,
                username: new.username,
                email: new.email,
                first_name: new.first_name,
                last_name: new.last_name,
                bio: new.bio,
                gender: new.gender,
                profile_picture: new.profile_picture,
                location: new.location,
                phone_number: new.phone_number,
                website: new.website,
                date_of_birth: new.date_of_birth,
                age: age_from(new.date_of_birth),
                created_at: Utc::now(),
            };
            s.users.insert(id, user.clone());
            s.credentials.insert(id, password_hash);
            Ok(user)
        })
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        self.inspect(|s| s.user(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<User> {
        self.inspect(|s| {
            s.users.values().find(|u| u.username == username).cloned().ok_or(RepoError::NotFound)
        })
    }

    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        self.inspect(|s| Ok(s.username_taken(username, None)))
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        self.inspect(|s| Ok(s.email_taken(email, None)))
    }

    async fn users_by_ids(&self, ids: &[Id]) -> RepoResult<Vec<User>> {
        self.inspect(|s| Ok(ids.iter().filter_map(|id| s.users.get(id)).cloned().collect()))
    }

    async fn get_profile(&self, id: Id) -> RepoResult<Profile> {
        self.inspect(|s| s.user(id).map(|u| s.profile(u)))
    }

    async fn list_profiles(&self) -> RepoResult<Vec<Profile>> {
        self.inspect(|s| Ok(s.users.values().map(|u| s.profile(u)).collect()))
    }

    async fn update_user(&self, id: Id, upd: UpdateProfile) -> RepoResult<User> {
        self.mutate(|s| {
            // uniqueness checks before the mutable borrow
            if let Some(ref username) = upd.username {
                if s.username_taken(username, Some(id)) { return Err(RepoError::Conflict); }
            }
            if let Some(ref email) = upd.email {
                if s.email_taken(email, Some(id)) { return Err(RepoError::Conflict); }
            }
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(v) = upd.username { user.username = v; }
            if let Some(v) = upd.email { user.email = v; }
            if let Some(v) = upd.first_name { user.first_name = v; }
            if let Some(v) = upd.last_name { user.last_name = v; }
            if let Some(v) = upd.bio { user.bio = v; }
            if let Some(v) = upd.gender { user.gender = Some(v); }
            if let Some(v) = upd.profile_picture { user.profile_picture = Some(v); }
            if let Some(v) = upd.location { user.location = v; }
            if let Some(v) = upd.phone_number { user.phone_number = Some(v); }
            if let Some(v) = upd.website { user.website = Some(v); }
            if let Some(v) = upd.date_of_birth { user.date_of_birth = Some(v); }
            if user.date_of_birth.is_some() {
                user.age = age_from(user.date_of_birth);
            }
            Ok(user.clone())
        })
    }

    async fn delete_user(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            s.user(id)?;
            s.remove_user(id);
            Ok(())
        })
    }
}

#[async_trait]
impl CredentialRepo for InMemRepo {
    async fn password_hash(&self, user_id: Id) -> RepoResult<String> {
        self.inspect(|s| s.credentials.get(&user_id).cloned().ok_or(RepoError::NotFound))
    }
}

#[async_trait]
impl FollowRepo for InMemRepo {
    async fn toggle_follow(&self, follower: Id, followee: Id) -> RepoResult<Toggled> {
        self.mutate(|s| {
            if follower == followee {
                return Err(RepoError::SelfFollow);
            }
            s.user(follower)?;
            s.user(followee)?;
            Ok(s.graph.toggle(follower, followee)?)
        })
    }

    async fn follow(&self, follower: Id, followee: Id) -> RepoResult<Toggled> {
        self.mutate(|s| {
            s.user(follower)?;
            s.user(followee)?;
            Ok(s.graph.follow(follower, followee)?)
        })
    }

    async fn unfollow(&self, follower: Id, followee: Id) -> RepoResult<Toggled> {
        self.mutate(|s| {
            s.user(follower)?;
            s.user(followee)?;
            Ok(s.graph.unfollow(follower, followee)?)
        })
    }

    async fn list_followers(&self, user_id: Id) -> RepoResult<Vec<Profile>> {
        self.inspect(|s| {
            s.user(user_id)?;
            Ok(s.profiles(s.graph.followers(user_id)))
        })
    }

    async fn list_following(&self, user_id: Id) -> RepoResult<Vec<Profile>> {
        self.inspect(|s| {
            s.user(user_id)?;
            Ok(s.profiles(s.graph.following(user_id)))
        })
    }
}

#[async_trait]
impl PostRepo for InMemRepo {
    async fn create_post(&self, author: Id, new: NewPost) -> RepoResult<Post> {
        self.mutate(|s| {
            s.user(author)?;
            let now = Utc::now();
            let id = s.next_id();
            let post = Post {
                id,
                author_id: author,
                content: new.content,
                image: new.image,
                is_public: new.is_public.unwrap_or(true),
                created_at: now,
                updated_at: now,
                likes: Vec::new(),
                dislikes: Vec::new(),
                reposted_from: None,
                reposted_by: None,
            };
            s.posts.insert(id, post.clone());
            Ok(post)
        })
    }

    async fn create_repost(&self, actor: Id, origin: Id, is_public: Option<bool>) -> RepoResult<Post> {
        self.mutate(|s| {
            s.user(actor)?;
            let source = s.posts.get(&origin).ok_or(RepoError::NotFound)?;
            let (content, image) = (source.content.clone(), source.image.clone());
            let now = Utc::now();
            let id = s.next_id();
            let post = Post {
                id,
                author_id: actor,
                content,
                image,
                is_public: is_public.unwrap_or(true),
                created_at: now,
                updated_at: now,
                likes: Vec::new(),
                dislikes: Vec::new(),
                reposted_from: Some(origin),
                reposted_by: Some(actor),
            };
            s.posts.insert(id, post.clone());
            Ok(post)
        })
    }

    async fn get_post(&self, id: Id) -> RepoResult<Post> {
        self.inspect(|s| s.posts.get(&id).cloned().ok_or(RepoError::NotFound))
    }

    async fn list_visible_posts(&self, viewer: Option<Id>) -> RepoResult<Vec<Post>> {
        self.inspect(|s| {
            let mut v: Vec<Post> = s
                .posts
                .values()
                .filter(|p| crate::policy::can_view_post(viewer, p))
                .cloned()
                .collect();
            newest_first(&mut v, |p| (p.created_at, p.id));
            Ok(v)
        })
    }

    async fn update_post(&self, id: Id, upd: UpdatePost) -> RepoResult<Post> {
        self.mutate(|s| {
            let post = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(v) = upd.content { post.content = Some(v); }
            if let Some(v) = upd.image { post.image = Some(v); }
            if let Some(v) = upd.is_public { post.is_public = v; }
            post.updated_at = Utc::now();
            Ok(post.clone())
        })
    }

    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.posts.contains_key(&id) { return Err(RepoError::NotFound); }
            s.remove_post(id);
            Ok(())
        })
    }

    async fn toggle_post_like(&self, id: Id, user: Id) -> RepoResult<Toggled> {
        self.mutate(|s| {
            let post = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            Ok(toggle::toggle(&mut post.likes, user))
        })
    }

    async fn toggle_post_dislike(&self, id: Id, user: Id) -> RepoResult<Toggled> {
        self.mutate(|s| {
            let post = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            Ok(toggle::toggle(&mut post.dislikes, user))
        })
    }
}

#[async_trait]
impl CommentRepo for InMemRepo {
    async fn create_comment(&self, author: Id, post: Id, content: String) -> RepoResult<Comment> {
        self.mutate(|s| {
            s.user(author)?;
            if !s.posts.contains_key(&post) { return Err(RepoError::NotFound); }
            let id = s.next_id();
            let comment = Comment { id, post_id: post, author_id: author, content, created_at: Utc::now(), likes: Vec::new() };
            s.comments.insert(id, comment.clone());
            Ok(comment)
        })
    }

    async fn get_comment(&self, id: Id) -> RepoResult<Comment> {
        self.inspect(|s| s.comments.get(&id).cloned().ok_or(RepoError::NotFound))
    }

    async fn list_comments(&self, post: Id) -> RepoResult<Vec<Comment>> {
        self.inspect(|s| {
            if !s.posts.contains_key(&post) { return Err(RepoError::NotFound); }
            let mut v: Vec<Comment> = s.comments.values().filter(|c| c.post_id == post).cloned().collect();
            newest_first(&mut v, |c| (c.created_at, c.id));
            Ok(v)
        })
    }

    async fn update_comment(&self, id: Id, content: String) -> RepoResult<Comment> {
        self.mutate(|s| {
            let comment = s.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
            comment.content = content;
            Ok(comment.clone())
        })
    }

    async fn delete_comment(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.comments.contains_key(&id) { return Err(RepoError::NotFound); }
            s.remove_comment(id);
            Ok(())
        })
    }

    async fn toggle_comment_like(&self, id: Id, user: Id) -> RepoResult<Toggled> {
        self.mutate(|s| {
            let comment = s.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
            Ok(toggle::toggle(&mut comment.likes, user))
        })
    }
}

#[async_trait]
impl SubCommentRepo for InMemRepo {
    async fn create_subcomment(&self, author: Id, comment: Id, content: String) -> RepoResult<SubComment> {
        self.mutate(|s| {
            s.user(author)?;
            if !s.comments.contains_key(&comment) { return Err(RepoError::NotFound); }
            let now = Utc::now();
            let id = s.next_id();
            let sub = SubComment {
                id,
                comment_id: comment,
                author_id: author,
                content,
                created_at: now,
                updated_at: now,
                likes: Vec::new(),
            };
            s.subcomments.insert(id, sub.clone());
            Ok(sub)
        })
    }

    async fn get_subcomment(&self, id: Id) -> RepoResult<SubComment> {
        self.inspect(|s| s.subcomments.get(&id).cloned().ok_or(RepoError::NotFound))
    }

    async fn list_subcomments(&self, comment: Id) -> RepoResult<Vec<SubComment>> {
        self.inspect(|s| {
            if !s.comments.contains_key(&comment) { return Err(RepoError::NotFound); }
            let mut v: Vec<SubComment> = s.subcomments.values().filter(|c| c.comment_id == comment).cloned().collect();
            newest_first(&mut v, |c| (c.created_at, c.id));
            Ok(v)
        })
    }

    async fn update_subcomment(&self, id: Id, content: String) -> RepoResult<SubComment> {
        self.mutate(|s| {
            let sub = s.subcomments.get_mut(&id).ok_or(RepoError::NotFound)?;
            sub.content = content;
            sub.updated_at = Utc::now();
            Ok(sub.clone())
        })
    }

    async fn delete_subcomment(&self, id: Id) -> RepoResult<()> {
        self.mutate(|s| {
            if !s.subcomments.contains_key(&id) { return Err(RepoError::NotFound); }
            s.remove_subcomment(id);
            Ok(())
        })
    }

    async fn toggle_subcomment_like(&self, id: Id, user: Id) -> RepoResult<Toggled> {
        self.mutate(|s| {
            let sub = s.subcomments.get_mut(&id).ok_or(RepoError::NotFound)?;
            Ok(toggle::toggle(&mut sub.likes, user))
        })
    }
}
