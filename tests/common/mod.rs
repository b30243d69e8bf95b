#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use circle::auth::issue_token_pair;
use circle::models::{Id, NewUser};
use circle::repo::inmem::InMemRepo;
use circle::repo::UserRepo;
use circle::storage::{ImageStore, ImageStoreError};
use circle::AppState;

// ---------------- In-memory Mock ImageStore (tests only) ----------------
#[derive(Default)]
pub struct MockImageStore {
    inner: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

#[async_trait::async_trait]
impl ImageStore for MockImageStore {
    async fn save(&self, hash: &str, mime: &str, bytes: &[u8]) -> Result<(), ImageStoreError> {
        let mut map = self.inner.lock().unwrap();
        if map.contains_key(hash) {
            return Err(ImageStoreError::Duplicate);
        }
        map.insert(hash.to_string(), (bytes.to_vec(), mime.to_string()));
        Ok(())
    }
    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), ImageStoreError> {
        let map = self.inner.lock().unwrap();
        map.get(hash).cloned().ok_or(ImageStoreError::NotFound)
    }
}

pub fn set_secret() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

/// Ephemeral store plus app state sharing it; the repo handle lets tests
/// seed users without going through Argon2 for every account.
pub fn setup() -> (InMemRepo, AppState) {
    set_secret();
    let repo = InMemRepo::ephemeral();
    let state = AppState::new(Arc::new(repo.clone()), Arc::new(MockImageStore::default()));
    (repo, state)
}

/// Create `name` directly in the store and mint an access token for it.
pub async fn user(repo: &InMemRepo, name: &str) -> (Id, String) {
    let new = NewUser { username: name.into(), email: format!("{name}@x.com"), ..Default::default() };
    let u = repo.create_user(new, "unused".into()).await.unwrap();
    let profile = repo.get_profile(u.id).await.unwrap();
    (u.id, issue_token_pair(&profile).unwrap().access)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Call the service and return `(status, json body)`; empty bodies become `Null`.
#[macro_export]
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body = actix_web::test::read_body(resp).await;
        let json: serde_json::Value =
            if body.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&body).unwrap() };
        (status, json)
    }};
}
