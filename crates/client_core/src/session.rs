//! Session context: the signed-in user, shared between views.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{domain::UserId, protocol::UserPatch};
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CurrentUser {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Applies `patch` over this user. Fields named in the patch overwrite
    /// ours, everything else is kept. The identity never changes: an `id` in
    /// the patch that disagrees with ours is dropped.
    ///
    /// Returns the number of fields written.
    pub fn merge(&mut self, patch: &UserPatch) -> usize {
        let mut written = 0;
        for (name, value) in patch {
            if name == "id" {
                if value.as_str() != Some(self.id.as_str()) {
                    warn!(user_id = %self.id, patch_id = %value, "ignoring foreign id in user patch");
                }
                continue;
            }
            self.fields.insert(name.clone(), value.clone());
            written += 1;
        }
        written
    }

    fn from_patch(patch: &UserPatch) -> Option<Self> {
        let id = patch.get("id")?.as_str().filter(|id| !id.is_empty())?;
        let mut user = Self::new(id);
        user.merge(patch);
        Some(user)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<CurrentUser>,
    global_loading: bool,
}

/// Cloneable handle onto the session. Every clone sees the same user.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    inner: Arc<RwLock<SessionState>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: CurrentUser) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState {
                user: Some(user),
                global_loading: false,
            })),
        }
    }

    pub async fn set_user(&self, user: CurrentUser) {
        self.inner.write().await.user = Some(user);
    }

    pub async fn clear(&self) {
        self.inner.write().await.user = None;
    }

    pub async fn current(&self) -> Option<CurrentUser> {
        self.inner.read().await.user.clone()
    }

    pub async fn current_id(&self) -> Option<UserId> {
        self.inner.read().await.user.as_ref().map(|u| u.id.clone())
    }

    /// Merges a patch into the session user. With nobody signed in, the patch
    /// becomes the user if it carries an id and is dropped otherwise.
    pub async fn merge(&self, patch: &UserPatch) {
        let mut state = self.inner.write().await;
        match state.user.as_mut() {
            Some(user) => {
                user.merge(patch);
            }
            None => state.user = CurrentUser::from_patch(patch),
        }
    }

    pub async fn set_global_loading(&self, loading: bool) {
        self.inner.write().await.global_loading = loading;
    }

    pub async fn is_global_loading(&self) -> bool {
        self.inner.read().await.global_loading
    }
}
