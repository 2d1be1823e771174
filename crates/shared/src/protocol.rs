use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{BlockedBy, RelationshipStatus, UserId};

pub const SEARCH_PROFILE_PATH: &str = "/api/search/profile";
pub const LOG_VISIT_PATH: &str = "/api/interactions/visit";
pub const CHECK_PROFILE_PATH: &str = "/api/activity/check-profile";

/// Partial user object sent back by the backend; named fields overwrite the
/// session user, everything else is left alone.
pub type UserPatch = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedProfile {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fame_rating: Option<f64>,
    #[serde(default)]
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connection_date: Option<DateTime<Utc>>,
    /// Fields the client does not model, kept so a profile survives a
    /// round trip through the view untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ViewedProfile {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) => format!("{first} {last}"),
            (Some(first), None, _) => first.clone(),
            (None, _, Some(username)) => username.clone(),
            _ => self.id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProfileRequest {
    pub user_id: UserId,
    pub profile_to_find_id: UserId,
}

/// Body of `/api/search/profile`. The same shape carries the happy path
/// (`matchingUserProfile`), the soft error (`message`) and, on a non-OK
/// status, the hard error (`error`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProfileResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_user_profile: Option<ViewedProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchProfileResponse {
    /// Soft-error key, if any. An empty message counts as no message.
    pub fn soft_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogVisitRequest {
    pub visitor_id: UserId,
    pub visited_user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckProfileRequest {
    pub user_id: UserId,
    pub profile_to_check_id: UserId,
}

/// All five flags are required: a body missing any of them fails to decode,
/// so a poll never applies a partial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckProfileResponse {
    pub is_liked: bool,
    pub is_liked_by: bool,
    pub is_match: bool,
    pub is_blocked: bool,
    pub is_blocked_by: bool,
}

impl From<CheckProfileResponse> for RelationshipStatus {
    fn from(value: CheckProfileResponse) -> Self {
        Self {
            is_match: value.is_match,
            is_liked: value.is_liked,
            is_liked_by: value.is_liked_by,
            is_blocked: value.is_blocked,
            is_blocked_by: BlockedBy::from(value.is_blocked_by),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
