use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{matches, messages, profiles, refresh_tokens, swipes, users};

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub email_confirmed: bool,
}

// --- Profile ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub country_code: Option<String>,
    pub country_flag: Option<String>,
    pub avatar_url: Option<String>,
    pub rank: String,
    pub roles: Vec<String>,
    pub voice_chat: bool,
    pub availability: Vec<String>,
    pub age: Option<i32>,
    pub is_premium: bool,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
}

/// Every recognized profile update field. Each field is independently
/// optional; unrecognized payload fields are dropped by serde rather than
/// merged blindly.
#[derive(Debug, AsChangeset, Deserialize, Default)]
#[diesel(table_name = profiles)]
pub struct UpdateProfile {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub country_code: Option<String>,
    pub country_flag: Option<String>,
    pub avatar_url: Option<String>,
    pub rank: Option<String>,
    pub roles: Option<Vec<String>>,
    pub voice_chat: Option<bool>,
    pub availability: Option<Vec<String>>,
    pub age: Option<i32>,
}

// --- Swipe ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = swipes)]
pub struct Swipe {
    pub id: Uuid,
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    pub is_like: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = swipes)]
pub struct NewSwipe {
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    pub is_like: bool,
}

// --- Match ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub matched_at: DateTime<Utc>,
}

impl Match {
    /// The participant that is not `user_id`. Callers must have verified
    /// membership first.
    pub fn other_user(&self, user_id: Uuid) -> Uuid {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

// --- RefreshToken ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = refresh_tokens)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_user_returns_the_opposite_participant() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let m = Match {
            id: Uuid::new_v4(),
            user1_id: a,
            user2_id: b,
            matched_at: Utc::now(),
        };
        assert_eq!(m.other_user(a), b);
        assert_eq!(m.other_user(b), a);
    }

    #[test]
    fn membership_excludes_third_parties() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let m = Match {
            id: Uuid::new_v4(),
            user1_id: a,
            user2_id: b,
            matched_at: Utc::now(),
        };
        assert!(m.has_participant(a));
        assert!(m.has_participant(b));
        assert!(!m.has_participant(Uuid::new_v4()));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            password_hash: "secret".into(),
            email_confirmed: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
