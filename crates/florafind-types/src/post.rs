//! User-authored posts

use crate::{PostId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        content: impl Into<String>,
        published: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PostId::generate(),
            user_id,
            title: title.into(),
            content: content.into(),
            published,
            created_at: now,
            updated_at: now,
        }
    }
}
