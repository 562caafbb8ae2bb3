use iso8601_timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// A comment on a forum post
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub anonymous: bool,
    pub created_at: Timestamp,
}

/// A comment that has not been persisted yet
#[derive(Clone, Debug, TypedBuilder)]
pub struct NewComment {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,
    pub post_id: Uuid,
    #[builder(default)]
    pub author_id: Option<Uuid>,
    #[builder(setter(into))]
    pub content: String,
    #[builder(default)]
    pub anonymous: bool,
    #[builder(default = Timestamp::now_utc())]
    pub created_at: Timestamp,
}

impl From<NewComment> for Comment {
    fn from(value: NewComment) -> Self {
        Self {
            id: value.id,
            post_id: value.post_id,
            author_id: if value.anonymous {
                None
            } else {
                value.author_id
            },
            content: value.content,
            anonymous: value.anonymous,
            created_at: value.created_at,
        }
    }
}
