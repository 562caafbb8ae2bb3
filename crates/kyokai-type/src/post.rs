use iso8601_timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// A forum post
///
/// `author_id` is `None` for anonymous posts; `like_count` is the
/// backend's aggregate and may trail the client's optimistic view.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub category: SmolStr,
    pub anonymous: bool,
    pub image_urls: Vec<String>,
    pub like_count: usize,
    pub created_at: Timestamp,
}

/// A post as the current viewer sees it
#[derive(Clone, Debug, PartialEq)]
pub struct PostView {
    pub post: Post,
    pub is_liked: bool,
}

/// A post that has not been persisted yet
#[derive(Clone, Debug, TypedBuilder)]
pub struct NewPost {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,
    #[builder(default)]
    pub author_id: Option<Uuid>,
    #[builder(setter(into))]
    pub title: String,
    #[builder(setter(into))]
    pub content: String,
    #[builder(default = SmolStr::new("general"), setter(into))]
    pub category: SmolStr,
    #[builder(default)]
    pub anonymous: bool,
    #[builder(default)]
    pub image_urls: Vec<String>,
    #[builder(default = Timestamp::now_utc())]
    pub created_at: Timestamp,
}

impl From<NewPost> for Post {
    fn from(value: NewPost) -> Self {
        Self {
            id: value.id,
            author_id: if value.anonymous {
                None
            } else {
                value.author_id
            },
            title: value.title,
            content: value.content,
            category: value.category,
            anonymous: value.anonymous,
            image_urls: value.image_urls,
            like_count: 0,
            created_at: value.created_at,
        }
    }
}
