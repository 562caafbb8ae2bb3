#![forbid(rust_2018_idioms)]
#![allow(forbidden_lint_groups)]

use kyokai_backend::{AnyBackend, InMemoryBackend};
use kyokai_messaging::{tokio_broadcast::TokioBroadcastMessagingBackend, MessagingHub};
use kyokai_type::{NewNotification, NewPost, Notification, Post};
use uuid::Uuid;

/// An empty in-memory backend wired to an in-process messaging hub
#[must_use]
pub fn fresh_backend() -> AnyBackend {
    AnyBackend::from(InMemoryBackend::new(messaging_hub()))
}

/// An in-memory backend pre-populated with the sample posts and comments
#[must_use]
pub fn seeded_backend() -> AnyBackend {
    AnyBackend::from(InMemoryBackend::with_demo_data(messaging_hub()))
}

fn messaging_hub() -> MessagingHub {
    MessagingHub::new(TokioBroadcastMessagingBackend::default())
}

/// A spark notification for `recipient_id`, unread, as a push would carry it
#[must_use]
pub fn sample_notification(recipient_id: Uuid) -> Notification {
    NewNotification::spark(recipient_id, "Mina", Some("Saying no at work")).into()
}

/// A short authored post, not yet persisted
#[must_use]
pub fn sample_post(author_id: Uuid) -> NewPost {
    NewPost::builder()
        .author_id(Some(author_id))
        .title("Drawing a line with my sister")
        .content("She reads my mail when she visits. I finally said something.")
        .category("family")
        .build()
}

/// The first authored (non-anonymous) post in the list, if any
#[must_use]
pub fn first_authored_post(posts: &[Post]) -> Option<&Post> {
    posts.iter().find(|post| post.author_id.is_some())
}
