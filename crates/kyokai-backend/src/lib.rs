#![forbid(rust_2018_idioms)]
#![allow(forbidden_lint_groups)]

//! Abstract backend collaborator
//!
//! Persistence, querying and the push transport all live behind this
//! trait. The client core never talks to a concrete store directly; it is
//! handed an [`AnyBackend`] at session construction, which makes the
//! in-memory stub below a drop-in replacement for a real remote backend.

#[macro_use]
extern crate tracing;

use enum_dispatch::enum_dispatch;
use kyokai_error::Result;
use kyokai_messaging::MessageConsumer;
use kyokai_type::{Comment, NewComment, NewNotification, NewPost, Notification, Post};
use uuid::Uuid;

pub use self::in_memory::InMemoryBackend;

pub mod in_memory;

/// Channel a recipient's notification inserts are published on
///
/// Embedding the recipient id keeps concurrent viewers on the same client
/// from ever sharing a channel.
#[must_use]
pub fn notification_channel(recipient_id: Uuid) -> String {
    format!("notifications:{recipient_id}")
}

/// Enum dispatch over all supported backends
#[enum_dispatch(BackendClient)]
#[derive(Clone)]
pub enum AnyBackend {
    InMemory(InMemoryBackend),
}

/// Operations the client core needs from its backend
///
/// Closing a change stream is simply dropping the returned consumer.
/// `set_like`/`clear_like` fail with `ErrorType::Conflict` on
/// duplicate-state attempts; everything else is a plain remote error.
#[enum_dispatch]
#[allow(async_fn_in_trait)] // Because of `enum_dispatch`
pub trait BackendClient {
    /// Full notification list for a recipient, newest first
    async fn notifications(&self, recipient_id: Uuid) -> Result<Vec<Notification>>;

    /// Number of unread notifications for a recipient
    async fn unread_count(&self, recipient_id: Uuid) -> Result<usize>;

    /// Persist a notification and publish it on the recipient's channel
    async fn create_notification(&self, new: NewNotification) -> Result<Notification>;

    /// Flip one notification's read flag to true
    async fn set_read(&self, notification_id: Uuid) -> Result<()>;

    /// Flip every notification of a recipient to read
    async fn set_all_read(&self, recipient_id: Uuid) -> Result<()>;

    /// Open the INSERT change stream scoped to one recipient
    async fn notification_stream(
        &self,
        recipient_id: Uuid,
    ) -> Result<MessageConsumer<Notification>>;

    /// All forum posts, newest first
    async fn posts(&self) -> Result<Vec<Post>>;

    /// Persist a new forum post
    async fn create_post(&self, new: NewPost) -> Result<Post>;

    /// Ids of the posts an account has liked
    async fn liked_post_ids(&self, account_id: Uuid) -> Result<Vec<Uuid>>;

    /// Record a like; `Conflict` if the account already liked the post
    async fn set_like(&self, post_id: Uuid, account_id: Uuid) -> Result<()>;

    /// Remove a like; `Conflict` if there is none to remove
    async fn clear_like(&self, post_id: Uuid, account_id: Uuid) -> Result<()>;

    /// Comments of a post, oldest first
    async fn comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    /// Persist a new comment
    async fn create_comment(&self, new: NewComment) -> Result<Comment>;
}
