//!
//! In-memory backend
//!
//! Serves two purposes: the demo/sample data source selected at startup
//! when no remote backend is configured, and the collaborator the test
//! suites run against.

use crate::{notification_channel, BackendClient};
use ahash::{AHashMap, AHashSet};
use kyokai_error::{kyokai_error, Error, ErrorType, Result};
use kyokai_messaging::{MessageConsumer, MessagingHub};
use kyokai_type::{Comment, NewComment, NewNotification, NewPost, Notification, Post};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

struct Inner {
    hub: MessagingHub,
    notifications: Mutex<Vec<Notification>>,
    posts: Mutex<Vec<Post>>,
    comments: Mutex<AHashMap<Uuid, Vec<Comment>>>,
    likes: Mutex<AHashSet<(Uuid, Uuid)>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new(hub: MessagingHub) -> Self {
        Self {
            inner: Arc::new(Inner {
                hub,
                notifications: Mutex::new(Vec::new()),
                posts: Mutex::new(Vec::new()),
                comments: Mutex::new(AHashMap::new()),
                likes: Mutex::new(AHashSet::new()),
            }),
        }
    }

    /// Backend pre-seeded with the demo forum content
    #[must_use]
    pub fn with_demo_data(hub: MessagingHub) -> Self {
        let backend = Self::new(hub);

        {
            let mut posts = backend.inner.posts.lock().unwrap();
            let mut comments = backend.inner.comments.lock().unwrap();

            for (post, post_comments) in demo_posts() {
                comments.insert(post.id, post_comments);
                posts.push(post);
            }
        }

        backend
    }
}

impl BackendClient for InMemoryBackend {
    async fn notifications(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .inner
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|notification| notification.recipient_id == recipient_id)
            .cloned()
            .collect();

        // Stable sort keeps insertion order between equal timestamps
        notifications.sort_by(|lhs, rhs| rhs.created_at.cmp(&lhs.created_at));

        Ok(notifications)
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<usize> {
        let count = self
            .inner
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|notification| notification.recipient_id == recipient_id && !notification.read)
            .count();

        Ok(count)
    }

    async fn create_notification(&self, new: NewNotification) -> Result<Notification> {
        let notification = Notification::from(new);
        self.inner
            .notifications
            .lock()
            .unwrap()
            .push(notification.clone());

        let emitter = self
            .inner
            .hub
            .emitter::<Notification>(notification_channel(notification.recipient_id));
        if let Err(error) = emitter.emit(notification.clone()).await {
            // No live subscriber on the channel; the row is persisted either way
            debug!(?error, "notification insert not delivered live");
        }

        Ok(notification)
    }

    async fn set_read(&self, notification_id: Uuid) -> Result<()> {
        let mut notifications = self.inner.notifications.lock().unwrap();
        let notification = notifications
            .iter_mut()
            .find(|notification| notification.id == notification_id)
            .ok_or_else(|| kyokai_error!(type = ErrorType::NotFound, "notification not found"))?;

        notification.read = true;

        Ok(())
    }

    async fn set_all_read(&self, recipient_id: Uuid) -> Result<()> {
        for notification in self
            .inner
            .notifications
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|notification| notification.recipient_id == recipient_id)
        {
            notification.read = true;
        }

        Ok(())
    }

    async fn notification_stream(
        &self,
        recipient_id: Uuid,
    ) -> Result<MessageConsumer<Notification>> {
        self.inner
            .hub
            .consumer(notification_channel(recipient_id))
            .await
            .map_err(Error::msg)
    }

    async fn posts(&self) -> Result<Vec<Post>> {
        let mut posts = self.inner.posts.lock().unwrap().clone();
        posts.sort_by(|lhs, rhs| rhs.created_at.cmp(&lhs.created_at));

        Ok(posts)
    }

    async fn create_post(&self, new: NewPost) -> Result<Post> {
        let post = Post::from(new);
        self.inner.posts.lock().unwrap().push(post.clone());

        Ok(post)
    }

    async fn liked_post_ids(&self, account_id: Uuid) -> Result<Vec<Uuid>> {
        let liked = self
            .inner
            .likes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_post_id, liker)| *liker == account_id)
            .map(|(post_id, _liker)| *post_id)
            .collect();

        Ok(liked)
    }

    async fn set_like(&self, post_id: Uuid, account_id: Uuid) -> Result<()> {
        {
            let mut likes = self.inner.likes.lock().unwrap();
            if !likes.insert((post_id, account_id)) {
                return Err(kyokai_error!(
                    type = ErrorType::Conflict(Some("post already liked".into())),
                    "post already liked"
                ));
            }
        }

        if let Some(post) = self
            .inner
            .posts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|post| post.id == post_id)
        {
            post.like_count += 1;
        }

        Ok(())
    }

    async fn clear_like(&self, post_id: Uuid, account_id: Uuid) -> Result<()> {
        {
            let mut likes = self.inner.likes.lock().unwrap();
            if !likes.remove(&(post_id, account_id)) {
                return Err(kyokai_error!(
                    type = ErrorType::Conflict(Some("post not liked".into())),
                    "post not liked"
                ));
            }
        }

        if let Some(post) = self
            .inner
            .posts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|post| post.id == post_id)
        {
            post.like_count = post.like_count.saturating_sub(1);
        }

        Ok(())
    }

    async fn comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let mut comments = self
            .inner
            .comments
            .lock()
            .unwrap()
            .get(&post_id)
            .cloned()
            .unwrap_or_default();

        comments.sort_by(|lhs, rhs| lhs.created_at.cmp(&rhs.created_at));

        Ok(comments)
    }

    async fn create_comment(&self, new: NewComment) -> Result<Comment> {
        let comment = Comment::from(new);
        self.inner
            .comments
            .lock()
            .unwrap()
            .entry(comment.post_id)
            .or_default()
            .push(comment.clone());

        Ok(comment)
    }
}

fn demo_posts() -> Vec<(Post, Vec<Comment>)> {
    let post_guilt = Post::from(
        NewPost::builder()
            .author_id(Some(Uuid::now_v7()))
            .title("Feeling guilty about saying no to family")
            .content(
                "I finally told my parents I can't drive them everywhere on \
                 weekends and the guilt is eating me up. Does it get easier?",
            )
            .category("family")
            .build(),
    );
    let post_work = Post::from(
        NewPost::builder()
            .title("How do I set boundaries with my manager?")
            .content(
                "Messages at 10pm, \"quick favours\" on weekends. I want to \
                 push back without torching the relationship.",
            )
            .category("work")
            .anonymous(true)
            .build(),
    );
    let post_win = Post::from(
        NewPost::builder()
            .author_id(Some(Uuid::now_v7()))
            .title("Small win: I asked my roommate to respect my study time")
            .content("It was awkward for about a day and now it's just... normal?")
            .category("wins")
            .build(),
    );

    let comment_guilt = Comment::from(
        NewComment::builder()
            .post_id(post_guilt.id)
            .author_id(Some(Uuid::now_v7()))
            .content(
                "I totally understand this feeling! The guilt can be \
                 overwhelming, but setting boundaries is an act of self-care, \
                 not selfishness.",
            )
            .build(),
    );
    let comment_win = Comment::from(
        NewComment::builder()
            .post_id(post_win.id)
            .content("This is the kind of post I come here for. Congrats!")
            .anonymous(true)
            .build(),
    );

    vec![
        (post_guilt, vec![comment_guilt]),
        (post_work, Vec::new()),
        (post_win, vec![comment_win]),
    ]
}

#[cfg(test)]
mod test {
    use super::InMemoryBackend;
    use crate::BackendClient;
    use futures_util::StreamExt;
    use kyokai_messaging::{tokio_broadcast::TokioBroadcastMessagingBackend, MessagingHub};
    use kyokai_type::{NewNotification, Notification};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new(MessagingHub::new(TokioBroadcastMessagingBackend::default()))
    }

    #[tokio::test]
    async fn like_uniqueness_is_enforced() {
        let backend = InMemoryBackend::with_demo_data(MessagingHub::new(
            TokioBroadcastMessagingBackend::default(),
        ));
        let account_id = Uuid::now_v7();
        let post_id = backend.posts().await.unwrap()[0].id;

        backend.set_like(post_id, account_id).await.unwrap();
        let err = backend.set_like(post_id, account_id).await.unwrap_err();
        assert!(err.is_conflict());

        backend.clear_like(post_id, account_id).await.unwrap();
        let err = backend.clear_like(post_id, account_id).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn like_count_tracks_like_state() {
        let backend = InMemoryBackend::with_demo_data(MessagingHub::new(
            TokioBroadcastMessagingBackend::default(),
        ));
        let account_id = Uuid::now_v7();
        let post_id = backend.posts().await.unwrap()[0].id;
        let before = backend.posts().await.unwrap()[0].like_count;

        backend.set_like(post_id, account_id).await.unwrap();
        let after = backend
            .posts()
            .await
            .unwrap()
            .into_iter()
            .find(|post| post.id == post_id)
            .unwrap()
            .like_count;

        assert_eq!(after, before + 1);
        assert_eq!(backend.liked_post_ids(account_id).await.unwrap(), [post_id]);
    }

    #[tokio::test]
    async fn created_notifications_reach_the_change_stream() {
        let backend = backend();
        let recipient_id = Uuid::now_v7();

        let mut stream = backend.notification_stream(recipient_id).await.unwrap();

        let created = backend
            .create_notification(NewNotification::spark(recipient_id, "Mina", None))
            .await
            .unwrap();

        let delivered: Notification = stream.next().await.unwrap().unwrap();
        assert_eq!(delivered.id, created.id);
        assert_eq!(delivered.category, created.category);
        assert_eq!(delivered.message, created.message);
        assert!(!delivered.read);
    }

    #[tokio::test]
    async fn unread_count_is_scoped_to_the_recipient() {
        let backend = backend();
        let recipient_id = Uuid::now_v7();
        let other_id = Uuid::now_v7();

        for _ in 0..3 {
            backend
                .create_notification(NewNotification::system(recipient_id, "hi", "there"))
                .await
                .unwrap();
        }
        backend
            .create_notification(NewNotification::system(other_id, "hi", "there"))
            .await
            .unwrap();

        assert_eq!(backend.unread_count(recipient_id).await.unwrap(), 3);

        backend.set_all_read(recipient_id).await.unwrap();
        assert_eq!(backend.unread_count(recipient_id).await.unwrap(), 0);
        assert_eq!(backend.unread_count(other_id).await.unwrap(), 1);
    }
}
