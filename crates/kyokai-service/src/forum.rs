use ahash::{AHashMap, AHashSet};
use garde::Validate;
use kyokai_backend::{AnyBackend, BackendClient};
use kyokai_error::{bail, ErrorType, Result};
use kyokai_type::{Comment, NewComment, NewNotification, PostView};
use smol_str::SmolStr;
use std::sync::{Arc, Mutex};
use typed_builder::TypedBuilder;
use uuid::Uuid;

const COMMENT_CHARACTER_LIMIT: usize = 4000;

/// Forum post list with the viewer's like state, updated optimistically
///
/// Same policy as the notification store: local changes land before the
/// remote write and survive its failure. The one nuance is the expected
/// conflict case, where a duplicate-state like attempt converges silently
/// to the attempted target instead of surfacing an error.
#[derive(Clone, TypedBuilder)]
pub struct ForumService {
    backend: AnyBackend,
    #[builder(default, setter(skip))]
    state: Arc<Mutex<ForumState>>,
}

#[derive(Default)]
struct ForumState {
    posts: Vec<PostView>,
    comments: AHashMap<Uuid, Vec<Comment>>,
    likes_in_flight: AHashSet<Uuid>,
}

#[derive(Clone, TypedBuilder, Validate)]
pub struct CreateComment {
    /// ID of the commenting account
    ///
    /// This is not validated. Make sure this is a valid and verified value.
    #[garde(skip)]
    author_id: Uuid,

    /// Display name used for the reply notification; ignored when the
    /// comment is anonymous
    #[builder(default, setter(into, strip_option))]
    #[garde(skip)]
    author_name: Option<SmolStr>,

    #[garde(skip)]
    post_id: Uuid,

    /// Content of the comment
    #[builder(setter(into))]
    #[garde(length(chars, min = 1, max = COMMENT_CHARACTER_LIMIT))]
    content: String,

    /// Hide the author on the stored comment
    #[builder(default)]
    #[garde(skip)]
    anonymous: bool,
}

impl ForumService {
    /// Fetch all posts and replace the local list wholesale
    pub async fn load_posts(&self, viewer_id: Option<Uuid>) -> Result<Vec<PostView>> {
        let posts = self.backend.posts().await?;
        let liked = match viewer_id {
            Some(viewer_id) => self.backend.liked_post_ids(viewer_id).await?,
            None => Vec::new(),
        };

        let views: Vec<PostView> = posts
            .into_iter()
            .map(|post| PostView {
                is_liked: liked.contains(&post.id),
                post,
            })
            .collect();

        self.state.lock().unwrap().posts = views.clone();

        Ok(views)
    }

    /// Snapshot of the local post list
    #[must_use]
    pub fn posts(&self) -> Vec<PostView> {
        self.state.lock().unwrap().posts.clone()
    }

    /// Flip the viewer's like on a post, optimistically
    ///
    /// The flip and count adjustment land before the remote write. While
    /// a request for a post is in flight, further toggles for that post
    /// are dropped (a debounce, not a queue). A duplicate-state rejection
    /// from the backend is benign: the local state already matches the
    /// attempted target.
    pub async fn toggle_like(&self, viewer_id: Option<Uuid>, post_id: Uuid) -> Result<()> {
        let Some(viewer_id) = viewer_id else {
            bail!(type = ErrorType::Unauthorized, "liking requires an authenticated viewer");
        };

        let target_liked = {
            let mut state = self.state.lock().unwrap();
            if state.likes_in_flight.contains(&post_id) {
                debug!(%post_id, "like request already in flight");
                return Ok(());
            }

            let Some(view) = state.posts.iter_mut().find(|view| view.post.id == post_id) else {
                bail!(type = ErrorType::NotFound, "unknown post");
            };

            view.is_liked = !view.is_liked;
            if view.is_liked {
                view.post.like_count += 1;
            } else {
                view.post.like_count = view.post.like_count.saturating_sub(1);
            }

            let target_liked = view.is_liked;
            state.likes_in_flight.insert(post_id);
            target_liked
        };

        let result = if target_liked {
            self.backend.set_like(post_id, viewer_id).await
        } else {
            self.backend.clear_like(post_id, viewer_id).await
        };

        self.state.lock().unwrap().likes_in_flight.remove(&post_id);

        match result {
            Ok(()) => Ok(()),
            Err(error) if error.is_conflict() => {
                // Backend already agreed with the attempted target
                debug!(%post_id, "like state already converged");
                Ok(())
            }
            Err(error) => {
                warn!(%post_id, ?error, "like toggle failed upstream; keeping optimistic state");
                Err(error)
            }
        }
    }

    /// Persist a comment and append it to the post's local list
    ///
    /// A comment on someone else's post fans out a reply notification to
    /// the author; failure of the fan-out is logged, never fatal.
    pub async fn add_comment(&self, create_comment: CreateComment) -> Result<Comment> {
        create_comment.validate(&())?;

        let comment = self
            .backend
            .create_comment(
                NewComment::builder()
                    .post_id(create_comment.post_id)
                    .author_id(Some(create_comment.author_id))
                    .content(create_comment.content)
                    .anonymous(create_comment.anonymous)
                    .build(),
            )
            .await?;

        let notified = {
            let mut state = self.state.lock().unwrap();
            state
                .comments
                .entry(comment.post_id)
                .or_default()
                .push(comment.clone());

            state
                .posts
                .iter()
                .find(|view| view.post.id == comment.post_id)
                .and_then(|view| {
                    view.post
                        .author_id
                        .filter(|author_id| *author_id != create_comment.author_id)
                        .map(|author_id| (author_id, view.post.title.clone()))
                })
        };

        if let Some((author_id, post_title)) = notified {
            let replier = if create_comment.anonymous {
                SmolStr::new("Someone")
            } else {
                create_comment
                    .author_name
                    .unwrap_or_else(|| SmolStr::new("Someone"))
            };

            if let Err(error) = self
                .backend
                .create_notification(NewNotification::forum_reply(
                    author_id, &replier, &post_title,
                ))
                .await
            {
                warn!(%author_id, ?error, "reply notification not delivered");
            }
        }

        Ok(comment)
    }

    /// Fetch a post's comments lazily and cache them
    pub async fn load_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let comments = self.backend.comments(post_id).await?;
        self.state
            .lock()
            .unwrap()
            .comments
            .insert(post_id, comments.clone());

        Ok(comments)
    }

    /// Snapshot of the locally known comments of a post
    #[must_use]
    pub fn comments(&self, post_id: Uuid) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&post_id)
            .cloned()
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn hold_like_guard(&self, post_id: Uuid) {
        self.state.lock().unwrap().likes_in_flight.insert(post_id);
    }
}

#[cfg(test)]
mod test {
    use super::{CreateComment, ForumService};
    use futures_util::StreamExt;
    use kyokai_backend::{AnyBackend, BackendClient};
    use kyokai_test::seeded_backend;
    use kyokai_type::Notification;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn service() -> (ForumService, AnyBackend) {
        let backend = seeded_backend();
        let service = ForumService::builder().backend(backend.clone()).build();

        (service, backend)
    }

    #[tokio::test]
    async fn like_applies_before_remote_confirmation() {
        let (service, backend) = service();
        let viewer = Uuid::now_v7();

        let views = service.load_posts(Some(viewer)).await.unwrap();
        let post_id = views[0].post.id;
        let count_before = views[0].post.like_count;

        service.toggle_like(Some(viewer), post_id).await.unwrap();

        let view = service
            .posts()
            .into_iter()
            .find(|view| view.post.id == post_id)
            .unwrap();
        assert!(view.is_liked);
        assert_eq!(view.post.like_count, count_before + 1);
        assert_eq!(backend.liked_post_ids(viewer).await.unwrap(), [post_id]);
    }

    #[tokio::test]
    async fn rapid_toggling_converges_to_the_last_action() {
        let (service, backend) = service();
        let viewer = Uuid::now_v7();

        let views = service.load_posts(Some(viewer)).await.unwrap();
        let post_id = views[0].post.id;
        let count_before = views[0].post.like_count;

        let (first, second) = tokio::join!(
            service.toggle_like(Some(viewer), post_id),
            service.toggle_like(Some(viewer), post_id),
        );
        first.unwrap();
        second.unwrap();

        let view = service
            .posts()
            .into_iter()
            .find(|view| view.post.id == post_id)
            .unwrap();
        assert!(!view.is_liked);
        assert_eq!(view.post.like_count, count_before);
        assert!(backend.liked_post_ids(viewer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_flight_like_debounces_further_toggles() {
        let (service, backend) = service();
        let viewer = Uuid::now_v7();

        let views = service.load_posts(Some(viewer)).await.unwrap();
        let post_id = views[0].post.id;

        service.hold_like_guard(post_id);
        service.toggle_like(Some(viewer), post_id).await.unwrap();

        let view = service
            .posts()
            .into_iter()
            .find(|view| view.post.id == post_id)
            .unwrap();
        assert!(!view.is_liked);
        assert!(backend.liked_post_ids(viewer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_state_conflicts_are_benign() {
        let (service, backend) = service();
        let viewer = Uuid::now_v7();

        let views = service.load_posts(Some(viewer)).await.unwrap();
        let post_id = views[0].post.id;

        // The backend learns about the like behind the client's back
        backend.set_like(post_id, viewer).await.unwrap();

        service.toggle_like(Some(viewer), post_id).await.unwrap();

        let view = service
            .posts()
            .into_iter()
            .find(|view| view.post.id == post_id)
            .unwrap();
        assert!(view.is_liked);
    }

    #[tokio::test]
    async fn commenting_notifies_the_post_author() {
        let (service, backend) = service();
        let commenter = Uuid::now_v7();

        let views = service.load_posts(Some(commenter)).await.unwrap();
        let authored = views
            .iter()
            .find(|view| view.post.author_id.is_some())
            .unwrap();
        let author_id = authored.post.author_id.unwrap();

        let mut stream = backend.notification_stream(author_id).await.unwrap();

        let comment = service
            .add_comment(
                CreateComment::builder()
                    .author_id(commenter)
                    .author_name("Jun")
                    .post_id(authored.post.id)
                    .content("Thank you for sharing this.")
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(service.comments(authored.post.id).last(), Some(&comment));

        let delivered: Notification = stream.next().await.unwrap().unwrap();
        assert!(delivered.message.contains("Jun"));
        assert!(delivered.message.contains(&authored.post.title));
    }

    #[tokio::test]
    async fn anonymous_comments_hide_the_author() {
        let (service, _backend) = service();
        let commenter = Uuid::now_v7();

        let views = service.load_posts(Some(commenter)).await.unwrap();
        let post_id = views[0].post.id;

        let comment = service
            .add_comment(
                CreateComment::builder()
                    .author_id(commenter)
                    .post_id(post_id)
                    .content("Posting this one anonymously.")
                    .anonymous(true)
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(comment.author_id, None);
        assert!(comment.anonymous);
    }

    #[tokio::test]
    async fn empty_comments_are_rejected() {
        let (service, _backend) = service();

        let result = service
            .add_comment(
                CreateComment::builder()
                    .author_id(Uuid::now_v7())
                    .post_id(Uuid::now_v7())
                    .content("")
                    .build(),
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn liking_without_identity_fails_loudly() {
        let (service, _backend) = service();
        let views = service.load_posts(None).await.unwrap();

        let result = service.toggle_like(None, views[0].post.id).await;
        assert!(result.is_err());
    }
}
