use crate::{toast::ToastPresenter, LimitContext};
use futures_util::StreamExt;
use garde::Validate;
use kyokai_backend::{AnyBackend, BackendClient};
use kyokai_error::{bail, ErrorType, Result};
use kyokai_type::Notification;
use std::sync::{Arc, Mutex};
use tokio::{sync::watch, task::JoinHandle};
use typed_builder::TypedBuilder;
use uuid::Uuid;

const DEFAULT_FETCH_LIMIT: usize = 50;

/// Client-side read-state store plus subscription manager
///
/// Reconciles three input sources into one list: full refetches, live
/// push events and local user actions. Mutations follow the
/// optimistic-eventually-corrected policy: local state is updated before
/// the remote write, and a failed remote write is logged but never rolled
/// back; the next full refetch corrects any divergence.
#[derive(Clone, TypedBuilder)]
pub struct NotificationService {
    backend: AnyBackend,
    toasts: ToastPresenter,
    #[builder(default, setter(skip))]
    state: Arc<Mutex<ReadState>>,
    #[builder(default = Arc::new(watch::channel(0).0), setter(skip))]
    unread_tx: Arc<watch::Sender<usize>>,
}

/// Notification list (newest first) and the derived unread counter
///
/// The counter is not authoritative: it accepts optimistic overrides from
/// user actions for immediate feedback and is re-derived on refetch.
#[derive(Default)]
struct ReadState {
    notifications: Vec<Notification>,
    unread: usize,
}

#[derive(Clone, TypedBuilder, Validate)]
#[garde(context(LimitContext as ctx))]
pub struct GetNotifications {
    /// Identity of the viewer whose notifications are fetched
    ///
    /// `None` short-circuits to an empty result; reads without identity
    /// are not an error.
    #[builder(default)]
    #[garde(skip)]
    viewer_id: Option<Uuid>,

    /// Limit of returned notifications
    #[builder(default = DEFAULT_FETCH_LIMIT)]
    #[garde(range(max = ctx.limit))]
    limit: usize,
}

/// Handle to a live per-recipient notification stream
///
/// Tearing it down is idempotent; dropping the handle tears it down too.
pub struct NotificationSubscription {
    task: JoinHandle<()>,
}

impl NotificationSubscription {
    pub fn unsubscribe(&self) {
        self.task.abort();
    }
}

impl Drop for NotificationSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl NotificationService {
    /// Fetch the full list and replace the local one wholesale
    ///
    /// Last-write-wins against interleaved push events: a push that loses
    /// the race appears in the replaced list anyway once persisted
    /// upstream.
    pub async fn load_all(&self, get_notifications: GetNotifications) -> Result<Vec<Notification>> {
        get_notifications.validate(&LimitContext::default())?;

        let Some(viewer_id) = get_notifications.viewer_id else {
            return Ok(Vec::new());
        };

        let mut notifications = self.backend.notifications(viewer_id).await?;
        notifications.truncate(get_notifications.limit);

        self.apply_optimistic(|state| {
            state.unread = notifications
                .iter()
                .filter(|notification| !notification.read)
                .count();
            state.notifications = notifications.clone();
        });

        Ok(notifications)
    }

    /// Fetch the unread counter independently of the list
    ///
    /// The two may be briefly inconsistent; callers re-sync both after
    /// any mutating action.
    pub async fn load_unread_count(&self, viewer_id: Option<Uuid>) -> Result<usize> {
        let Some(viewer_id) = viewer_id else {
            return Ok(0);
        };

        let count = self.backend.unread_count(viewer_id).await?;
        self.apply_optimistic(|state| state.unread = count);

        Ok(count)
    }

    /// Ingest one live push event
    ///
    /// Duplicate deliveries (by id) are dropped. New records go to the
    /// head: a push is always newer than anything already loaded.
    pub fn on_push(&self, notification: Notification) {
        let fresh = {
            let mut state = self.state.lock().unwrap();
            if state
                .notifications
                .iter()
                .any(|existing| existing.id == notification.id)
            {
                false
            } else {
                if !notification.read {
                    state.unread += 1;
                }
                state.notifications.insert(0, notification.clone());
                self.unread_tx.send_replace(state.unread);
                true
            }
        };

        if fresh {
            self.toasts.push(notification);
        }
    }

    /// Mark one notification read, optimistically
    pub async fn mark_read(&self, viewer_id: Option<Uuid>, notification_id: Uuid) -> Result<()> {
        if viewer_id.is_none() {
            bail!(type = ErrorType::Unauthorized, "mark-read requires an authenticated viewer");
        }

        self.apply_optimistic(|state| {
            if let Some(notification) = state
                .notifications
                .iter_mut()
                .find(|notification| notification.id == notification_id)
            {
                if !notification.read {
                    notification.read = true;
                    state.unread = state.unread.saturating_sub(1);
                }
            }
        });

        if let Err(error) = self.backend.set_read(notification_id).await {
            warn!(%notification_id, ?error, "mark-read failed upstream; keeping optimistic state");
        }

        Ok(())
    }

    /// Mark every notification read, optimistically
    pub async fn mark_all_read(&self, viewer_id: Option<Uuid>) -> Result<()> {
        let Some(viewer_id) = viewer_id else {
            bail!(type = ErrorType::Unauthorized, "mark-all-read requires an authenticated viewer");
        };

        self.apply_optimistic(|state| {
            for notification in &mut state.notifications {
                notification.read = true;
            }
            state.unread = 0;
        });

        if let Err(error) = self.backend.set_all_read(viewer_id).await {
            warn!(?error, "mark-all-read failed upstream; keeping optimistic state");
        }

        Ok(())
    }

    /// Open the live stream for one recipient and feed it into the store
    ///
    /// Channel naming embeds the recipient id, so a stale subscription
    /// from a just-logged-out user can never deliver into the wrong
    /// store. Reconnection is the transport's concern; callers re-subscribe
    /// on remount instead.
    pub async fn subscribe(&self, viewer_id: Uuid) -> Result<NotificationSubscription> {
        let mut stream = self.backend.notification_stream(viewer_id).await?;

        let this = self.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match event {
                    Ok(notification) => this.on_push(notification),
                    Err(error) => debug!(?error, "notification stream error"),
                }
            }
        });

        Ok(NotificationSubscription { task })
    }

    /// Snapshot of the local list, newest first
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().unwrap().notifications.clone()
    }

    /// Current local unread counter
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.state.lock().unwrap().unread
    }

    /// Receiver that observes every unread-counter change
    #[must_use]
    pub fn watch_unread(&self) -> watch::Receiver<usize> {
        self.unread_tx.subscribe()
    }

    /// Apply a local state change and publish the resulting counter
    ///
    /// This is the single entry point for the optimistic update policy;
    /// nothing applied here is ever rolled back.
    fn apply_optimistic<F>(&self, apply: F)
    where
        F: FnOnce(&mut ReadState),
    {
        let mut state = self.state.lock().unwrap();
        apply(&mut state);
        self.unread_tx.send_replace(state.unread);
    }
}

#[cfg(test)]
mod test {
    use super::{GetNotifications, NotificationService};
    use crate::toast::ToastPresenter;
    use kyokai_backend::{AnyBackend, BackendClient};
    use kyokai_error::ErrorType;
    use kyokai_test::{fresh_backend, sample_notification};
    use kyokai_type::NewNotification;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use uuid::Uuid;

    fn service() -> (NotificationService, AnyBackend) {
        let backend = fresh_backend();
        let service = NotificationService::builder()
            .backend(backend.clone())
            .toasts(ToastPresenter::default())
            .build();

        (service, backend)
    }

    #[tokio::test]
    async fn counter_never_goes_negative() {
        let (service, _backend) = service();
        let viewer = Uuid::now_v7();

        let first = sample_notification(viewer);
        let second = sample_notification(viewer);
        service.on_push(first.clone());
        service.on_push(second.clone());
        assert_eq!(service.unread_count(), 2);

        service.mark_read(Some(viewer), first.id).await.unwrap();
        service.mark_read(Some(viewer), second.id).await.unwrap();
        // Stale repeats and unknown ids must not underflow
        service.mark_read(Some(viewer), first.id).await.unwrap();
        service
            .mark_read(Some(viewer), Uuid::now_v7())
            .await
            .unwrap();

        assert_eq!(service.unread_count(), 0);
    }

    #[tokio::test]
    async fn push_inserts_at_head_and_deduplicates() {
        let (service, backend) = service();
        let viewer = Uuid::now_v7();

        let persisted = backend
            .create_notification(NewNotification::system(viewer, "welcome", "hello"))
            .await
            .unwrap();
        service
            .load_all(GetNotifications::builder().viewer_id(Some(viewer)).build())
            .await
            .unwrap();

        // Redelivery of an already-known record is dropped
        service.on_push(persisted.clone());
        assert_eq!(service.notifications().len(), 1);
        assert_eq!(service.unread_count(), 1);

        let newer = sample_notification(viewer);
        service.on_push(newer.clone());
        let ids: Vec<Uuid> = service
            .notifications()
            .iter()
            .map(|notification| notification.id)
            .collect();
        assert_eq!(ids, [newer.id, persisted.id]);
    }

    #[tokio::test]
    async fn mark_all_read_is_immediate() {
        let (service, _backend) = service();
        let viewer = Uuid::now_v7();

        for _ in 0..5 {
            service.on_push(sample_notification(viewer));
        }
        assert_eq!(service.unread_count(), 5);

        service.mark_all_read(Some(viewer)).await.unwrap();

        assert_eq!(service.unread_count(), 0);
        assert!(service
            .notifications()
            .iter()
            .all(|notification| notification.read));
    }

    #[tokio::test]
    async fn failed_remote_mark_read_keeps_optimistic_state() {
        let (service, _backend) = service();
        let viewer = Uuid::now_v7();

        // Known locally only; the backend will report NotFound
        let local_only = sample_notification(viewer);
        service.on_push(local_only.clone());

        service
            .mark_read(Some(viewer), local_only.id)
            .await
            .unwrap();

        assert_eq!(service.unread_count(), 0);
        assert!(service.notifications()[0].read);
    }

    #[tokio::test]
    async fn reads_without_identity_are_empty() {
        let (service, _backend) = service();

        let list = service
            .load_all(GetNotifications::builder().build())
            .await
            .unwrap();
        assert!(list.is_empty());
        assert_eq!(service.load_unread_count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mutations_without_identity_fail_loudly() {
        let (service, _backend) = service();

        let err = service.mark_read(None, Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err.error_type(), ErrorType::Unauthorized));

        let err = service.mark_all_read(None).await.unwrap_err();
        assert!(matches!(err.error_type(), ErrorType::Unauthorized));
    }

    #[tokio::test]
    async fn oversized_fetch_limit_is_rejected() {
        let (service, _backend) = service();

        let result = service
            .load_all(
                GetNotifications::builder()
                    .viewer_id(Some(Uuid::now_v7()))
                    .limit(10_000)
                    .build(),
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn subscription_feeds_the_store() {
        let (service, backend) = service();
        let viewer = Uuid::now_v7();

        let mut unread = service.watch_unread();
        let subscription = service.subscribe(viewer).await.unwrap();

        backend
            .create_notification(NewNotification::forum_reply(viewer, "Jun", "My post"))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), unread.changed())
            .await
            .expect("push never arrived")
            .unwrap();
        assert_eq!(*unread.borrow(), 1);
        assert_eq!(service.notifications().len(), 1);

        // Teardown is idempotent
        subscription.unsubscribe();
        subscription.unsubscribe();
        drop(subscription);
    }
}
