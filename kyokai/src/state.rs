use crate::event::NotificationEventConsumer;
use kyokai_backend::{AnyBackend, BackendClient};
use kyokai_config::Configuration;
use kyokai_error::Result;
use kyokai_service::{
    bell::BellView,
    forum::ForumService,
    notification::{GetNotifications, NotificationService, NotificationSubscription},
    toast::ToastPresenter,
};
use std::sync::{Arc, Mutex};
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Service collection
///
/// This contains all the "services" a running client consists of: the
/// notification store, the forum store and the two passive presenters
/// layered on top of them.
#[derive(Clone)]
pub struct Service {
    pub bell: BellView,
    pub forum: ForumService,
    pub notification: NotificationService,
    pub toasts: ToastPresenter,
}

/// One signed-in viewer and their live subscription
///
/// Dropping this aborts the subscription task, so replacing the slot is
/// enough to tear a session down.
struct SignedIn {
    viewer_id: Uuid,
    _subscription: NotificationSubscription,
}

/// Application state of one running client
#[derive(Clone, TypedBuilder)]
pub struct Session {
    pub backend: AnyBackend,
    pub config: Configuration,
    pub service: Service,
    #[builder(default, setter(skip))]
    signed_in: Arc<Mutex<Option<SignedIn>>>,
}

impl Session {
    /// Identity of the currently signed-in viewer, if any
    #[must_use]
    pub fn viewer(&self) -> Option<Uuid> {
        self.signed_in
            .lock()
            .unwrap()
            .as_ref()
            .map(|signed_in| signed_in.viewer_id)
    }

    /// Sign a viewer in: open their live stream and prime the stores
    ///
    /// Signing in over an existing session tears the old subscription
    /// down first, so two streams never feed the stores at once.
    pub async fn sign_in(&self, viewer_id: Uuid) -> Result<()> {
        drop(self.signed_in.lock().unwrap().take());

        let subscription = self.service.notification.subscribe(viewer_id).await?;
        self.service
            .notification
            .load_all(
                GetNotifications::builder()
                    .viewer_id(Some(viewer_id))
                    .build(),
            )
            .await?;
        self.service
            .notification
            .load_unread_count(Some(viewer_id))
            .await?;
        self.service.forum.load_posts(Some(viewer_id)).await?;

        *self.signed_in.lock().unwrap() = Some(SignedIn {
            viewer_id,
            _subscription: subscription,
        });

        debug!(%viewer_id, "session established");

        Ok(())
    }

    /// Tear the live subscription down; signing out twice is a no-op
    pub fn sign_out(&self) {
        if let Some(signed_in) = self.signed_in.lock().unwrap().take() {
            debug!(viewer_id = %signed_in.viewer_id, "session torn down");
        }
    }

    /// Raw per-recipient notification stream, bypassing the store
    pub async fn notification_events(&self, viewer_id: Uuid) -> Result<NotificationEventConsumer> {
        self.backend.notification_stream(viewer_id).await
    }
}
