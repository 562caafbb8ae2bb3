use crate::notification::NotificationService;
use kyokai_error::Result;
use smol_str::SmolStr;
use tokio::sync::watch;
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Largest number the badge renders; anything above shows as "9+"
pub const BADGE_CEILING: usize = 9;

/// Passive renderer state for the notification bell
///
/// Holds no counter of its own: it reads the store's counter, re-syncs it
/// on mount and observes changes through the store's watch channel. The
/// presentation ceiling never alters the stored count.
#[derive(Clone, TypedBuilder)]
pub struct BellView {
    notifications: NotificationService,
}

impl BellView {
    /// Re-sync the counter for the owning recipient
    pub async fn mount(&self, viewer_id: Option<Uuid>) -> Result<usize> {
        self.notifications.load_unread_count(viewer_id).await
    }

    /// Fires on every stored-counter change, e.g. after the notification
    /// panel closes or a mark-all-read
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<usize> {
        self.notifications.watch_unread()
    }

    /// Badge label; `None` hides the badge entirely
    #[must_use]
    pub fn badge(&self) -> Option<SmolStr> {
        badge_label(self.notifications.unread_count())
    }
}

fn badge_label(count: usize) -> Option<SmolStr> {
    match count {
        0 => None,
        count if count > BADGE_CEILING => Some(SmolStr::new(format!("{BADGE_CEILING}+"))),
        count => Some(SmolStr::new(count.to_string())),
    }
}
