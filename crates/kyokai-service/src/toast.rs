use kyokai_type::Notification;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::Notify;
use uuid::Uuid;

/// Delay before a fresh toast becomes visible, so the enter animation
/// applies to a mounted element instead of animating from nothing
pub const ENTER_DELAY: Duration = Duration::from_millis(50);

/// How long a toast stays visible before it expires on its own
pub const DISPLAY_DURATION: Duration = Duration::from_secs(6);

/// Length of the exit animation between dismissal and removal
pub const EXIT_DURATION: Duration = Duration::from_millis(200);

/// Lifecycle of a toast while it is in the queue
///
/// The terminal "removed" state has no variant: a removed toast is
/// spliced out of the queue entirely.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ToastState {
    Pending,
    Visible,
    Exiting,
}

/// Ephemeral view of a notification, created only for live pushes
///
/// The instance id is generated locally and is distinct from the
/// notification id, so the same notification can produce independent
/// toast instances without collision.
#[derive(Clone, Debug)]
pub struct Toast {
    pub instance_id: Uuid,
    pub notification: Notification,
    pub state: ToastState,
}

/// Time-boxed visual queue of toasts
///
/// New toasts append at the tail; removal by instance id works from any
/// position, since a middle toast may be dismissed while its neighbours
/// keep running. Auto-expiry and manual dismissal race, and whichever
/// fires first cancels the other.
#[derive(Clone, Default)]
pub struct ToastPresenter {
    queue: Arc<Mutex<Vec<Entry>>>,
}

struct Entry {
    toast: Toast,
    dismiss: Arc<Notify>,
}

impl ToastPresenter {
    /// Enqueue a toast for a freshly pushed notification
    ///
    /// Must be called from within a Tokio runtime; the lifecycle timers
    /// run on a spawned task.
    pub fn push(&self, notification: Notification) -> Uuid {
        let instance_id = Uuid::now_v7();
        let dismiss = Arc::new(Notify::new());

        self.queue.lock().unwrap().push(Entry {
            toast: Toast {
                instance_id,
                notification,
                state: ToastState::Pending,
            },
            dismiss: Arc::clone(&dismiss),
        });

        let queue = Arc::clone(&self.queue);
        tokio::spawn(async move {
            tokio::time::sleep(ENTER_DELAY).await;
            set_state(&queue, instance_id, ToastState::Visible);

            // A dismissal during the race cancels the expiry timer and
            // vice versa; a dismissal that landed while the toast was
            // still pending is latched and takes effect here
            tokio::select! {
                () = tokio::time::sleep(DISPLAY_DURATION) => {}
                () = dismiss.notified() => {}
            }

            set_state(&queue, instance_id, ToastState::Exiting);
            tokio::time::sleep(EXIT_DURATION).await;

            queue
                .lock()
                .unwrap()
                .retain(|entry| entry.toast.instance_id != instance_id);
        });

        instance_id
    }

    /// Dismiss one toast early; unknown ids are a no-op
    pub fn dismiss(&self, instance_id: Uuid) {
        let queue = self.queue.lock().unwrap();
        if let Some(entry) = queue
            .iter()
            .find(|entry| entry.toast.instance_id == instance_id)
        {
            entry.dismiss.notify_one();
        }
    }

    /// Snapshot of the active queue in stacking order
    #[must_use]
    pub fn active(&self) -> Vec<Toast> {
        self.queue
            .lock()
            .unwrap()
            .iter()
            .map(|entry| entry.toast.clone())
            .collect()
    }
}

fn set_state(queue: &Mutex<Vec<Entry>>, instance_id: Uuid, state: ToastState) {
    if let Some(entry) = queue
        .lock()
        .unwrap()
        .iter_mut()
        .find(|entry| entry.toast.instance_id == instance_id)
    {
        entry.toast.state = state;
    }
}
