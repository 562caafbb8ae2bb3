#![forbid(rust_2018_idioms)]
#![allow(forbidden_lint_groups)]

#[macro_use]
extern crate tracing;

pub mod event;
pub mod observability;
pub mod state;

use self::state::{Service, Session};
use kyokai_backend::{AnyBackend, InMemoryBackend};
use kyokai_config::{backend, messaging, Configuration};
use kyokai_messaging::{tokio_broadcast::TokioBroadcastMessagingBackend, MessagingHub};
use kyokai_service::{
    bell::BellView, forum::ForumService, notification::NotificationService, toast::ToastPresenter,
};

/// Wire up the backend, messaging hub and service collection
#[must_use]
pub fn prepare_state(config: &Configuration) -> Session {
    let hub = match config.messaging {
        messaging::Configuration::InProcess => {
            MessagingHub::new(TokioBroadcastMessagingBackend::default())
        }
    };

    let backend = match config.backend {
        backend::Configuration::InMemory(ref in_memory) => {
            if in_memory.seed_demo_data {
                AnyBackend::from(InMemoryBackend::with_demo_data(hub))
            } else {
                AnyBackend::from(InMemoryBackend::new(hub))
            }
        }
    };

    let toasts = ToastPresenter::default();
    let notification = NotificationService::builder()
        .backend(backend.clone())
        .toasts(toasts.clone())
        .build();

    Session::builder()
        .backend(backend.clone())
        .config(config.clone())
        .service(Service {
            bell: BellView::builder()
                .notifications(notification.clone())
                .build(),
            forum: ForumService::builder().backend(backend).build(),
            notification,
            toasts,
        })
        .build()
}
