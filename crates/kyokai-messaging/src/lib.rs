#![doc = include_str!("../README.md")]
#![forbid(missing_docs, rust_2018_idioms)]
#![allow(forbidden_lint_groups)]

use enum_dispatch::enum_dispatch;
use futures_util::{stream::BoxStream, Stream};
use pin_project_lite::pin_project;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    error::Error,
    marker::PhantomData,
    pin::Pin,
    sync::Arc,
    task::{self, ready, Poll},
};

pub mod tokio_broadcast;

/// Boxed error
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Type alias for Result, defaulting to [`BoxError`] on the error branch
pub type Result<T, E = BoxError> = std::result::Result<T, E>;

/// Enum dispatch over all supported backends
#[enum_dispatch(MessagingBackend)]
pub enum AnyMessagingBackend {
    /// Tokio broadcast backend
    Tokio(tokio_broadcast::TokioBroadcastMessagingBackend),
}

/// Messaging backend
///
/// The backend only needs to be able to transport bytes between named
/// channels. Channel scoping (for example embedding a recipient id in the
/// channel name) is entirely the caller's concern.
#[enum_dispatch]
#[allow(async_fn_in_trait)] // Because of `enum_dispatch`
pub trait MessagingBackend {
    /// Enqueue a new message onto the backend
    async fn enqueue(&self, channel_name: &str, message: Vec<u8>) -> Result<()>;

    /// Open a new stream of messages from the backend
    async fn message_stream(
        &self,
        channel_name: String,
    ) -> Result<BoxStream<'static, Result<Vec<u8>>>>;
}

pin_project! {
    /// Consumer of messages
    pub struct MessageConsumer<M> {
        channel_name: String,
        #[pin]
        inner: BoxStream<'static, Result<Vec<u8>>>,
        _ty: PhantomData<M>,
    }
}

impl<M> MessageConsumer<M> {
    /// Name of the channel this consumer is attached to
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }
}

impl<M> Stream for MessageConsumer<M>
where
    M: DeserializeOwned,
{
    type Item = Result<M>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.inner.poll_next(cx)) {
            Some(Ok(mut msg)) => {
                Poll::Ready(Some(simd_json::from_slice(&mut msg).map_err(Into::into)))
            }
            Some(Err(err)) => Poll::Ready(Some(Err(err))),
            None => Poll::Ready(None),
        }
    }
}

/// Message emitter
///
/// Cheaply clonable. Internally it is a channel name and an `Arc`
/// referencing the backend.
#[derive(Clone)]
pub struct MessageEmitter<M> {
    backend: Arc<AnyMessagingBackend>,
    channel_name: String,
    _ty: PhantomData<M>,
}

impl<M> MessageEmitter<M>
where
    M: DeserializeOwned + Serialize,
{
    /// Emit a new message
    ///
    /// # Errors
    ///
    /// - Message failed to serialise
    /// - Message failed to enqueue
    pub async fn emit(&self, message: M) -> Result<()> {
        let message = simd_json::to_vec(&message)?;
        self.backend.enqueue(&self.channel_name, message).await
    }
}

/// Central hub for messaging
///
/// Registers emitters and consumers. Channels with the same name on the
/// same hub are connected; whether that holds across two hub instances is
/// backend-dependent.
#[derive(Clone)]
pub struct MessagingHub {
    backend: Arc<AnyMessagingBackend>,
}

impl MessagingHub {
    /// Create a new messaging hub
    pub fn new<B>(backend: B) -> Self
    where
        B: Into<AnyMessagingBackend>,
    {
        Self {
            backend: Arc::new(backend.into()),
        }
    }

    /// Create a new consumer of messages emitted to the channel
    ///
    /// # Errors
    ///
    /// - Consumer failed to be created
    pub async fn consumer<M>(&self, channel_name: String) -> Result<MessageConsumer<M>>
    where
        M: DeserializeOwned + Serialize,
    {
        let message_stream = self.backend.message_stream(channel_name.clone()).await?;

        Ok(MessageConsumer {
            channel_name,
            inner: message_stream,
            _ty: PhantomData,
        })
    }

    /// Create a new emitter for a channel
    #[must_use]
    pub fn emitter<M>(&self, channel_name: String) -> MessageEmitter<M>
    where
        M: DeserializeOwned + Serialize,
    {
        MessageEmitter {
            channel_name,
            backend: self.backend.clone(),
            _ty: PhantomData,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{tokio_broadcast::TokioBroadcastMessagingBackend, MessagingHub};
    use futures_util::StreamExt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct TestEvent {
        id: u64,
        body: String,
    }

    #[tokio::test]
    async fn round_trip() {
        let hub = MessagingHub::new(TokioBroadcastMessagingBackend::default());

        let mut consumer = hub
            .consumer::<TestEvent>("events:alice".into())
            .await
            .unwrap();
        let emitter = hub.emitter::<TestEvent>("events:alice".into());

        emitter
            .emit(TestEvent {
                id: 1,
                body: "hello".into(),
            })
            .await
            .unwrap();

        let received = consumer.next().await.unwrap().unwrap();
        assert_eq!(
            received,
            TestEvent {
                id: 1,
                body: "hello".into(),
            }
        );
    }

    #[tokio::test]
    async fn channels_do_not_cross_talk() {
        let hub = MessagingHub::new(TokioBroadcastMessagingBackend::default());

        let mut alice = hub
            .consumer::<TestEvent>("events:alice".into())
            .await
            .unwrap();
        let mut bob = hub.consumer::<TestEvent>("events:bob".into()).await.unwrap();

        hub.emitter::<TestEvent>("events:bob".into())
            .emit(TestEvent {
                id: 7,
                body: "for bob".into(),
            })
            .await
            .unwrap();

        let received = bob.next().await.unwrap().unwrap();
        assert_eq!(received.id, 7);

        // Alice's channel stays empty
        let pending = futures_util::poll!(alice.next());
        assert!(pending.is_pending());
    }
}
