//! Mailbox shared by the ticker and trade flux actors.

use tokio::sync::{mpsc, oneshot};

use crate::error::{FluxError, FluxResult};

/// Messages for a flux actor.
#[derive(Debug)]
pub enum FluxMsg<E> {
    /// Apply one event.
    Event(E),

    /// Reply once every earlier message has been applied.
    Flush(oneshot::Sender<()>),

    /// Graceful shutdown.
    Shutdown,
}

/// Sending side of a flux mailbox.
#[derive(Debug)]
pub(crate) struct Mailbox<E> {
    name: &'static str,
    tx: mpsc::Sender<FluxMsg<E>>,
}

impl<E> Clone for Mailbox<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<E> Mailbox<E> {
    pub(crate) fn new(name: &'static str, tx: mpsc::Sender<FluxMsg<E>>) -> Self {
        Self { name, tx }
    }

    /// Queue an event, waiting for capacity.
    pub(crate) async fn emit(&self, event: E) -> FluxResult<()> {
        self.tx
            .send(FluxMsg::Event(event))
            .await
            .map_err(|_| FluxError::Stopped(self.name))
    }

    /// Queue an event without waiting.
    pub(crate) fn try_emit(&self, event: E) -> FluxResult<()> {
        self.tx.try_send(FluxMsg::Event(event)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => FluxError::QueueFull(self.name),
            mpsc::error::TrySendError::Closed(_) => FluxError::Stopped(self.name),
        })
    }

    pub(crate) async fn flush(&self) -> FluxResult<()> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(FluxMsg::Flush(tx))
            .await
            .map_err(|_| FluxError::Stopped(self.name))?;
        rx.await.map_err(|_| FluxError::Stopped(self.name))
    }

    pub(crate) async fn shutdown(&self) {
        let _ = self.tx.send(FluxMsg::Shutdown).await;
    }
}
