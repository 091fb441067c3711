//! Background socket channel.
//!
//! [`RealtimeHandle::spawn`] starts a long-lived task that connects,
//! sends `join`, relays outbound [`ClientEvent`]s and publishes inbound
//! [`ServerEvent`]s on a broadcast channel. When the connection drops the
//! task reconnects with backoff and joins the room again.
//!
//! Outbound events emitted while disconnected are dropped, not queued.

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::{RealtimeClient, RealtimeError, WsStream};
use crate::messages::{encode, parse_message, ClientEvent, JoinData, ServerEvent};
use crate::reconnect::{connect_with_backoff, ReconnectConfig};

/// Broadcast channel capacity for inbound events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long [`RealtimeHandle::shutdown`] waits for the task to exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Who this client is, sent in every `join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinIdentity {
    pub user_id: String,
    pub partner_id: Option<String>,
}

impl JoinIdentity {
    fn join_event(&self) -> ClientEvent {
        ClientEvent::Join(JoinData {
            user_id: self.user_id.clone(),
            partner_id: self.partner_id.clone(),
        })
    }
}

/// What subscribers of the channel observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A connection was established and `join` is being sent.
    Connected,
    /// The connection dropped. A reconnect follows unless shutting down.
    Disconnected,
    /// An event pushed by the server.
    Event(ServerEvent),
}

/// Handle to the background channel task.
pub struct RealtimeHandle {
    outbound_tx: mpsc::UnboundedSender<ClientEvent>,
    event_tx: broadcast::Sender<ChannelEvent>,
    cancel: CancellationToken,
    task_handle: JoinHandle<()>,
}

impl RealtimeHandle {
    /// Spawn the channel task.
    ///
    /// Returns the handle together with a receiver subscribed before the
    /// task starts, so the first [`ChannelEvent::Connected`] is never
    /// missed.
    pub fn spawn(
        client: RealtimeClient,
        identity: JoinIdentity,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> (Self, broadcast::Receiver<ChannelEvent>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        let task_events = event_tx.clone();
        let task_handle = tokio::spawn(async move {
            tracing::info!(user_id = %identity.user_id, "Starting socket channel");
            run_channel(
                &client,
                &identity,
                &reconnect,
                outbound_rx,
                &task_events,
                &task_cancel,
            )
            .await;
            tracing::info!("Socket channel exited");
        });

        let handle = Self {
            outbound_tx,
            event_tx,
            cancel,
            task_handle,
        };
        (handle, event_rx)
    }

    /// Queue an event for sending. Fire-and-forget.
    pub fn emit(&self, event: ClientEvent) {
        if self.outbound_tx.send(event).is_err() {
            tracing::debug!("Socket channel closed, dropping outbound event");
        }
    }

    /// A cloneable sender for components that emit on their own tasks.
    pub fn sender(&self) -> mpsc::UnboundedSender<ClientEvent> {
        self.outbound_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.event_tx.subscribe()
    }

    /// Close the socket and wait for the task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.task_handle)
            .await
            .is_err()
        {
            tracing::warn!("Socket channel did not stop within timeout");
        }
    }
}

/// How a single connection ended.
enum SessionEnd {
    Dropped,
    Cancelled,
    OutboundClosed,
}

/// Connect -> join -> relay -> reconnect, until cancelled.
async fn run_channel(
    client: &RealtimeClient,
    identity: &JoinIdentity,
    reconnect: &ReconnectConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientEvent>,
    event_tx: &broadcast::Sender<ChannelEvent>,
    cancel: &CancellationToken,
) {
    loop {
        let conn = match connect_with_backoff(client, reconnect, cancel).await {
            Some(conn) => conn,
            None => return,
        };

        let stale = drain_stale(&mut outbound_rx);
        if stale > 0 {
            tracing::debug!(count = stale, "Dropped events emitted while disconnected");
        }

        let _ = event_tx.send(ChannelEvent::Connected);
        let end = run_session(conn.ws_stream, identity, &mut outbound_rx, event_tx, cancel).await;
        let _ = event_tx.send(ChannelEvent::Disconnected);

        match end {
            SessionEnd::Cancelled | SessionEnd::OutboundClosed => return,
            SessionEnd::Dropped => {
                tracing::info!("Socket connection lost, reconnecting");
            }
        }
    }
}

fn drain_stale(outbound_rx: &mut mpsc::UnboundedReceiver<ClientEvent>) -> usize {
    let mut count = 0;
    while outbound_rx.try_recv().is_ok() {
        count += 1;
    }
    count
}

async fn run_session(
    ws_stream: WsStream,
    identity: &JoinIdentity,
    outbound_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    event_tx: &broadcast::Sender<ChannelEvent>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let (mut sink, mut stream) = ws_stream.split();

    if let Err(e) = send_event(&mut sink, &identity.join_event()).await {
        tracing::error!(error = %e, "Failed to send join");
        return SessionEnd::Dropped;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return SessionEnd::Cancelled;
            }
            outbound = outbound_rx.recv() => match outbound {
                Some(event) => {
                    if let Err(e) = send_event(&mut sink, &event).await {
                        tracing::error!(error = %e, "Failed to send socket event");
                        return SessionEnd::Dropped;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::OutboundClosed;
                }
            },
            inbound = next_frame(&mut stream) => match inbound {
                Some(text) => handle_text(&text, event_tx),
                None => return SessionEnd::Dropped,
            },
        }
    }
}

/// Read until the next text frame. `None` means the connection ended.
async fn next_frame(stream: &mut SplitStream<WsStream>) -> Option<String> {
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Binary(data)) => {
                tracing::debug!(len = data.len(), "Ignoring binary frame");
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Socket closed by server");
                return None;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Socket read error");
                return None;
            }
        }
    }
    None
}

fn handle_text(text: &str, event_tx: &broadcast::Sender<ChannelEvent>) {
    match parse_message(text) {
        Ok(event) => {
            tracing::debug!(?event, "Socket event received");
            let _ = event_tx.send(ChannelEvent::Event(event));
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring socket frame");
        }
    }
}

async fn send_event(
    sink: &mut SplitSink<WsStream, Message>,
    event: &ClientEvent,
) -> Result<(), RealtimeError> {
    let text = encode(event)?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}
