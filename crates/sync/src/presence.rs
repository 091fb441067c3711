//! Typing indicators in both directions.
//!
//! Inbound, [`TypingExpiry`] bounds how long the partner's "typing..."
//! indicator can stay on without a `partner_stop_typing`. Outbound,
//! [`TypingNotifier`] turns keystrokes into one `typing` event and a single
//! debounced `stop_typing`.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use duotrack_realtime::messages::{ClientEvent, TypingData};

/// How long a `partner_typing` stays valid without a follow-up.
pub const TYPING_EXPIRY: Duration = Duration::from_secs(3);

/// Quiet period after the last keystroke before `stop_typing` is sent.
pub const STOP_TYPING_DEBOUNCE: Duration = Duration::from_secs(1);

/// A re-armable deadline.
#[derive(Debug)]
pub struct TypingExpiry {
    ttl: Duration,
    deadline: Option<Instant>,
}

impl TypingExpiry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            deadline: None,
        }
    }

    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.ttl);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves when the deadline passes. Never resolves while disarmed.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

enum Input {
    Keystroke,
    Stop,
}

/// Debounced outbound typing notifications for one recipient.
pub struct TypingNotifier {
    input: mpsc::UnboundedSender<Input>,
    task_handle: JoinHandle<()>,
}

impl TypingNotifier {
    pub fn spawn(
        outbound: mpsc::UnboundedSender<ClientEvent>,
        recipient_id: String,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (input, rx) = mpsc::unbounded_channel();
        let task_handle = tokio::spawn(run_notifier(rx, outbound, recipient_id, debounce, cancel));
        Self { input, task_handle }
    }

    /// The user typed into a task title or comment box.
    pub fn keystroke(&self) {
        let _ = self.input.send(Input::Keystroke);
    }

    /// The user submitted or left the input; send `stop_typing` now.
    pub fn stop(&self) {
        let _ = self.input.send(Input::Stop);
    }

    pub fn is_finished(&self) -> bool {
        self.task_handle.is_finished()
    }
}

async fn run_notifier(
    mut rx: mpsc::UnboundedReceiver<Input>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
    recipient_id: String,
    debounce: Duration,
    cancel: CancellationToken,
) {
    let mut quiet = TypingExpiry::new(debounce);
    let emit = |event: ClientEvent| {
        if outbound.send(event).is_err() {
            tracing::debug!("Socket channel closed, dropping typing event");
        }
    };
    let data = || TypingData {
        recipient_id: recipient_id.clone(),
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            input = rx.recv() => match input {
                Some(Input::Keystroke) => {
                    if !quiet.is_armed() {
                        emit(ClientEvent::Typing(data()));
                    }
                    quiet.arm();
                }
                Some(Input::Stop) => {
                    if quiet.is_armed() {
                        quiet.disarm();
                        emit(ClientEvent::StopTyping(data()));
                    }
                }
                None => break,
            },
            _ = quiet.expired() => {
                quiet.disarm();
                emit(ClientEvent::StopTyping(data()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_typing(event: &ClientEvent) -> bool {
        matches!(event, ClientEvent::Typing(d) if d.recipient_id == "u2")
    }

    fn is_stop(event: &ClientEvent) -> bool {
        matches!(event, ClientEvent::StopTyping(d) if d.recipient_id == "u2")
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_keystrokes_sends_one_typing_and_one_stop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier =
            TypingNotifier::spawn(tx, "u2".into(), STOP_TYPING_DEBOUNCE, CancellationToken::new());

        for _ in 0..5 {
            notifier.keystroke();
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert!(is_typing(&rx.recv().await.unwrap()));
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(is_stop(&rx.recv().await.unwrap()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_stop_is_sent_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier =
            TypingNotifier::spawn(tx, "u2".into(), STOP_TYPING_DEBOUNCE, CancellationToken::new());

        notifier.keystroke();
        notifier.stop();
        assert!(is_typing(&rx.recv().await.unwrap()));
        assert!(is_stop(&rx.recv().await.unwrap()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_notifier() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let notifier = TypingNotifier::spawn(tx, "u2".into(), STOP_TYPING_DEBOUNCE, cancel.clone());

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(notifier.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_fires_after_ttl_and_not_while_disarmed() {
        let mut expiry = TypingExpiry::new(TYPING_EXPIRY);
        let idle = tokio::time::timeout(Duration::from_secs(60), expiry.expired()).await;
        assert!(idle.is_err());

        expiry.arm();
        let start = Instant::now();
        expiry.expired().await;
        assert_eq!(start.elapsed(), TYPING_EXPIRY);
    }
}
