//! Exponential-backoff connection logic for the socket channel.
//!
//! [`connect_with_backoff`] keeps retrying with increasing delays until
//! either a connection is established or the [`CancellationToken`] is
//! triggered. The first attempt is made immediately.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{RealtimeClient, RealtimeConnection};

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Connect to the socket server, backing off between failed attempts.
///
/// Returns `Some(connection)` once a connection succeeds, or `None` if
/// the `cancel` token is triggered first.
pub async fn connect_with_backoff(
    client: &RealtimeClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<RealtimeConnection> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        if attempt > 1 {
            tracing::info!(
                url = client.ws_url(),
                attempt,
                "Reconnecting to socket server",
            );
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(url = client.ws_url(), "Connect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => return Some(conn),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Socket connect attempt {attempt} failed",
                        );
                    }
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = ReconnectConfig::default();
        let d = next_delay(Duration::from_secs(1), &config);
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(next_delay(Duration::from_secs(8), &config), Duration::from_secs(10));
        assert_eq!(next_delay(Duration::from_secs(10), &config), Duration::from_secs(10));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = ReconnectConfig::default();
        let mut delay = config.initial_delay;
        let expected = [1, 2, 4, 8, 16, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[tokio::test]
    async fn cancelled_token_stops_connecting() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = RealtimeClient::new("ws://127.0.0.1:9");
        let result = connect_with_backoff(&client, &ReconnectConfig::default(), &cancel).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn cancel_during_backoff_returns_none() {
        let cancel = CancellationToken::new();
        let client = RealtimeClient::new("ws://127.0.0.1:9");
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(60),
            ..Default::default()
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            connect_with_backoff(&client, &config, &cancel),
        )
        .await
        .expect("connect_with_backoff should observe cancellation");
        assert!(result.is_none());
    }
}
