//! Live channel connection with state tracking and auto-reconnect.

use std::time::Duration;

use futures_channel::mpsc::UnboundedSender;
use futures_util::StreamExt;
use snapfeed_shared::{FeedError, Image, ServerEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::RECONNECT_DELAY;

/// Connection state for the live channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Pause before every reconnect attempt. Does not grow.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: RECONNECT_DELAY,
        }
    }
}

/// How a single open session ended.
enum SessionEnd {
    /// Remote close or transport error; reconnect.
    Dropped,
    /// Shutdown requested or nobody is listening any more; stop.
    Stopped,
}

/// A managed connection to the live channel.
///
/// Every valid `new_image` announcement is forwarded exactly once to the
/// arrivals channel handed to [`LiveConnection::spawn`]. Malformed or
/// unrelated frames are dropped without affecting the connection.
pub struct LiveConnection {
    pub url: String,
    state: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl LiveConnection {
    /// Start the connection loop in a background tokio task.
    pub fn spawn(
        url: impl Into<String>,
        config: ReconnectConfig,
        arrivals: UnboundedSender<Image>,
    ) -> Self {
        let url = url.into();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_connection_loop(
            url.clone(),
            config,
            arrivals,
            state_tx,
            shutdown_rx,
        ));

        Self {
            url,
            state,
            shutdown,
            task: Some(task),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Close the socket and cancel any pending reconnect, then wait for the
    /// background task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("live connection task failed: {e}");
            }
        }
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Decode one text frame and forward it if it announces a new image.
///
/// Returns `false` once the receiving side has gone away.
fn forward_frame(text: &str, arrivals: &UnboundedSender<Image>) -> bool {
    match ServerEvent::decode(text) {
        Ok(event) => {
            let image = event.into_image();
            tracing::debug!("live arrival {}", image.id);
            arrivals.unbounded_send(image).is_ok()
        }
        Err(e) => {
            tracing::debug!("discarding live payload: {e}");
            true
        }
    }
}

async fn run_connection_loop(
    url: String,
    config: ReconnectConfig,
    arrivals: UnboundedSender<Image>,
    state: watch::Sender<ConnectionState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt = 0u32;

    loop {
        state.send_replace(ConnectionState::Connecting);

        let connected = tokio::select! {
            _ = shutdown.changed() => break,
            result = connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((mut ws_stream, _response)) => {
                state.send_replace(ConnectionState::Open);
                attempt = 0;
                tracing::info!("live channel connected to {url}");

                let end = loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if let Err(e) = ws_stream.close(None).await {
                                tracing::debug!("close on shutdown failed: {e}");
                            }
                            break SessionEnd::Stopped;
                        }
                        frame = ws_stream.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                if !forward_frame(text.as_str(), &arrivals) {
                                    tracing::info!("arrivals receiver dropped, stopping live channel");
                                    break SessionEnd::Stopped;
                                }
                            }
                            Some(Ok(Message::Close(_))) => {
                                tracing::info!("live channel {url} received close frame");
                                break SessionEnd::Dropped;
                            }
                            Some(Ok(_)) => {
                                // Ping/pong and binary frames carry nothing for us.
                            }
                            Some(Err(e)) => {
                                let err = FeedError::Connection(e.to_string());
                                tracing::warn!("live channel read error: {err}");
                                break SessionEnd::Dropped;
                            }
                            None => break SessionEnd::Dropped,
                        }
                    }
                };

                state.send_replace(ConnectionState::Disconnected);
                tracing::info!("live channel to {url} closed");
                if matches!(end, SessionEnd::Stopped) {
                    return;
                }
            }
            Err(e) => {
                let err = FeedError::Connection(e.to_string());
                tracing::warn!("live channel error for {url}: {err}");
                state.send_replace(ConnectionState::Disconnected);
            }
        }

        attempt += 1;
        tracing::info!(
            "reconnecting to {url} in {}ms (attempt {attempt})",
            config.delay.as_millis()
        );
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(config.delay) => {}
        }
    }

    state.send_replace(ConnectionState::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_channel::mpsc::unbounded;

    const IMAGE: &str = r#"{"id":"n1","title":"New","tags":["fresh"],"filename":"n1.jpg","url":"/uploads/n1.jpg","created_at":"2024-05-01T00:00:00Z"}"#;

    #[test]
    fn forward_frame_passes_new_images() {
        let (tx, mut rx) = unbounded();
        let text = format!(r#"{{"type":"new_image","image":{IMAGE}}}"#);

        assert!(forward_frame(&text, &tx));
        let image = rx.try_next().unwrap().unwrap();
        assert_eq!(image.id, "n1");
        assert!(rx.try_next().is_err());
    }

    #[test]
    fn forward_frame_swallows_garbage() {
        let (tx, mut rx) = unbounded();
        assert!(forward_frame("{not json", &tx));
        assert!(forward_frame(r#"{"type":"ping"}"#, &tx));
        assert!(forward_frame(
            &format!(r#"{{"type":"other","image":{IMAGE}}}"#),
            &tx
        ));
        // Nothing was forwarded; the channel is empty but still open.
        assert!(rx.try_next().is_err());
    }

    #[test]
    fn forward_frame_reports_dropped_receiver() {
        let (tx, rx) = unbounded();
        drop(rx);
        let text = format!(r#"{{"type":"new_image","image":{IMAGE}}}"#);
        assert!(!forward_frame(&text, &tx));
    }

    #[test]
    fn default_reconnect_delay_is_fixed() {
        assert_eq!(ReconnectConfig::default().delay, Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempts_retry_at_a_fixed_interval() {
        // Accepts TCP and hangs up at once, so every handshake fails.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (attempts_tx, mut attempts) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                drop(stream);
                if attempts_tx.send(tokio::time::Instant::now()).is_err() {
                    return;
                }
            }
        });

        let (tx, _rx) = unbounded();
        let connection =
            LiveConnection::spawn(format!("ws://{addr}/ws"), ReconnectConfig::default(), tx);

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(attempts.recv().await.unwrap());
        }

        for pair in seen.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= RECONNECT_DELAY, "retried early after {gap:?}");
            assert!(
                gap < RECONNECT_DELAY + Duration::from_millis(50),
                "delay grew to {gap:?}"
            );
        }
        assert!(!connection.state().is_open());
        connection.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_reconnect() {
        let (tx, _rx) = unbounded();
        let connection = LiveConnection::spawn(
            "ws://127.0.0.1:1/ws",
            ReconnectConfig {
                delay: Duration::from_secs(3600),
            },
            tx,
        );
        let states = connection.subscribe_state();

        // Let the first attempt fail so the task sits in its reconnect sleep.
        tokio::time::sleep(Duration::from_millis(100)).await;

        tokio::time::timeout(Duration::from_secs(1), connection.shutdown())
            .await
            .expect("shutdown must not wait for the reconnect delay");
        assert_eq!(*states.borrow(), ConnectionState::Disconnected);
    }
}
