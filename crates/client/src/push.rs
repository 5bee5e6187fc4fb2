//! Reconnecting push-channel connection.

use std::future;
use std::pin::Pin;

use finishcam_core::ReconnectPolicy;
use futures_util::StreamExt;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::net::TcpStream;
use tokio::time::Sleep;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    /// One binary frame, `[kind][payload]`.
    Frame(Vec<u8>),
    /// The connection closed or failed to open; a retry may follow.
    Disconnected(String),
    /// The reconnect policy is exhausted.
    GaveUp,
}

enum LinkState {
    Idle,
    Waiting(Pin<Box<Sleep>>),
    Connecting(BoxFuture<'static, Result<WsStream, tungstenite::Error>>),
    Open(Box<WsStream>),
    Stopped,
}

/// Push connection driven from a `select!` loop.
///
/// [`PushLink::next_event`] only keeps state in `self`, so dropping its
/// future to service another branch loses nothing.
pub struct PushLink {
    endpoint: Url,
    policy: ReconnectPolicy,
    attempt: u32,
    state: LinkState,
}

impl PushLink {
    pub fn new(endpoint: Url, policy: ReconnectPolicy) -> Self {
        Self {
            endpoint,
            policy,
            attempt: 0,
            state: LinkState::Idle,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn next_event(&mut self) -> PushEvent {
        loop {
            match &mut self.state {
                LinkState::Idle => self.connect(),
                LinkState::Waiting(sleep) => {
                    sleep.as_mut().await;
                    self.connect();
                }
                LinkState::Connecting(pending) => match pending.await {
                    Ok(ws) => {
                        log::info!("push channel connected to {}", self.endpoint);
                        self.attempt = 0;
                        self.state = LinkState::Open(Box::new(ws));
                        return PushEvent::Connected;
                    }
                    Err(e) => return self.retry(format!("connect failed: {e}")),
                },
                LinkState::Open(ws) => match ws.next().await {
                    Some(Ok(Message::Binary(data))) => return PushEvent::Frame(data),
                    Some(Ok(Message::Close(frame))) => {
                        let reason = match frame {
                            Some(f) if !f.reason.is_empty() => {
                                format!("closed by server: {}", f.reason)
                            }
                            _ => "closed by server".to_string(),
                        };
                        return self.retry(reason);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return self.retry(e.to_string()),
                    None => return self.retry("stream ended".to_string()),
                },
                LinkState::Stopped => future::pending::<()>().await,
            }
        }
    }

    /// Close the connection and stop reconnecting.
    pub async fn close(&mut self) {
        if let LinkState::Open(ws) = &mut self.state
            && let Err(e) = ws.close(None).await
        {
            log::debug!("closing push channel: {e}");
        }
        self.state = LinkState::Stopped;
    }

    fn connect(&mut self) {
        let request = self.endpoint.to_string();
        log::debug!("connecting push channel to {request}");
        self.state = LinkState::Connecting(
            async move { connect_async(request).await.map(|(ws, _)| ws) }.boxed(),
        );
    }

    fn retry(&mut self, reason: String) -> PushEvent {
        match self.policy.delay(self.attempt) {
            Some(delay) => {
                log::warn!("push channel lost ({reason}), retrying in {delay:?}");
                self.attempt = self.attempt.saturating_add(1);
                self.state = LinkState::Waiting(Box::pin(tokio::time::sleep(delay)));
                PushEvent::Disconnected(reason)
            }
            None => {
                log::warn!("push channel lost ({reason}), not reconnecting");
                self.state = LinkState::Stopped;
                PushEvent::GaveUp
            }
        }
    }
}
