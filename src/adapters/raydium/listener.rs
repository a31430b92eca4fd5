//! Raydium Pool Listener
//!
//! WebSocket client for the enhanced `transactionSubscribe` RPC method.
//! Connects, subscribes to transactions touching the AMM program, and
//! streams parsed events to the detector. Reconnects with exponential
//! backoff on connection loss; authentication and subscription refusals
//! are fatal and surface to the caller instead.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async, tungstenite, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::ports::chain_events::{ChainEventError, ChainEventSource, ParsedTxEvent};

use super::types::{parse_notification, subscribe_request, SubscribeReply};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Initial reconnect delay
const RECONNECT_BASE: Duration = Duration::from_secs(1);
/// Reconnect delay ceiling
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Streams program transactions over a websocket RPC endpoint.
pub struct RaydiumListener {
    ws_url: String,
    commitment: String,
    channel_capacity: usize,
}

impl RaydiumListener {
    pub fn new(ws_url: String, commitment: String, channel_capacity: usize) -> Self {
        Self {
            ws_url,
            commitment,
            channel_capacity,
        }
    }

    fn classify_connect_error(err: tungstenite::Error) -> ChainEventError {
        if let tungstenite::Error::Http(ref response) = err {
            let status = response.status();
            if status == 401 || status == 403 {
                return ChainEventError::Authentication(format!(
                    "endpoint rejected connection with {}",
                    status
                ));
            }
        }
        ChainEventError::Connection(err.to_string())
    }

    /// Open the websocket, send the subscription request, and wait for the
    /// node to acknowledge it.
    async fn connect_and_subscribe(
        ws_url: &str,
        program_id: &str,
        commitment: &str,
    ) -> Result<WsStream, ChainEventError> {
        info!(url = %ws_url, "connecting to transaction stream");

        let (mut ws, response) = connect_async(ws_url)
            .await
            .map_err(Self::classify_connect_error)?;
        debug!(status = %response.status(), "websocket connected");

        let request = subscribe_request(1, program_id, commitment);
        ws.send(Message::Text(request.to_string()))
            .await
            .map_err(|e| ChainEventError::Connection(e.to_string()))?;

        // The first substantive text frame is the subscription reply.
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let reply: SubscribeReply = serde_json::from_str(&text)
                        .map_err(|e| ChainEventError::Parse(e.to_string()))?;
                    if let Some(err) = reply.error {
                        return Err(ChainEventError::Subscription(format!(
                            "{} (code {})",
                            err.message, err.code
                        )));
                    }
                    if reply.result.is_some() {
                        info!(program = %program_id, "transaction subscription active");
                        return Ok(ws);
                    }
                }
                Ok(Message::Ping(payload)) => {
                    ws.send(Message::Pong(payload))
                        .await
                        .map_err(|e| ChainEventError::Connection(e.to_string()))?;
                }
                Ok(Message::Close(frame)) => {
                    return Err(ChainEventError::Connection(format!(
                        "closed during subscription handshake: {:?}",
                        frame
                    )));
                }
                Ok(_) => {}
                Err(e) => return Err(ChainEventError::Connection(e.to_string())),
            }
        }

        Err(ChainEventError::Connection(
            "stream ended during subscription handshake".to_string(),
        ))
    }

    /// Message loop with reconnection. Runs until the receiver is dropped
    /// or a fatal error occurs on reconnect.
    async fn run_loop(
        mut ws: WsStream,
        ws_url: String,
        program_id: String,
        commitment: String,
        tx: mpsc::Sender<ParsedTxEvent>,
    ) {
        let mut backoff = RECONNECT_BASE;

        loop {
            while let Some(msg) = ws.next().await {
                match msg {
                    Ok(Message::Text(text)) => match parse_notification(&text) {
                        Ok(Some(event)) => {
                            backoff = RECONNECT_BASE;
                            if tx.send(event).await.is_err() {
                                debug!("event receiver dropped, stopping listener");
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            debug!(error = %e, "skipping unparseable message");
                        }
                    },
                    Ok(Message::Ping(payload)) => {
                        if let Err(e) = ws.send(Message::Pong(payload)).await {
                            warn!(error = %e, "failed to answer ping");
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        warn!(frame = ?frame, "server closed the stream");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "websocket read error");
                        break;
                    }
                }
            }

            // Connection lost; retry with backoff until the consumer goes
            // away or the endpoint starts refusing us outright.
            loop {
                if tx.is_closed() {
                    return;
                }

                warn!(delay = ?backoff, "reconnecting transaction stream");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_MAX);

                match Self::connect_and_subscribe(&ws_url, &program_id, &commitment).await {
                    Ok(stream) => {
                        ws = stream;
                        break;
                    }
                    Err(e) if e.is_fatal() => {
                        error!(error = %e, "giving up on transaction stream");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "reconnect attempt failed");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ChainEventSource for RaydiumListener {
    async fn subscribe(
        &self,
        program_id: &str,
    ) -> Result<mpsc::Receiver<ParsedTxEvent>, ChainEventError> {
        // The first connection happens inline so bad credentials or a
        // refused subscription fail startup instead of spinning forever.
        let ws =
            Self::connect_and_subscribe(&self.ws_url, program_id, &self.commitment).await?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        tokio::spawn(Self::run_loop(
            ws,
            self.ws_url.clone(),
            program_id.to_string(),
            self.commitment.clone(),
            tx,
        ));

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_401_is_authentication() {
        let response = tungstenite::http::Response::builder()
            .status(401)
            .body(None)
            .unwrap();
        let err = RaydiumListener::classify_connect_error(tungstenite::Error::Http(response));
        assert!(matches!(err, ChainEventError::Authentication(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_network_error_is_connection() {
        let err = RaydiumListener::classify_connect_error(tungstenite::Error::ConnectionClosed);
        assert!(matches!(err, ChainEventError::Connection(_)));
        assert!(!err.is_fatal());
    }
}
