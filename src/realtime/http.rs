//! Realtime events streamed over HTTP as newline-delimited JSON.

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::{InvalidationSignal, RealtimeChannel, RealtimeEvent, Subscription};
use crate::auth::AuthContext;
use crate::errors::{SyncError, SyncResult};

const SIGNAL_BUFFER: usize = 64;

/// Joins rooms at `GET <base>/rooms/<room>/events`.
#[derive(Debug, Clone)]
pub struct HttpEventChannel {
    client: Client,
    base_url: String,
    auth: AuthContext,
    reconnect_delay: Duration,
}

impl HttpEventChannel {
    pub fn new(client: Client, base_url: &str, auth: AuthContext) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            reconnect_delay: Duration::from_secs(3),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    fn room_url(&self, room: &str) -> String {
        format!("{}/rooms/{}/events", self.base_url, room)
    }
}

impl RealtimeChannel for HttpEventChannel {
    fn subscribe(&self, room: &str) -> SyncResult<Subscription> {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);

        tokio::spawn(run_room(self.clone(), room.to_string(), tx, token.clone()));

        Ok(Subscription::new(
            room,
            ReceiverStream::new(rx),
            Some(token.drop_guard()),
        ))
    }
}

/// Keep the room stream open until the subscription goes away.
async fn run_room(
    channel: HttpEventChannel,
    room: String,
    tx: mpsc::Sender<InvalidationSignal>,
    token: CancellationToken,
) {
    tracing::info!("Joining realtime room {}", room);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            result = read_room(&channel, &room, &tx) => match result {
                Ok(()) => tracing::info!("Realtime stream for {} ended", room),
                Err(e) => tracing::warn!("Realtime stream for {} failed: {}", room, e),
            },
        }

        if tx.is_closed() {
            break;
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(channel.reconnect_delay) => {
                tracing::debug!("Reconnecting to realtime room {}", room);
            }
        }
    }
    tracing::info!("Left realtime room {}", room);
}

async fn read_room(
    channel: &HttpEventChannel,
    room: &str,
    tx: &mpsc::Sender<InvalidationSignal>,
) -> SyncResult<()> {
    let request = channel.client.get(channel.room_url(room));
    let response = channel.auth.apply(request).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::from_status(status, None));
    }

    let mut body = response.bytes_stream();
    let mut decoder = LineDecoder::default();
    while let Some(chunk) = body.next().await {
        for line in decoder.push(&chunk?) {
            let Some(signal) = parse_line(&line) else {
                continue;
            };
            if tx.send(signal).await.is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Parse one event line. SSE-style `data:` prefixes and comments are tolerated.
pub(crate) fn parse_line(line: &str) -> Option<InvalidationSignal> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = line.strip_prefix("data:").unwrap_or(line).trim();
    match serde_json::from_str::<RealtimeEvent>(payload) {
        Ok(event) => InvalidationSignal::from_event(&event),
        Err(e) => {
            tracing::warn!("Skipping undecodable realtime line: {}", e);
            None
        }
    }
}

/// Splits a byte stream into complete lines.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ChangeAction;

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(br#"{"event":"jobs-cre"#).is_empty());
        let lines = decoder.push(b"ated\"}\n\n{\"event\":\"jobs-deleted\"}\n{\"ev");
        assert_eq!(
            lines,
            vec![
                r#"{"event":"jobs-created"}"#.to_string(),
                r#"{"event":"jobs-deleted"}"#.to_string(),
            ]
        );
        assert_eq!(decoder.push(b"ent\":\"x\"}\n").len(), 1);
    }

    #[test]
    fn test_parse_line() {
        let signal = parse_line(r#"data: {"event":"team-updated","data":{"id":"t1"}}"#).unwrap();
        assert_eq!(signal.collection, "team");
        assert_eq!(signal.action, Some(ChangeAction::Updated));

        assert!(parse_line(": keepalive").is_none());
        assert!(parse_line("not json").is_none());
        assert!(parse_line(r#"{"event":"ping"}"#).is_none());
    }

    #[test]
    fn test_room_url() {
        let channel = HttpEventChannel::new(
            Client::new(),
            "http://push.local/",
            AuthContext::anonymous(),
        );
        assert_eq!(
            channel.room_url("jobs-room"),
            "http://push.local/rooms/jobs-room/events"
        );
    }
}
