//! Delivery of assembled chunks to the speech pipeline.

use std::path::PathBuf;

use anyhow::Context;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::config::ForwardConfig;

#[derive(Serialize)]
struct AudioParams {
    format: &'static str,
    sample_rate: u32,
    channels: u8,
}

// First message on every connection, tells the pipeline what follows.
#[derive(Serialize)]
struct HelloMessage<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    version: u8,
    session_id: &'a str,
    contact_id: &'a str,
    track: &'a str,
    audio_params: AudioParams,
}

/// Streams chunks to a websocket endpoint, reconnecting with exponential
/// backoff. A chunk in flight when the connection drops is resent after the
/// reconnect.
pub struct NetLink {
    url: Url,
    config: ForwardConfig,
    contact_id: String,
    track: String,
    session_id: String,
    rx: mpsc::Receiver<Bytes>,
    pending: Option<Bytes>,
}

impl NetLink {
    pub fn new(
        config: ForwardConfig,
        contact_id: impl Into<String>,
        track: impl Into<String>,
        rx: mpsc::Receiver<Bytes>,
    ) -> anyhow::Result<Self> {
        let ws_url = config
            .ws_url
            .as_deref()
            .context("Forwarding over websocket needs forward.ws_url")?;
        let url = Url::parse(ws_url).with_context(|| format!("Invalid ws_url {}", ws_url))?;

        Ok(Self {
            url,
            config,
            contact_id: contact_id.into(),
            track: track.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            rx,
            pending: None,
        })
    }

    /// Forward until the chunk channel closes.
    ///
    /// Gives up on a failed connection once the channel is closed and drained,
    /// since there is nothing left to deliver.
    pub async fn run(mut self) {
        let mut retry_delay = 1;
        loop {
            match self.connect_and_loop().await {
                Ok(()) => break,
                Err(e) if self.is_drained() => {
                    log::warn!("Forwarder connection error: {:#}. No chunks left, giving up", e);
                    break;
                }
                Err(e) => {
                    log::warn!("Forwarder connection error: {:#}. Retrying in {}s...", e, retry_delay);
                    tokio::time::sleep(tokio::time::Duration::from_secs(retry_delay)).await;
                    retry_delay = std::cmp::min(retry_delay * 2, 60);
                }
            }
        }
        log::info!("Forwarder finished for session {}", self.session_id);
    }

    fn is_drained(&self) -> bool {
        self.pending.is_none() && self.rx.is_closed() && self.rx.is_empty()
    }

    async fn connect_and_loop(&mut self) -> anyhow::Result<()> {
        let url = &self.url;
        let host = url.host_str().context("ws_url has no host")?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let request = tokio_tungstenite::tungstenite::http::Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header("Host", host)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header(
                "Sec-WebSocket-Key",
                tokio_tungstenite::tungstenite::handshake::client::generate_key(),
            )
            .header("Authorization", format!("Bearer {}", self.config.ws_token))
            .header("Contact-Id", &self.contact_id)
            .header("Track", &self.track)
            .body(())?;

        log::info!("Connecting to {}...", url);
        let (ws_stream, _) = connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        let hello = HelloMessage {
            msg_type: "hello",
            version: 1,
            session_id: &self.session_id,
            contact_id: &self.contact_id,
            track: &self.track,
            audio_params: AudioParams {
                format: "pcm_s16le",
                sample_rate: self.config.sample_rate,
                channels: self.config.channels,
            },
        };
        write
            .send(Message::Text(serde_json::to_string(&hello)?.into()))
            .await?;
        log::info!("Forwarder connected, session {}", self.session_id);

        if let Some(chunk) = self.pending.clone() {
            write.send(Message::Binary(chunk)).await?;
            self.pending = None;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => log::info!("Pipeline: {}", text.as_str()),
                        Some(Ok(Message::Close(frame))) => {
                            log::info!("Pipeline closed connection: {:?}", frame);
                            anyhow::bail!("Connection closed");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => anyhow::bail!("Connection closed"),
                    }
                }
                chunk = self.rx.recv() => {
                    match chunk {
                        Some(chunk) => {
                            self.pending = Some(chunk.clone());
                            write.send(Message::Binary(chunk)).await?;
                            self.pending = None;
                        }
                        None => {
                            write.send(Message::Text(r#"{"type":"end"}"#.to_string().into())).await?;
                            write.close().await?;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

/// Appends every chunk to a raw PCM file until the channel closes.
pub struct FileSink {
    path: PathBuf,
    rx: mpsc::Receiver<Bytes>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, rx: mpsc::Receiver<Bytes>) -> Self {
        Self {
            path: path.into(),
            rx,
        }
    }

    /// Returns the number of bytes written.
    pub async fn run(mut self) -> anyhow::Result<u64> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut written = 0u64;
        while let Some(chunk) = self.rx.recv().await {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        log::info!("Wrote {} bytes to {}", written, self.path.display());
        Ok(written)
    }
}
