use super::autopilot_messages::{Downlink, DownlinkContent, Uplink, UplinkContent};
use super::bridge::BridgeError;
use crate::info;
use prost::Message;
use regex::Regex;
use std::sync::LazyLock;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Upper bound for a single frame body; anything larger means the stream is out of sync.
pub(crate) const MAX_FRAME_LEN: usize = 64 * 1024;

static TCP_CONNECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tcp:(?<host>[^:\s]+):(?<port>\d{1,5})$").unwrap());

/// Opens the byte stream the autopilot link runs over.
#[async_trait::async_trait]
pub trait LinkConnector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn open(&self) -> Result<Self::Stream, BridgeError>;

    /// Human readable endpoint for log lines.
    fn describe(&self) -> String;
}

/// Connector for `tcp:<host>:<port>` connection strings (SITL or a telemetry radio bridge).
pub struct TcpConnector {
    host: String,
    port: u16,
    baud_rate: u32,
}

impl TcpConnector {
    pub fn parse(connection: &str, baud_rate: u32) -> Result<Self, BridgeError> {
        let caps = TCP_CONNECTION
            .captures(connection.trim())
            .ok_or_else(|| BridgeError::UnsupportedTransport(connection.to_string()))?;
        let port = caps["port"]
            .parse::<u16>()
            .map_err(|_| BridgeError::UnsupportedTransport(connection.to_string()))?;
        Ok(Self { host: caps["host"].to_string(), port, baud_rate })
    }
}

#[async_trait::async_trait]
impl LinkConnector for TcpConnector {
    type Stream = TcpStream;

    async fn open(&self) -> Result<TcpStream, BridgeError> {
        info!(
            "Opening autopilot link to {}:{} (baud {} ignored for tcp)",
            self.host, self.port, self.baud_rate
        );
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn describe(&self) -> String { format!("tcp:{}:{}", self.host, self.port) }
}

/// Framed protobuf link: every frame is a big-endian `u32` length followed by the message body.
pub struct AutopilotLink<S> {
    stream: S,
    read_buf: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> AutopilotLink<S> {
    pub fn new(stream: S) -> Self { Self { stream, read_buf: Vec::with_capacity(512) } }

    pub async fn send(&mut self, content: UplinkContent) -> Result<(), BridgeError> {
        let body = Uplink { content: Some(content) }.encode_to_vec();
        write_frame(&mut self.stream, &body).await
    }

    /// Receives the next downlink message.
    ///
    /// Cancel safe: partially read frames stay buffered, so dropping this future
    /// inside a `timeout` never desynchronizes the stream. Frames without content
    /// are skipped.
    pub async fn recv(&mut self) -> Result<DownlinkContent, BridgeError> {
        loop {
            if let Some(body) = self.take_frame()? {
                if let Some(content) = Downlink::decode(body.as_slice())?.content {
                    return Ok(content);
                }
                continue;
            }
            let read = self.stream.read_buf(&mut self.read_buf).await?;
            if read == 0 {
                return Err(BridgeError::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), BridgeError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    fn take_frame(&mut self) -> Result<Option<Vec<u8>>, BridgeError> {
        let Some(header) = self.read_buf.first_chunk::<4>() else {
            return Ok(None);
        };
        let len = u32::from_be_bytes(*header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(BridgeError::FrameTooLarge(len));
        }
        if self.read_buf.len() < 4 + len {
            return Ok(None);
        }
        let body = self.read_buf[4..4 + len].to_vec();
        self.read_buf.drain(..4 + len);
        Ok(Some(body))
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), BridgeError>
where W: AsyncWrite + Unpin {
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(body);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one whole frame body. Not cancel safe; used by the simulated autopilot in tests.
#[cfg(test)]
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, BridgeError>
where R: AsyncRead + Unpin {
    let length = reader.read_u32().await? as usize;
    if length > MAX_FRAME_LEN {
        return Err(BridgeError::FrameTooLarge(length));
    }
    let mut buffer = vec![0u8; length];
    reader.read_exact(&mut buffer).await?;
    Ok(buffer)
}
