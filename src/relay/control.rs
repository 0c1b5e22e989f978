//! Start-up handshake with the video source.

use log::{debug, info, warn};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Sent in order once at start-up; the first enters SDK mode, the second
/// starts the video stream.
pub const HANDSHAKE_COMMANDS: [&str; 2] = ["command", "streamon"];

/// Fire-and-forget control channel to the video source.
#[derive(Debug)]
pub struct ControlChannel {
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
}

impl ControlChannel {
    /// Opens an ephemeral UDP socket connected to the source.
    pub async fn connect(remote: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        Ok(Self {
            socket: Arc::new(socket),
            remote,
        })
    }

    /// Sends the start-up commands. Replies are not awaited.
    pub async fn send_handshake(&self) -> Result<()> {
        for command in HANDSHAKE_COMMANDS {
            self.socket.send(command.as_bytes()).await?;
            debug!("sent {:?} to {}", command, self.remote);
        }
        info!("stream handshake sent to {}", self.remote);
        Ok(())
    }

    /// Logs whatever the source answers until the task is aborted or the
    /// socket fails.
    pub fn spawn_response_logger(&self) -> JoinHandle<()> {
        let socket = self.socket.clone();
        let remote = self.remote;
        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];
            loop {
                match socket.recv(&mut buffer).await {
                    Ok(len) => debug!(
                        "control response from {}: {}",
                        remote,
                        String::from_utf8_lossy(&buffer[..len])
                    ),
                    Err(e) => {
                        warn!("control channel error: {}", e);
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_handshake_order() {
        let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let channel = ControlChannel::connect(source.local_addr().unwrap())
            .await
            .unwrap();
        channel.send_handshake().await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = source.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"command");
        let (len, _) = source.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"streamon");
    }
}
