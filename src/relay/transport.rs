//! UDP sockets on both ends of the relay.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

use super::queue::DispatchReceiver;
use super::session::StreamSession;
use crate::error::Result;

/// Largest datagram the receive loop accepts
pub const RECEIVE_BUFFER_SIZE: usize = 65536;

/// Destination for finished RTP packets.
#[async_trait]
pub trait PacketSink: Send {
    /// Sends one complete RTP packet.
    async fn send(&mut self, packet: &[u8]) -> Result<()>;
}

#[async_trait]
impl<S: PacketSink + ?Sized> PacketSink for &mut S {
    async fn send(&mut self, packet: &[u8]) -> Result<()> {
        (**self).send(packet).await
    }
}

/// Sends packets over a UDP socket connected to one peer.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    /// Binds an ephemeral local port and connects it to `dest`.
    pub async fn connect(dest: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if dest.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(dest).await?;
        debug!("RTP sink {} -> {}", socket.local_addr()?, dest);
        Ok(Self { socket })
    }

    /// Local address packets are sent from.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl PacketSink for UdpSink {
    async fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.socket.send(packet).await?;
        Ok(())
    }
}

/// Sends queued packets in order until every producer is gone.
///
/// Failed sends are logged and skipped. Returns the number of packets sent.
pub async fn transmit_loop<S: PacketSink>(mut queue: DispatchReceiver, mut sink: S) -> u64 {
    let mut sent = 0u64;

    while let Some(packet) = queue.recv().await {
        match sink.send(&packet).await {
            Ok(()) => sent += 1,
            Err(e) => warn!("Failed to send RTP packet ({} bytes): {}", packet.len(), e),
        }
    }

    info!(
        "transmit loop finished: {} packets sent, peak queue depth {}",
        sent,
        queue.peak_depth()
    );
    sent
}

/// Feeds datagrams from `socket` into `session` until a fatal socket error.
///
/// The loop never returns on its own otherwise; stop it by dropping the
/// future (it is cancel safe between datagrams).
pub async fn receive_loop(socket: &UdpSocket, session: &mut StreamSession) -> Result<()> {
    let mut buffer = vec![0u8; RECEIVE_BUFFER_SIZE];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, _addr)) => session.on_datagram(&buffer[..len]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                debug!("Socket interrupted, continuing");
                tokio::task::yield_now().await;
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::ConnectionReset
                ) =>
            {
                warn!("Socket error {}, continuing", e);
                tokio::task::yield_now().await;
            }
            Err(e) => {
                error!("Socket error: {}", e);
                return Err(e.into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::relay::queue::DispatchQueue;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct FlakySink {
        sent: Vec<Vec<u8>>,
        calls: usize,
    }

    #[async_trait]
    impl PacketSink for FlakySink {
        async fn send(&mut self, packet: &[u8]) -> Result<()> {
            self.calls += 1;
            if self.calls == 2 {
                return Err(RelayError::Protocol("link down".into()));
            }
            self.sent.push(packet.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_transmit_loop_skips_failed_sends() {
        let (tx, rx) = DispatchQueue::new(16).split();
        for i in 0..4u8 {
            tx.send(Bytes::from(vec![i])).unwrap();
        }
        drop(tx);

        let mut sink = FlakySink::default();
        let sent = transmit_loop(rx, &mut sink).await;
        assert_eq!(sent, 3);
        assert_eq!(sink.sent, vec![vec![0], vec![2], vec![3]]);
    }

    #[tokio::test]
    async fn test_udp_sink_delivers() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut sink = UdpSink::connect(peer.local_addr().unwrap()).await.unwrap();

        sink.send(&[0x80, 0xE0, 0x00, 0x01]).await.unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[0x80, 0xE0, 0x00, 0x01]);
        assert_eq!(from.port(), sink.local_addr().unwrap().port());
    }
}
