//! # UDP H.264 to RTP Relay
//!
//! Wires the pipeline together:
//!
//! ```text
//! datagram -> FrameReassembler -> split_bitstream -> classify -> H264Packetizer
//!          -> DispatchQueue -> transmit_loop -> UDP
//! ```
//!
//! Two tasks run per stream. The receive side owns the [`StreamSession`] and
//! turns every datagram into queued packets without waiting; the transmit
//! side owns the queue receiver and the socket. Stopping the receive side
//! drops the session, which lets the transmitter drain and exit.
//!
//! ## Example
//!
//! ```rust,no_run
//! use h264relay::config::Config;
//! use h264relay::relay::Relay;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         send_handshake: false,
//!         ..Config::default()
//!     };
//!     let relay = Relay::bind(config).await?;
//!     let stats = relay.run().await?;
//!     println!("relayed {} packets", stats.packets);
//!     Ok(())
//! }
//! ```

use log::{info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

use crate::config::Config;
use crate::error::Result;

pub mod control;
pub mod queue;
pub mod reassembler;
pub mod session;
pub mod transport;

pub use control::{ControlChannel, HANDSHAKE_COMMANDS};
pub use queue::{AlertHook, DispatchQueue, DispatchReceiver, DispatchSender};
pub use reassembler::FrameReassembler;
pub use session::{SessionStats, StreamSession};
pub use transport::{receive_loop, transmit_loop, PacketSink, UdpSink};

/// A bound relay for a single stream.
#[derive(Debug)]
pub struct Relay {
    config: Config,
    socket: UdpSocket,
    sink: UdpSink,
}

impl Relay {
    /// Binds the listening socket and the outgoing RTP socket.
    pub async fn bind(config: Config) -> Result<Self> {
        config.validate()?;
        let socket = UdpSocket::bind(config.listen_addr).await?;
        let sink = UdpSink::connect(config.rtp_dest_addr).await?;
        info!(
            "listening for H.264 on {}, sending RTP to {}",
            socket.local_addr()?,
            config.rtp_dest_addr
        );
        Ok(Self {
            config,
            socket,
            sink,
        })
    }

    /// Address the H.264 datagrams are expected on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Runs until Ctrl-C or until the configured run duration elapses.
    pub async fn run(self) -> Result<SessionStats> {
        let duration = self.config.run_duration();
        self.run_until(shutdown_signal(tokio::signal::ctrl_c(), duration))
            .await
    }

    /// Runs until `shutdown` completes, then drains the queue and returns
    /// the session statistics.
    pub async fn run_until<F>(self, shutdown: F) -> Result<SessionStats>
    where
        F: Future<Output = ()>,
    {
        let Relay {
            config,
            socket,
            sink,
        } = self;

        let (sender, receiver) = DispatchQueue::new(config.queue_high_watermark).split();
        let transmitter = tokio::spawn(transmit_loop(receiver, sink));

        let control = if config.send_handshake {
            match start_control(config.control_addr).await {
                Ok(channel) => Some(channel),
                Err(e) => {
                    warn!("stream handshake with {} failed: {}", config.control_addr, e);
                    None
                }
            }
        } else {
            None
        };
        let response_logger = control.as_ref().map(|c| c.spawn_response_logger());

        let mut session = StreamSession::new(&config, sender);
        let result = tokio::select! {
            result = receive_loop(&socket, &mut session) => result,
            _ = shutdown => Ok(()),
        };

        let stats = session.finish();
        let sent = transmitter.await?;
        if let Some(handle) = response_logger {
            handle.abort();
        }

        info!(
            "stream finished: {} datagrams, {} access units, {} NAL units ({} degenerate), {} packets queued, {} sent",
            stats.datagrams,
            stats.access_units,
            stats.nal_units,
            stats.degenerate_nal_units,
            stats.packets,
            sent
        );

        result.map(|()| stats)
    }
}

/// Completes when `interrupt` fires or `duration` elapses. An interrupt
/// that cannot be registered is logged and never fires.
async fn shutdown_signal<I>(interrupt: I, duration: Option<Duration>)
where
    I: Future<Output = io::Result<()>>,
{
    let interrupted = async {
        match interrupt.await {
            Ok(()) => info!("interrupted"),
            Err(e) => {
                warn!("cannot wait for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    match duration {
        Some(duration) => {
            tokio::select! {
                _ = interrupted => {}
                _ = tokio::time::sleep(duration) => info!("run duration of {:?} elapsed", duration),
            }
        }
        None => interrupted.await,
    }
}

async fn start_control(addr: SocketAddr) -> Result<ControlChannel> {
    let channel = ControlChannel::connect(addr).await?;
    channel.send_handshake().await?;
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Instant};

    fn no_handler() -> impl Future<Output = io::Result<()>> {
        async { Err(io::Error::new(io::ErrorKind::Other, "no signal handler")) }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_interrupt_waits_for_duration() {
        let start = Instant::now();
        shutdown_signal(no_handler(), Some(Duration::from_secs(60))).await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_interrupt_without_duration_keeps_running() {
        let stopped = timeout(Duration::from_secs(3600), shutdown_signal(no_handler(), None)).await;
        assert!(stopped.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_beats_duration() {
        let start = Instant::now();
        shutdown_signal(async { Ok(()) }, Some(Duration::from_secs(60))).await;
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
