#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use h264relay::config::Config;
    use h264relay::format::rtp::{RTPPacket, FU_A_TYPE};
    use h264relay::relay::{Relay, SessionStats, HANDSHAKE_COMMANDS};
    use pretty_assertions::assert_eq;
    use tokio::net::UdpSocket;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn relay_config(rtp_dest_addr: SocketAddr) -> Config {
        Config {
            listen_addr: loopback(),
            rtp_dest_addr,
            send_handshake: false,
            ..Config::default()
        }
    }

    fn access_unit(nals: &[Vec<u8>]) -> Vec<u8> {
        let mut au = Vec::new();
        for nal in nals {
            au.extend_from_slice(&[0, 0, 0, 1]);
            au.extend_from_slice(nal);
        }
        au
    }

    async fn recv_packet(socket: &UdpSocket) -> RTPPacket {
        let mut buf = vec![0u8; 2048];
        let len = timeout(RECV_TIMEOUT, socket.recv(&mut buf))
            .await
            .expect("timed out waiting for RTP")
            .unwrap();
        RTPPacket::parse(&buf[..len]).unwrap()
    }

    #[tokio::test]
    async fn test_relay_forwards_an_access_unit() {
        let player = UdpSocket::bind(loopback()).await.unwrap();
        let relay = Relay::bind(relay_config(player.local_addr().unwrap()))
            .await
            .unwrap();
        let relay_addr = relay.local_addr().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(relay.run_until(async {
            let _ = stop_rx.await;
        }));

        let sps = vec![0x67, 0x42, 0xC0, 0x1E, 0xD9];
        let mut idr = vec![0x65];
        idr.extend((0..1994).map(|i| (i % 200) as u8 + 1));
        let au = access_unit(&[sps.clone(), idr.clone()]);
        assert_eq!(au.len(), 4 + 5 + 4 + 1995);

        let camera = UdpSocket::bind(loopback()).await.unwrap();
        camera.send_to(&au[..1460], relay_addr).await.unwrap();
        camera.send_to(&au[1460..], relay_addr).await.unwrap();

        let first = recv_packet(&player).await;
        assert_eq!(first.version, 2);
        assert_eq!(first.payload_type, 96);
        assert!(first.marker);
        assert_eq!(first.payload.as_ref(), sps.as_slice());

        let start = recv_packet(&player).await;
        let end = recv_packet(&player).await;
        assert_eq!(start.payload[0] & 0x1F, FU_A_TYPE);
        assert_eq!(start.payload[1], 0x85);
        assert_eq!(end.payload[1], 0x45);
        assert!(!start.marker);
        assert!(end.marker);

        assert_eq!(start.sequence_number, first.sequence_number.wrapping_add(1));
        assert_eq!(end.sequence_number, first.sequence_number.wrapping_add(2));
        assert_eq!(start.ssrc, first.ssrc);
        assert!(first.ssrc <= 0xFF_FFFF);

        let mut rebuilt = vec![(start.payload[0] & 0xE0) | (start.payload[1] & 0x1F)];
        rebuilt.extend_from_slice(&start.payload[2..]);
        rebuilt.extend_from_slice(&end.payload[2..]);
        assert_eq!(rebuilt, idr);

        stop_tx.send(()).unwrap();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.datagrams, 2);
        assert_eq!(stats.access_units, 1);
        assert_eq!(stats.nal_units, 2);
        assert_eq!(stats.packets, 3);
        assert_eq!(stats.dropped_packets, 0);
    }

    #[tokio::test]
    async fn test_relay_sends_handshake_to_control_address() {
        let drone = UdpSocket::bind(loopback()).await.unwrap();
        let player = UdpSocket::bind(loopback()).await.unwrap();

        let config = Config {
            control_addr: drone.local_addr().unwrap(),
            send_handshake: true,
            ..relay_config(player.local_addr().unwrap())
        };
        let relay = Relay::bind(config).await.unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(relay.run_until(async {
            let _ = stop_rx.await;
        }));

        let mut buf = [0u8; 64];
        for expected in HANDSHAKE_COMMANDS {
            let (len, _) = timeout(RECV_TIMEOUT, drone.recv_from(&mut buf))
                .await
                .expect("timed out waiting for handshake")
                .unwrap();
            assert_eq!(&buf[..len], expected.as_bytes());
        }

        stop_tx.send(()).unwrap();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.datagrams, 0);
        assert_eq!(stats.packets, 0);
    }

    #[tokio::test]
    async fn test_relay_stops_without_traffic() {
        let player = UdpSocket::bind(loopback()).await.unwrap();
        let relay = Relay::bind(relay_config(player.local_addr().unwrap()))
            .await
            .unwrap();

        let stats = relay
            .run_until(tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(stats, SessionStats::default());
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = Config {
            max_payload_size: 0,
            ..relay_config(loopback())
        };
        assert!(Relay::bind(config).await.is_err());
    }
}
