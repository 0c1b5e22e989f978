use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{RelayError, Result};

/// Full datagram size sent by a Tello EDU camera.
pub const TELLO_IN_PACKET_SIZE: usize = 1460;

/// Full datagram size produced by `ffmpeg -f rawvideo udp://...`.
pub const FFMPEG_IN_PACKET_SIZE: usize = 1472;

/// Largest NAL body slice carried by a single RTP packet.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1440;

/// Dynamic payload type used for H.264.
pub const DEFAULT_PAYLOAD_TYPE: u8 = 96;

/// Searched in order; the first existing file wins.
pub const CONFIG_PATHS: [&str; 2] = ["./h264relay.toml", "./config.toml"];

/// Keys a config file may set; absent keys leave the current value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    listen_addr: Option<SocketAddr>,
    control_addr: Option<SocketAddr>,
    rtp_dest_addr: Option<SocketAddr>,
    in_packet_size: Option<usize>,
    max_payload_size: Option<usize>,
    payload_type: Option<u8>,
    queue_high_watermark: Option<usize>,
    send_handshake: Option<bool>,
    run_duration_secs: Option<u64>,
}

/// Runtime settings of the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Local address the raw H.264 datagrams arrive on
    pub listen_addr: SocketAddr,
    /// Video source address receiving the start-up handshake
    pub control_addr: SocketAddr,
    /// Where RTP packets are sent
    pub rtp_dest_addr: SocketAddr,
    /// Size of every non-final datagram of an access unit
    pub in_packet_size: usize,
    /// Largest NAL body slice per RTP packet
    pub max_payload_size: usize,
    /// RTP payload type, 7 bits
    pub payload_type: u8,
    /// Queue depth that triggers a backlog warning
    pub queue_high_watermark: usize,
    /// Send `command` / `streamon` to `control_addr` on start-up
    pub send_handshake: bool,
    /// Zero runs until interrupted
    pub run_duration_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 11111)),
            control_addr: SocketAddr::from(([192, 168, 10, 1], 8889)),
            rtp_dest_addr: SocketAddr::from(([127, 0, 0, 1], 6004)),
            in_packet_size: TELLO_IN_PACKET_SIZE,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            payload_type: DEFAULT_PAYLOAD_TYPE,
            queue_high_watermark: 4096,
            send_handshake: true,
            run_duration_secs: 3600,
        }
    }
}

impl Config {
    /// Builds a configuration from defaults, then the first config file found,
    /// then `H264RELAY_*` environment variables.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        for path in &CONFIG_PATHS {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                config.apply_file(&content)?;
                break;
            }
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays the keys present in a TOML document. Unknown keys are ignored.
    pub fn apply_file(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| RelayError::Config(format!("invalid config file: {}", e)))?;

        if let Some(addr) = file.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(addr) = file.control_addr {
            self.control_addr = addr;
        }
        if let Some(addr) = file.rtp_dest_addr {
            self.rtp_dest_addr = addr;
        }
        if let Some(size) = file.in_packet_size {
            self.in_packet_size = size;
        }
        if let Some(size) = file.max_payload_size {
            self.max_payload_size = size;
        }
        if let Some(pt) = file.payload_type {
            self.payload_type = pt;
        }
        if let Some(mark) = file.queue_high_watermark {
            self.queue_high_watermark = mark;
        }
        if let Some(enabled) = file.send_handshake {
            self.send_handshake = enabled;
        }
        if let Some(secs) = file.run_duration_secs {
            self.run_duration_secs = secs;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        for key in [
            "listen_addr",
            "control_addr",
            "rtp_dest_addr",
            "in_packet_size",
            "max_payload_size",
            "payload_type",
            "queue_high_watermark",
            "send_handshake",
            "run_duration_secs",
        ] {
            let var = format!("H264RELAY_{}", key.to_uppercase());
            if let Ok(value) = env::var(&var) {
                self.set(key, value.trim())?;
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "listen_addr" => self.listen_addr = value.parse()?,
            "control_addr" => self.control_addr = value.parse()?,
            "rtp_dest_addr" => self.rtp_dest_addr = value.parse()?,
            "in_packet_size" => self.in_packet_size = value.parse()?,
            "max_payload_size" => self.max_payload_size = value.parse()?,
            "payload_type" => self.payload_type = value.parse()?,
            "queue_high_watermark" => self.queue_high_watermark = value.parse()?,
            "send_handshake" => {
                self.send_handshake = match value {
                    "true" | "1" | "yes" | "on" => true,
                    "false" | "0" | "no" | "off" => false,
                    other => {
                        return Err(RelayError::Config(format!(
                            "send_handshake expects a boolean, got {:?}",
                            other
                        )))
                    }
                }
            }
            "run_duration_secs" => self.run_duration_secs = value.parse()?,
            _ => log::debug!("ignoring unknown config key {}", key),
        }
        Ok(())
    }

    /// Rejects settings the packetizer cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.in_packet_size == 0 {
            return Err(RelayError::Config("in_packet_size must be non-zero".into()));
        }
        if self.max_payload_size == 0 {
            return Err(RelayError::Config("max_payload_size must be non-zero".into()));
        }
        if self.payload_type > 0x7f {
            return Err(RelayError::Config(format!(
                "payload_type {} does not fit in 7 bits",
                self.payload_type
            )));
        }
        Ok(())
    }

    /// How long to relay before stopping on its own, if at all.
    pub fn run_duration(&self) -> Option<Duration> {
        (self.run_duration_secs > 0).then(|| Duration::from_secs(self.run_duration_secs))
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        fs::write(path, CONFIG_TEMPLATE)?;
    }
    Ok(())
}

pub(crate) const CONFIG_TEMPLATE: &str = include_str!("config_template.toml");
