use std::io::Write;
use std::sync::Once;

use chrono::{SecondsFormat, Utc};

static INIT: Once = Once::new();

/// Installs the global `env_logger` once.
///
/// The level defaults to `info` and follows `RUST_LOG` when set, e.g.
/// `RUST_LOG=h264relay=debug` to see every RTP header as it is built.
/// Calling it again is a no-op.
pub fn init() {
    INIT.call_once(|| {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {} {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                record.level(),
                record.target(),
                record.args()
            )
        });

        // Another logger may already be installed by an embedding application.
        let _ = builder.try_init();
    });
}
