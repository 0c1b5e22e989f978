use log::info;

use h264relay::config::{self, Config};
use h264relay::logging;
use h264relay::relay::Relay;

const DEFAULT_CONFIG_PATH: &str = "./h264relay.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    if std::env::args().nth(1).as_deref() == Some("--init-config") {
        config::create_default_config_template(DEFAULT_CONFIG_PATH)?;
        println!("Wrote {}", DEFAULT_CONFIG_PATH);
        return Ok(());
    }

    let config = Config::load()?;
    info!("{:?}", config);

    let relay = Relay::bind(config).await?;
    let stats = relay.run().await?;
    info!("relayed {} RTP packets", stats.packets);

    Ok(())
}
