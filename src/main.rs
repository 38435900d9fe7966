use anyhow::Context;
use clap::Parser;
use pastechan::config::{RelayConfig, RelayEncoding};
use pastechan::peer::{IceServerKind, ServerConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Chat over a WebRTC data channel, signaled by copy and paste."
)]
struct Args {
    #[arg(short, long, env = "PASTECHAN_CONFIG", help = "TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long = "ice-server",
        value_name = "URL",
        help = "ICE server URL; replaces configured servers, may be repeated"
    )]
    ice_servers: Vec<String>,

    #[arg(
        long,
        env = "PASTECHAN_ICE_USERNAME",
        help = "Username for TURN servers given with --ice-server"
    )]
    ice_username: Option<String>,

    #[arg(
        long,
        env = "PASTECHAN_ICE_CREDENTIAL",
        hide_env_values = true,
        help = "Credential for TURN servers given with --ice-server"
    )]
    ice_credential: Option<String>,

    #[arg(long, help = "Data channel label")]
    label: Option<String>,

    #[arg(long, help = "Print relay payloads as base64(gzip(json))")]
    compact: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RelayConfig::default(),
        };

        if !self.ice_servers.is_empty() {
            let (username, credential) = (self.ice_username, self.ice_credential);
            config.ice_servers = self
                .ice_servers
                .into_iter()
                .enumerate()
                .map(|(i, url)| {
                    let kind = if url.starts_with("turn") {
                        IceServerKind::Turn
                    } else {
                        IceServerKind::Stun
                    };
                    // учётные данные нужны только TURN
                    let (username, credential) = match kind {
                        IceServerKind::Turn => (username.clone(), credential.clone()),
                        IceServerKind::Stun => (None, None),
                    };
                    ServerConfig {
                        id: format!("cli-{}", i),
                        r#type: kind,
                        url,
                        username,
                        credential,
                    }
                })
                .collect();
        }
        if let Some(label) = self.label {
            config.channel_label = label;
        }
        if self.compact {
            config.encoding = RelayEncoding::Compact;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pastechan::logger::init_logging();
    let config = Args::parse().into_config()?;
    pastechan::commands::terminal::run(config).await?;
    Ok(())
}
