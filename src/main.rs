use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use netsim_emu::{Emulator, EmulatorConfig, ImpairmentConfig, DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_PORT, DEFAULT_SEED};

#[derive(Parser, Debug)]
#[command(name = "netsim-emu", version, about = "UDP unreliable channel emulator")]
struct Cli {
    /// UDP port to listen on
    #[arg(long, env = "RELIABLE_EMU_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Local address to bind to
    #[arg(long = "bind-ip", default_value = "0.0.0.0")]
    bind_ip: IpAddr,
    /// Probability of dropping each packet, in [0, 1]
    #[arg(long, default_value_t = 0.0)]
    loss: f64,
    /// One-way delay in milliseconds
    #[arg(long = "delay_ms", visible_alias = "delay-ms", default_value_t = 0.0)]
    delay_ms: f64,
    /// Probability of holding a packet back for two extra delays, in [0, 1]
    #[arg(long, default_value_t = 0.0)]
    reorder: f64,
    /// Link rate limit in kbps, 0 means unlimited
    #[arg(long = "rate_kbps", visible_alias = "rate-kbps", default_value_t = 0.0)]
    rate_kbps: f64,
    /// Seed for the loss and reorder decisions
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Largest datagram read in one go, longer ones are truncated
    #[arg(long = "max-datagram-size", default_value_t = DEFAULT_MAX_DATAGRAM_SIZE)]
    max_datagram_size: usize,
}

impl Cli {
    fn into_config(self) -> EmulatorConfig {
        EmulatorConfig {
            bind_addr: SocketAddr::new(self.bind_ip, self.port),
            impairment: ImpairmentConfig {
                loss: self.loss,
                delay_ms: self.delay_ms,
                reorder: self.reorder,
                rate_kbps: self.rate_kbps,
            },
            seed: self.seed,
            max_datagram_size: self.max_datagram_size,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config();
    let runtime = {
        tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
    };
    runtime.block_on(run(config))
}

async fn run(config: EmulatorConfig) -> Result<()> {
    let emulator = Emulator::bind(config).await.context("failed to start emulator")?;
    let stats = emulator.stats();
    tokio::select! {
        res = emulator.run() => {
            let err = match res {
                Ok(never) => match never {},
                Err(err) => err,
            };
            info!("stopping after socket error: {}", stats.snapshot());
            Err(err).context("emulator socket failed")
        },
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            info!("shutting down: {}", stats.snapshot());
            Ok(())
        },
    }
}
