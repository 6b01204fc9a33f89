use anyhow::{Context, bail};
use asic_telemetry::data::device::{MinerFirmware, MinerModel};
use asic_telemetry::{ClientSettings, DataField, get_miner, logging};
use clap::Parser;
use std::net::IpAddr;
use tracing::info;

/// Poll one miner and print what it reports.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// IP address of the miner
    ip: IpAddr,
    /// Hardware model, e.g. "M32 V10" or "Gamma"
    #[arg(long)]
    model: MinerModel,
    /// Firmware running on the miner
    #[arg(long, default_value = "stock")]
    firmware: MinerFirmware,
    /// Only collect these fields (repeatable); collects everything when omitted
    #[arg(long = "field")]
    fields: Vec<DataField>,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,
    /// Extra attempts after a failed request
    #[arg(long, default_value_t = 1)]
    retries: u32,
    /// Web password for firmware that requires one on commands
    #[arg(long, env = "ASIC_WEB_PASSWORD")]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_stdout();
    let args = Args::parse();

    let defaults = ClientSettings::default();
    let settings = ClientSettings {
        timeout_secs: args.timeout,
        retries: args.retries,
        epic_password: args.password.unwrap_or(defaults.epic_password),
    };

    let Some(miner) = get_miner(args.ip, args.model, args.firmware, &settings)
        .context("failed to set up miner client")?
    else {
        bail!("no backend for {} running {} firmware", args.model, args.firmware);
    };
    info!(ip = %args.ip, model = %args.model, "polling miner");

    if args.fields.is_empty() {
        println!("{:#?}", miner.get_data().await);
    } else {
        let snapshot = miner.collect(&args.fields).await;
        for field in &args.fields {
            match snapshot.outcome(*field) {
                Some(Ok(value)) => println!("{field}: {value:?}"),
                Some(Err(e)) => println!("{field}: absent ({e})"),
                None => println!("{field}: not supported by this miner"),
            }
        }
    }

    Ok(())
}
