use std::path::PathBuf;

use clap::Parser;
use csv::{ReaderBuilder, Trim};
use tokio::sync::mpsc;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use condo_liquidation::{Event, Ledger, Money};

/// The default size of the channel feeding events to the ledger.
const CHANNEL_SIZE: usize = 100;

#[derive(Parser, Debug)]
#[command(version, about = "Liquidates verified condominium payments against pending debts")]
struct Cli {
    /// CSV file of ledger events (type, unit, ref, amount, period, rate)
    input: PathBuf,

    /// Cost of one standard billing period; surplus payments prepay whole periods
    #[arg(long, default_value = "0.00")]
    period_fee: Money,

    /// Write one row per debt instead of one row per unit
    #[arg(long)]
    statement: bool,

    /// Capacity of the event channel
    #[arg(long, default_value_t = CHANNEL_SIZE)]
    channel_size: usize,

    /// Emit logs as JSON
    #[arg(long, env = "CONDO_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if cli.period_fee.is_negative() {
        return Err(format!("period fee must not be negative: {}", cli.period_fee).into());
    }

    let (sender, receiver) = mpsc::channel(cli.channel_size.max(1));
    let mut ledger = Ledger::new(receiver, cli.period_fee);

    let handle = tokio::spawn(async move {
        ledger.run().await;
        ledger
    });

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(&cli.input)?;

    for (row, event) in reader.deserialize::<Event>().enumerate() {
        match event {
            Ok(event) => {
                if let Err(err) = sender.send(event).await {
                    error!(error = %err, "ledger stopped accepting events");
                    break;
                }
            }
            Err(err) => warn!(row = row + 1, error = %err, "skipping malformed event"),
        }
    }

    drop(sender); // Close the sender to signal no more events will be sent
    let ledger = handle.await?;

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for unit in ledger.get_all_units().values() {
        if cli.statement {
            for line in unit.statement() {
                writer.serialize(line)?;
            }
        } else {
            writer.serialize(unit.summary())?;
        }
    }
    writer.flush()?;
    Ok(())
}
