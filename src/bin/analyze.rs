use anyhow::{Result, anyhow, bail};
use tracing_subscriber::EnvFilter;

use cricket_analyst::CricketAnalyst;
use cricket_analyst::config::Config;

const USAGE: &str = "usage: analyze report <profile-url-or-name> | analyze compare <player-name>";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let subject = args.collect::<Vec<_>>().join(" ");
    if subject.trim().is_empty() {
        bail!(USAGE);
    }

    let config = Config::load();
    let analyst = CricketAnalyst::new(&config)?;

    let output = match command.as_str() {
        "report" => {
            let report = analyst
                .synthesize_report(&subject)
                .await
                .map_err(|e| anyhow!("{} ({e})", e.report_message()))?;
            serde_json::to_string_pretty(&report)?
        }
        "compare" => {
            let record = analyst
                .synthesize_comparison(&subject)
                .await
                .map_err(|e| anyhow!("{} ({e})", e.comparison_message()))?;
            serde_json::to_string_pretty(&record)?
        }
        other => bail!("unknown command '{other}'\n{USAGE}"),
    };

    println!("{output}");
    Ok(())
}
