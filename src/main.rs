use std::io::{self, Write};

use nmap_recon::cli::Cli;
use nmap_recon::report::{self, ReportOptions};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ports = cli.port_spec()?;
    let scanner = cli.scanner();

    println!("\nScanning {}...\n", cli.target);

    let results = match scanner.scan(&cli.target, &ports).await {
        Ok(r) => r,
        Err(e) => {
            print!("{}", report::render_failure(&e));
            return Ok(());
        }
    };

    let opts = ReportOptions {
        show_scripts: cli.show_scripts,
    };
    {
        let mut stdout = io::stdout().lock();
        report::write_report(&mut stdout, &results, &opts)?;
        writeln!(stdout)?;
    }

    if let Some(path) = cli.output.as_deref() {
        if let Err(e) = report::write_results_json(path, &results) {
            eprintln!("Failed to write JSON to {}: {e:#}", path.display());
        } else {
            println!("Wrote JSON results to {}", path.display());
        }
    }

    Ok(())
}

/// Logs go to stderr so the report on stdout stays clean.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(tracing_subscriber::filter::LevelFilter::from_level(level)),
        )
        .init();
}
