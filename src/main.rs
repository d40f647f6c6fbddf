use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use chanlog::{diagnostics, panic_hook, Pipeline, PipelineConfig};

mod cli;

use cli::{Args, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    // Diagnostics go to stderr so they never mix with the console mirror
    diagnostics::init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path),
        None => PipelineConfig::load_default(),
    }
    .context("Failed to load config")?;
    if let Some(dir) = &args.logs_dir {
        config.logs_dir = Some(dir.clone());
    }
    if args.echo {
        config.console_mirror = true;
    }

    let pipeline = Arc::new(Pipeline::new(config));
    panic_hook::install(&pipeline);
    pipeline
        .initialize()
        .context("Failed to start logging pipeline")?;

    let logger = pipeline.logger();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => logger.log(args.level, args.category, line),
                Ok(None) => break,
                Err(e) => {
                    let err = anyhow::Error::new(e).context("Failed to read stdin");
                    logger.error_chain(args.category, &err);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    let report = tokio::task::spawn_blocking({
        let pipeline = Arc::clone(&pipeline);
        move || pipeline.shutdown()
    })
    .await
    .context("Shutdown task failed")?;
    let stats = pipeline.stats();

    eprintln!(
        "chanlog: {} written, {} filtered, {} write failures, {} discarded ({}ms{})",
        stats.written,
        stats.filtered,
        stats.write_failures,
        report.discarded,
        report.elapsed.as_millis(),
        if report.drained { "" } else { ", deadline elapsed" }
    );
    Ok(())
}
