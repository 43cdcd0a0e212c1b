use args::Cli;
use clap::Parser;
use remap::remap_jar;
use tracing::info;
use tracing_subscriber::fmt;

mod args;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let format = fmt::format()
        .with_ansi(true)
        .without_time()
        .with_level(true)
        .with_target(false)
        .with_thread_names(false)
        .with_source_location(false)
        .compact();

    tracing_subscriber::fmt()
        .with_max_level(args.level())
        .event_format(format)
        .with_writer(std::io::stderr)
        .init();

    let report = remap_jar(&args.config())?;
    info!(
        "Done: {} entries, {} classes moved",
        report.entries(),
        report.renamed.len()
    );

    Ok(())
}
