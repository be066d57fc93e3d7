use anyhow::Result;
use clap::Parser;
use vatio::cli::{Cli, OutputFormat};
use vatio::config::EngineConfig;
use vatio::csv_output::CsvOutput;
use vatio::diagnostics::TracingSink;
use vatio::pipeline::{configured_sinks, flag_internal, run_engine};
use vatio::source::DirectorySource;
use vatio::text_output::render_summary;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; INFO by default, DEBUG with `--verbose`
fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.verbose);

    let base = match &args.config {
        Some(path) => EngineConfig::from_toml(path)?,
        None => EngineConfig::default(),
    };
    let config = args.apply_to(base);

    let source = DirectorySource::new(&config.data_dir);
    let mut sinks = configured_sinks(&config);
    let report = run_engine(&config, &source, &mut sinks, &TracingSink).map_err(flag_internal)?;

    match args.format {
        OutputFormat::Text => print!("{}", render_summary(&report)),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Csv => print!("{}", CsvOutput::new(true).render(report.document())),
        OutputFormat::Quiet => {}
    }

    Ok(())
}
