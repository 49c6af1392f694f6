mod cli;
mod config;
mod network;
mod output;
mod probe;
mod scanner;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use rand::seq::SliceRandom;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::Config;
use crate::output::OutputWriter;
use crate::scanner::{check_candidate_count, ConnectSweep, Scanner, StaticTargets, TargetListFile, TargetSource};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    config.validate()?;

    if cli.save_config {
        let path = config.save(cli.config.as_deref())?;
        info!(path = %path.display(), "configuration saved");
    }

    if !config.output.color_enabled {
        colored::control::set_override(false);
    }

    let (target_spec, source) = target_source(&cli, &config)?;
    info!(source = source.name(), "collecting targets");
    let mut targets = source.targets().await?;

    if cli.randomize {
        targets.shuffle(&mut rand::thread_rng());
    }

    let scanner = Scanner::new(config.settings(), config.scanning.parallelism, !cli.no_progress);
    let result = scanner
        .sweep(&target_spec, &targets, &config.scanning.paths)
        .await?;

    let writer = OutputWriter::new(
        config.output_format()?,
        cli.output_file.clone(),
        config.output.highlight_marker.clone(),
    )?;
    writer.write(&result)?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "ssescan=debug" } else { "ssescan=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn target_source(cli: &Cli, config: &Config) -> Result<(String, Box<dyn TargetSource>)> {
    if let Some(path) = &cli.input_list {
        return Ok((path.display().to_string(), Box::new(TargetListFile::new(path))));
    }

    let target_spec = cli.target.join(",");
    let hosts = network::parse_targets(&target_spec)
        .with_context(|| format!("invalid target specification '{}'", target_spec))?;
    let ports = utils::parse_ports(&cli.ports.join(","))?;
    let candidates = check_candidate_count(hosts.len(), ports.len())?;
    info!(hosts = hosts.len(), ports = ports.len(), candidates, "target expression expanded");

    let source: Box<dyn TargetSource> = if config.scanning.discovery {
        Box::new(ConnectSweep::new(
            hosts,
            ports,
            config.settings().connect_timeout,
            config.scanning.parallelism,
        ))
    } else {
        Box::new(StaticTargets::new(hosts, ports))
    };

    Ok((target_spec, source))
}
