mod discovery;
mod results;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use tracing::{debug, info};

use crate::config::ScanSettings;
use crate::probe::{self, ProbeOutcome};
use results::MissSummary;
pub use discovery::{check_candidate_count, ConnectSweep, StaticTargets, TargetListFile, TargetSource};
pub use results::{type_matches, SweepResult};

/// Runs one probe per (target, path) pair with bounded concurrency.
pub struct Scanner {
    settings: ScanSettings,
    parallelism: usize,
    show_progress: bool,
}

impl Scanner {
    pub fn new(settings: ScanSettings, parallelism: usize, show_progress: bool) -> Self {
        Self {
            settings,
            parallelism: parallelism.max(1),
            show_progress,
        }
    }

    /// Probes are spawned lazily: at most `parallelism` tasks exist at any time,
    /// and results come back in (target, path) order.
    pub async fn sweep(
        &self,
        target_spec: &str,
        targets: &[SocketAddr],
        paths: &[String],
    ) -> Result<SweepResult> {
        let total_probes = targets.len() * paths.len();
        let pb = self.progress_bar(total_probes as u64)?;

        let start_time = chrono::Utc::now();
        info!(targets = targets.len(), probes = total_probes, parallelism = self.parallelism, "starting sweep");

        let candidates = targets
            .iter()
            .flat_map(|target| paths.iter().map(move |path| (*target, path.clone())));

        let mut outcomes = stream::iter(candidates)
            .map(|(target, path)| {
                let config = self
                    .settings
                    .probe_config(target.ip().to_string(), target.port(), path);
                tokio::spawn(async move { probe::probe(&config).await })
            })
            .buffered(self.parallelism);

        let mut findings = Vec::new();
        let mut misses = MissSummary::default();

        while let Some(outcome) = outcomes.next().await {
            match outcome? {
                ProbeOutcome::Found(finding) => {
                    info!(
                        target_addr = %finding.authority(),
                        path = %finding.path,
                        events = finding.events.len(),
                        "SSE endpoint found"
                    );
                    pb.set_message(format!("found {}{}", finding.authority(), finding.path));
                    findings.push(finding);
                }
                ProbeOutcome::Miss(miss) => {
                    debug!(kind = %miss.kind(), reason = %miss, "probe miss");
                    misses.record(miss.kind());
                }
            }
            pb.inc(1);
        }

        pb.finish_with_message("sweep complete");
        let end_time = chrono::Utc::now();

        debug!(
            transport = misses.transport,
            parse_ambiguity = misses.parse_ambiguity,
            not_sse = misses.not_sse,
            "miss breakdown"
        );
        info!(findings = findings.len(), misses = misses.total(), "sweep finished");

        Ok(SweepResult {
            target_spec: target_spec.to_string(),
            paths: paths.to_vec(),
            start_time,
            end_time,
            total_targets: targets.len(),
            total_probes,
            findings,
            misses: misses.total(),
        })
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} probes ({eta}) {msg}")?
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
        Ok(pb)
    }
}
