use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use anyhow::Result;
use colored::*;

use crate::cli::OutputFormat;
use crate::probe::SseFinding;
use crate::scanner::{type_matches, SweepResult};

const BOX_WIDTH: usize = 79;
const CSV_HEADER: &str = "host,port,path,status,content_type,event_type,data";

pub struct OutputWriter {
    format: OutputFormat,
    file: Option<PathBuf>,
    marker: String,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, file: Option<PathBuf>, marker: impl Into<String>) -> Result<Self> {
        Ok(Self {
            format,
            file,
            marker: marker.into(),
        })
    }

    pub fn write(&self, result: &SweepResult) -> Result<()> {
        let output = self.render(result)?;

        match &self.file {
            Some(path) => {
                let file = File::create(path)?;
                let mut writer = BufWriter::new(file);
                writer.write_all(output.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{}", output);
                io::stdout().flush()?;
            }
        }

        Ok(())
    }

    fn render(&self, result: &SweepResult) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_human(result)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(result)? + "\n"),
            OutputFormat::Csv => Ok(format_csv(result)),
        }
    }

    fn format_human(&self, result: &SweepResult) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{}\n", rule('╔', '╗').truecolor(0, 212, 255)));
        output.push_str(&centered("░▒ SSE SWEEP COMPLETE ▒░", (0, 212, 255)));
        output.push_str(&format!("{}\n", rule('╚', '╝').truecolor(0, 212, 255)));

        output.push_str(&format!("\n{} {}\n",
            "⟦TARGET⟧".truecolor(255, 0, 81).bold(),
            result.target_spec.truecolor(255, 255, 255).bold()));
        output.push_str(&format!("{} {}\n",
            "⟦PATHS⟧".truecolor(255, 140, 0).bold(),
            result.paths.join(", ").truecolor(255, 255, 255)));
        output.push_str(&format!("{} {}ms\n",
            "⟦DURATION⟧".truecolor(0, 212, 255).bold(),
            result.duration_ms().to_string().truecolor(255, 255, 255)));
        output.push_str(&format!("{} {} {} {} {}\n\n",
            "⟦SCOPE⟧".truecolor(191, 64, 191).bold(),
            result.total_targets.to_string().truecolor(255, 255, 255),
            "targets,".truecolor(128, 128, 128),
            result.total_probes.to_string().truecolor(255, 255, 255),
            "probes".truecolor(128, 128, 128)));

        for finding in &result.findings {
            output.push_str(&self.format_finding(finding));
        }

        let (border, headline) = if result.findings.is_empty() {
            ((255, 0, 81), "⚠ NO SSE ENDPOINTS DETECTED ⚠")
        } else {
            ((0, 255, 65), "⚡ SSE ENDPOINTS FOUND ⚡")
        };

        output.push_str(&format!("{}\n", rule('╔', '╗').truecolor(border.0, border.1, border.2)));
        output.push_str(&centered(headline, border));
        output.push_str(&centered(
            &format!(
                "Findings: {}  │  Interesting: {}",
                result.findings.len(),
                result.interesting(&self.marker).count()
            ),
            border,
        ));
        output.push_str(&centered(
            &format!("Probed {}, no endpoint at {}", result.total_probes, result.misses),
            border,
        ));
        output.push_str(&format!("{}\n", rule('╚', '╝').truecolor(border.0, border.1, border.2)));

        output
    }

    fn format_finding(&self, finding: &SseFinding) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n",
            "┌─────────────────────────────────────────────────────────────────────────────┐".truecolor(64, 64, 64)));
        output.push_str(&format!("│ {} {}{} {}\n",
            "⟨SSE⟩".truecolor(0, 212, 255).bold(),
            finding.authority().truecolor(255, 255, 255).bold(),
            finding.path.truecolor(255, 255, 255),
            format!("[{}]", finding.status).truecolor(0, 255, 65).bold()));
        output.push_str(&format!("│ {} {}\n",
            "content-type:".truecolor(128, 128, 128),
            finding.content_type.truecolor(255, 255, 255)));

        if let Some(endpoint) = &finding.message_endpoint {
            output.push_str(&format!("│ {} {}\n",
                "message endpoint:".truecolor(255, 140, 0).bold(),
                endpoint.truecolor(255, 255, 255).bold()));
        }

        output.push_str(&format!("{}\n",
            "├─────────────────────────────────────────────────────────────────────────────┤".truecolor(64, 64, 64)));

        if !finding.body_available {
            output.push_str(&format!("│ {}\n",
                "endpoint detected but body unavailable".truecolor(255, 140, 0)));
        } else if finding.events.is_empty() {
            output.push_str(&format!("│ {}\n", "no events parsed".truecolor(128, 128, 128)));
        } else {
            for event in &finding.events {
                let line = format!("{:<16} {}", event.event_type, event.data);
                if type_matches(&event.event_type, &self.marker) {
                    output.push_str(&format!("│ {} {}\n",
                        "▶".truecolor(255, 0, 81).bold(),
                        line.truecolor(255, 0, 81).bold()));
                } else {
                    output.push_str(&format!("│   {}\n", line.truecolor(191, 64, 191)));
                }
            }
        }

        output.push_str(&format!("{}\n\n",
            "└─────────────────────────────────────────────────────────────────────────────┘".truecolor(64, 64, 64)));
        output
    }
}

fn rule(left: char, right: char) -> String {
    format!("{}{}{}", left, "═".repeat(BOX_WIDTH), right)
}

fn centered(text: &str, color: (u8, u8, u8)) -> String {
    let len = text.chars().count();
    let left = BOX_WIDTH.saturating_sub(len) / 2;
    let right = BOX_WIDTH.saturating_sub(len + left);
    let (r, g, b) = color;
    format!("{}{}{}{}{}\n",
        "║".truecolor(r, g, b),
        " ".repeat(left),
        text.truecolor(r, g, b).bold(),
        " ".repeat(right),
        "║".truecolor(r, g, b))
}

/// One row per event; a finding without events still gets a row with empty event columns.
fn format_csv(result: &SweepResult) -> String {
    let mut csv = String::new();
    csv.push_str(CSV_HEADER);
    csv.push('\n');

    for finding in &result.findings {
        let prefix = format!(
            "{},{},{},{},{}",
            csv_field(&finding.host),
            finding.port,
            csv_field(&finding.path),
            finding.status,
            csv_field(&finding.content_type)
        );

        if finding.events.is_empty() {
            csv.push_str(&format!("{},,\n", prefix));
        }
        for event in &finding.events {
            csv.push_str(&format!(
                "{},{},{}\n",
                prefix,
                csv_field(&event.event_type),
                csv_field(&event.data)
            ));
        }
    }

    csv
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
