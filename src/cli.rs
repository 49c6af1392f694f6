use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ssescan")]
#[command(version)]
#[command(about = "Finds Server-Sent-Events endpoints across hosts and ports", long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["target", "input_list"])))]
pub struct Cli {
    #[arg(short, long, help = "Target IP, hostname, IP range (IP1-IP2), or CIDR (192.168.1.0/24). Can be specified multiple times.")]
    pub target: Vec<String>,

    #[arg(short, long, default_value = "sse", help = "Ports to probe (e.g., 8000, 8000-8100, 80,443, sse, web). Can be specified multiple times.")]
    pub ports: Vec<String>,

    #[arg(short, long, help = "Port scanner result file (masscan -oL list, or ip:port per line)")]
    pub input_list: Option<PathBuf>,

    #[arg(long = "path", help = "Request path of the SSE endpoint (default /sse). Can be specified multiple times.")]
    pub paths: Vec<String>,

    #[arg(long, help = "Connect timeout in milliseconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Timeout in milliseconds for each socket read")]
    pub read_timeout: Option<u64>,

    #[arg(long, help = "Maximum time in milliseconds spent reading one response")]
    pub read_deadline: Option<u64>,

    #[arg(long, help = "Maximum number of response bytes kept per probe")]
    pub max_bytes: Option<usize>,

    #[arg(long, help = "Number of probes in flight")]
    pub parallel: Option<usize>,

    #[arg(long, help = "Skip the TCP connect sweep and probe every host/port pair directly")]
    pub skip_discovery: bool,

    #[arg(long, help = "Probe targets in random order")]
    pub randomize: bool,

    #[arg(short = 'o', long, value_enum, help = "Output format [default: human]")]
    pub output_format: Option<OutputFormat>,

    #[arg(short = 'f', long, help = "Output file path")]
    pub output_file: Option<PathBuf>,

    #[arg(long, help = "Highlight events whose type contains this marker [default: endpoint]")]
    pub marker: Option<String>,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, help = "Hide the progress bar")]
    pub no_progress: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Configuration file (default: <config dir>/ssescan/config.json)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Write the effective configuration back to the configuration file")]
    pub save_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[value(name = "human", help = "Human-readable output")]
    Human,
    #[value(name = "json", help = "JSON output")]
    Json,
    #[value(name = "csv", help = "CSV output, one row per event")]
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["ssescan", "-t", "10.0.0.0/24"]);
        assert_eq!(cli.target, vec!["10.0.0.0/24".to_string()]);
        assert_eq!(cli.ports, vec!["sse".to_string()]);
        assert!(cli.paths.is_empty());
        assert!(cli.output_format.is_none());
        assert!(!cli.skip_discovery);
    }

    #[test]
    fn test_target_source_is_required() {
        assert!(Cli::try_parse_from(["ssescan"]).is_err());
        assert!(Cli::try_parse_from(["ssescan", "-i", "open.txt"]).is_ok());
    }

    #[test]
    fn test_target_and_input_list_conflict() {
        assert!(Cli::try_parse_from(["ssescan", "-t", "10.0.0.1", "-i", "open.txt"]).is_err());
    }

    #[test]
    fn test_repeatable_arguments() {
        let cli = Cli::parse_from([
            "ssescan", "-t", "10.0.0.1", "-t", "10.0.0.2", "-p", "8000", "-p", "9000-9001",
            "--path", "/sse", "--path", "/events", "-o", "json",
        ]);
        assert_eq!(cli.target.len(), 2);
        assert_eq!(cli.ports, vec!["8000".to_string(), "9000-9001".to_string()]);
        assert_eq!(cli.paths, vec!["/sse".to_string(), "/events".to_string()]);
        assert_eq!(cli.output_format, Some(OutputFormat::Json));
    }
}
