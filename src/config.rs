use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{anyhow, Result};
use clap::ValueEnum;

use crate::cli::{Cli, OutputFormat};

pub const DEFAULT_PATH: &str = "/sse";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_READ_DEADLINE_MS: u64 = 5000;
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Central configuration for ssescan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scanning: ScanConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Upper bound on the whole read phase; SSE streams rarely close on their own.
    pub read_deadline_ms: u64,
    pub max_response_bytes: usize,
    pub parallelism: usize,
    pub paths: Vec<String>,
    pub discovery: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub default_format: String,
    pub color_enabled: bool,
    pub highlight_marker: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scanning: ScanConfig {
                connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
                read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
                read_deadline_ms: DEFAULT_READ_DEADLINE_MS,
                max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
                parallelism: 50,
                paths: vec![DEFAULT_PATH.to_string()],
                discovery: true,
            },
            output: OutputConfig {
                default_format: "human".to_string(),
                color_enabled: true,
                highlight_marker: "endpoint".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the standard config directory.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::get_config_path);

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| anyhow!("invalid config {}: {}", config_path.display(), e))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`, or to the standard config directory
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::get_config_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(config_path)
    }

    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("ssescan");
        path.push("config.json");
        path
    }

    /// Command line flags take precedence over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(timeout) = cli.timeout {
            self.scanning.connect_timeout_ms = timeout;
        }
        if let Some(read_timeout) = cli.read_timeout {
            self.scanning.read_timeout_ms = read_timeout;
        }
        if let Some(deadline) = cli.read_deadline {
            self.scanning.read_deadline_ms = deadline;
        }
        if let Some(max_bytes) = cli.max_bytes {
            self.scanning.max_response_bytes = max_bytes;
        }
        if let Some(parallel) = cli.parallel {
            self.scanning.parallelism = parallel;
        }
        if !cli.paths.is_empty() {
            self.scanning.paths = cli.paths.clone();
        }
        if cli.skip_discovery {
            self.scanning.discovery = false;
        }
        if let Some(format) = cli.output_format {
            self.output.default_format = format.to_string();
        }
        if cli.no_color {
            self.output.color_enabled = false;
        }
        if let Some(ref marker) = cli.marker {
            self.output.highlight_marker = marker.clone();
        }
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        let scanning = &self.scanning;
        if scanning.connect_timeout_ms == 0 || scanning.read_timeout_ms == 0 {
            return Err(anyhow!("timeouts must be greater than 0"));
        }

        if scanning.read_deadline_ms < scanning.read_timeout_ms {
            return Err(anyhow!("read_deadline_ms must not be shorter than read_timeout_ms"));
        }

        if scanning.max_response_bytes == 0 {
            return Err(anyhow!("max_response_bytes must be greater than 0"));
        }

        if scanning.parallelism == 0 {
            return Err(anyhow!("parallelism must be greater than 0"));
        }

        if scanning.paths.is_empty() {
            return Err(anyhow!("at least one request path is required"));
        }

        if let Some(bad) = scanning.paths.iter().find(|p| !p.starts_with('/')) {
            return Err(anyhow!("request path '{}' must start with '/'", bad));
        }

        self.output_format()?;
        Ok(())
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::from_str(&self.output.default_format, true).map_err(|_| {
            anyhow!("default_format must be one of: human, json, csv")
        })
    }

    pub fn settings(&self) -> ScanSettings {
        ScanSettings {
            connect_timeout: Duration::from_millis(self.scanning.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.scanning.read_timeout_ms),
            read_deadline: Duration::from_millis(self.scanning.read_deadline_ms),
            max_response_bytes: self.scanning.max_response_bytes,
        }
    }
}

/// Timeouts and limits shared by every probe of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub read_deadline: Duration,
    pub max_response_bytes: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Config::default().settings()
    }
}

impl ScanSettings {
    pub fn probe_config(&self, host: impl Into<String>, port: u16, path: impl Into<String>) -> ProbeConfig {
        ProbeConfig {
            host: host.into(),
            port,
            path: path.into(),
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            read_deadline: self.read_deadline,
            max_response_bytes: self.max_response_bytes,
        }
    }
}

/// Everything one probe needs. Built once per (host, port, path) and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    host: String,
    port: u16,
    path: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    read_deadline: Duration,
    max_response_bytes: usize,
}

impl ProbeConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ScanSettings::default().probe_config(host, port, DEFAULT_PATH)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn read_deadline(&self) -> Duration {
        self.read_deadline
    }

    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn authority(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
