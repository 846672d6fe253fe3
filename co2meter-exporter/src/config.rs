use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::poll::{InvalidFramePolicy, PollConfig};

#[derive(Parser, Debug, Default)]
#[command(name = "co2meter-exporter")]
#[command(about = "Prometheus exporter for USB HID CO2 meters")]
pub struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Device to get readings from, e.g. /dev/hidraw0
    #[arg(short, long)]
    pub device: Option<PathBuf>,

    /// Host to bind to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<String>,

    /// Do not log readings periodically
    #[arg(short, long)]
    pub quiet: bool,

    /// Skip value decryption. This is needed for some CO2 meter models.
    #[arg(long)]
    pub skip_decryption: bool,

    /// What to do when a frame fails its checksum
    #[arg(long, value_enum)]
    pub on_invalid_frame: Option<InvalidFramePolicy>,

    /// Pause between two device reads, in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Interval between two log lines with the current readings, in seconds
    #[arg(long)]
    pub report_interval_secs: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing device path")]
    MissingDevice,

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("failed to resolve listen address {0}")]
    Resolve(String, #[source] io::Error),

    #[error("no address found for {0}")]
    NoAddress(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// hidraw node of the meter
    pub device: Option<PathBuf>,
    /// Host for the HTTP server to listen on
    pub host: String,
    /// Port for the HTTP server to listen on
    pub port: String,
    /// Suppress the periodic log line
    pub quiet: bool,
    /// Read frames as plaintext
    pub skip_decryption: bool,
    pub on_invalid_frame: InvalidFramePolicy,
    pub poll_interval_ms: u64,
    pub report_interval_secs: u64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Build the effective configuration: defaults, then the config file if
    /// one was given, then command line flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(device) = &cli.device {
            self.device = Some(device.clone());
        }
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = &cli.port {
            self.port = port.clone();
        }
        self.quiet |= cli.quiet;
        self.skip_decryption |= cli.skip_decryption;
        if let Some(policy) = cli.on_invalid_frame {
            self.on_invalid_frame = policy;
        }
        if let Some(ms) = cli.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(secs) = cli.report_interval_secs {
            self.report_interval_secs = secs;
        }
    }

    pub fn device_path(&self) -> Result<&Path, ConfigError> {
        match &self.device {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(ConfigError::MissingDevice),
        }
    }

    /// `host:port`, with IPv6 hosts in brackets.
    pub fn listen_display(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let port: u16 = self
            .port
            .parse()
            .map_err(|_| ConfigError::InvalidPort(self.port.clone()))?;

        (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| ConfigError::Resolve(self.listen_display(), e))?
            .next()
            .ok_or_else(|| ConfigError::NoAddress(self.listen_display()))
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            skip_decryption: self.skip_decryption,
            on_invalid_frame: self.on_invalid_frame,
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Never shorter than one second.
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            host: "::".to_string(),
            port: "9200".to_string(),
            quiet: false,
            skip_decryption: false,
            on_invalid_frame: InvalidFramePolicy::default(),
            poll_interval_ms: 200,
            report_interval_secs: 5,
        }
    }
}
