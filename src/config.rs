//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "practice-exam")]
#[command(about = "Local front end for timed, sectioned practice exams")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// JSON export of tests, sections, questions, profiles and sessions
    #[arg(short, long, default_value = "catalog.json")]
    pub catalog: PathBuf,

    /// File holding section deadlines between runs
    #[arg(short, long, default_value = "timer-store.json")]
    pub store: PathBuf,

    /// How long the five-minute warning banner stays up, in seconds
    #[arg(long, default_value = "3")]
    pub banner_seconds: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn banner_duration_ms(&self) -> i64 {
        (self.banner_seconds as i64).saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["practice-exam"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.banner_duration_ms(), 3_000);
        assert_eq!(config.store, PathBuf::from("timer-store.json"));
    }

    #[test]
    fn overrides() {
        let config = Config::try_parse_from([
            "practice-exam",
            "-p",
            "8080",
            "--host",
            "0.0.0.0",
            "-c",
            "/tmp/act.json",
            "--banner-seconds",
            "5",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.catalog, PathBuf::from("/tmp/act.json"));
        assert_eq!(config.banner_duration_ms(), 5_000);
        assert_eq!(config.log_level(), "debug");
    }
}
