// Configuration module entry point
// Layers defaults, an optional config file, environment variables, and
// command-line overrides into one immutable Config.

mod types;

use std::net::SocketAddr;

// Re-export public types
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, StaticConfig};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SPASERV"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("static_files.root", "dist")?
            .set_default("static_files.index", "index.html")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 15)?
            .set_default("performance.write_timeout", 15)?
            .set_default("http.enable_cors", false)?
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration and apply command-line overrides
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let mut cfg = Self::load_from("config")?;
        if let Some(port) = parse_port_flag(std::env::args().skip(1))? {
            cfg.server.port = port;
        }
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// Parse a `-port <int>` (or `--port <int>`) flag from process arguments.
///
/// Returns `Ok(None)` when the flag is absent; a flag without a value or with
/// a non-integer value is a startup error.
fn parse_port_flag(mut args: impl Iterator<Item = String>) -> Result<Option<u16>, String> {
    while let Some(arg) = args.next() {
        if arg == "-port" || arg == "--port" {
            let value = args
                .next()
                .ok_or_else(|| format!("{arg} requires a value"))?;
            let port = value
                .parse::<u16>()
                .map_err(|e| format!("Invalid port '{value}': {e}"))?;
            return Ok(Some(port));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_port_flag_absent() {
        assert_eq!(parse_port_flag(args(&[])), Ok(None));
        assert_eq!(parse_port_flag(args(&["-verbose"])), Ok(None));
    }

    #[test]
    fn test_port_flag_parsed() {
        assert_eq!(parse_port_flag(args(&["-port", "3000"])), Ok(Some(3000)));
        assert_eq!(parse_port_flag(args(&["--port", "8081"])), Ok(Some(8081)));
    }

    #[test]
    fn test_port_flag_invalid() {
        assert!(parse_port_flag(args(&["-port"])).is_err());
        assert!(parse_port_flag(args(&["-port", "http"])).is_err());
        assert!(parse_port_flag(args(&["-port", "70000"])).is_err());
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::load_from("nonexistent-config").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.static_files.root, "dist");
        assert_eq!(cfg.static_files.index, "index.html");
        assert_eq!(cfg.performance.read_timeout, 15);
        assert_eq!(cfg.performance.write_timeout, 15);
        assert!(!cfg.http.enable_cors);
    }
}
