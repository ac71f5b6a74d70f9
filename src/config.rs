use clap::Parser;
use std::path::PathBuf;

use crate::codec::DEFAULT_MAX_FRAME_SIZE;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Startup parameters. Every flag can also be given through its `RESPKV_*` environment variable.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about)]
pub struct Config {
    /// The port to listen on
    #[arg(short, long, env = "RESPKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The address to bind to
    #[arg(long, env = "RESPKV_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Snapshot file, loaded at startup and written by SAVE
    #[arg(long, env = "RESPKV_DBFILENAME", default_value = "dump.rdb")]
    pub dbfilename: PathBuf,

    /// Largest request, in bytes, a client may buffer before the connection is dropped
    #[arg(long, env = "RESPKV_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            dbfilename: PathBuf::from(crate::store::DEFAULT_SNAPSHOT_PATH),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["respkv"]).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn flags() {
        let config = Config::try_parse_from([
            "respkv",
            "-p",
            "7000",
            "--bind",
            "0.0.0.0",
            "--dbfilename",
            "/tmp/data.rdb",
            "--max-frame-size",
            "1024",
        ])
        .unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.dbfilename, PathBuf::from("/tmp/data.rdb"));
        assert_eq!(config.max_frame_size, 1024);
    }

    #[test]
    fn invalid_port() {
        let res = Config::try_parse_from(["respkv", "--port", "not-a-port"]);

        assert!(res.is_err());
    }
}
