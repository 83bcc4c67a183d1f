use clap::Parser;
use tracing::Level;

use crate::codec::DEFAULT_MAX_FRAME_SIZE;

const PORT: u16 = 6379;

/// Server settings, read from the command line or the environment.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// The address to bind to
    #[arg(long, env = "RESPKV_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    /// The port to listen on
    #[arg(short, long, env = "RESPKV_PORT", default_value_t = PORT)]
    pub port: u16,

    /// Largest incomplete frame, in bytes, buffered for a single connection
    #[arg(long, env = "MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,

    /// Maximum log level
    #[arg(long, env = "RESPKV_LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,
}
