//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::game::Role;
use crate::util::time::{beat_interval, DEFAULT_BPM, DEFAULT_GAMEOVER_DELAY};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Which seat this process takes
    pub role: Role,
    /// Host binding address
    pub server_addr: SocketAddr,
    /// Host rendezvous URL (client only)
    pub host_url: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Tempo in beats per minute
    pub bpm: u32,
    /// Delay between match point and game over
    pub gameover_delay: Duration,
    /// Fixed seed for the session RNG
    pub cpu_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key -> value source
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let role = match get("ROLE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "ROLE",
                value: raw,
            })?,
            None => Role::Local,
        };

        // PORT wins over SERVER_ADDR, same as hosted environments expect
        let server_addr = match get("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => get("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let host_url = get("HOST_URL");
        if role == Role::Client && host_url.is_none() {
            return Err(ConfigError::Missing("HOST_URL"));
        }

        let bpm = parse_or("BPM", get("BPM"), DEFAULT_BPM)?;
        if bpm == 0 {
            return Err(ConfigError::Invalid {
                var: "BPM",
                value: "0".to_string(),
            });
        }

        let gameover_delay = match get("GAMEOVER_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_or("GAMEOVER_DELAY_MS", Some(raw), 0)?),
            None => DEFAULT_GAMEOVER_DELAY,
        };

        let cpu_seed = match get("CPU_SEED") {
            Some(raw) => Some(parse_or("CPU_SEED", Some(raw), 0)?),
            None => None,
        };

        Ok(Self {
            role,
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            host_url,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            bpm,
            gameover_delay,
            cpu_seed,
        })
    }

    /// Length of one beat
    pub fn beat_period(&self) -> Duration {
        beat_interval(self.bpm)
    }
}

impl Default for Config {
    /// Single player at the default tempo
    fn default() -> Self {
        Self {
            role: Role::Local,
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            host_url: None,
            log_level: "info".to_string(),
            bpm: DEFAULT_BPM,
            gameover_delay: DEFAULT_GAMEOVER_DELAY,
            cpu_seed: None,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_play() {
        let config = load(&[]).unwrap();
        assert_eq!(config.role, Role::Local);
        assert_eq!(config.bpm, 75);
        assert_eq!(config.beat_period(), Duration::from_millis(800));
        assert_eq!(config.gameover_delay, Duration::from_secs(2));
        assert_eq!(config.server_addr.port(), 8080);
        assert!(config.cpu_seed.is_none());
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = load(&[("PORT", "9001"), ("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr.port(), 9001);
    }

    #[test]
    fn client_needs_a_host() {
        assert!(matches!(
            load(&[("ROLE", "client")]),
            Err(ConfigError::Missing("HOST_URL"))
        ));

        let config = load(&[("ROLE", "client"), ("HOST_URL", "ws://10.0.0.2:8080/ws")]).unwrap();
        assert_eq!(config.role, Role::Client);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("ROLE", "referee")]),
            Err(ConfigError::Invalid { var: "ROLE", .. })
        ));
        assert!(matches!(
            load(&[("BPM", "0")]),
            Err(ConfigError::Invalid { var: "BPM", .. })
        ));
        assert!(matches!(
            load(&[("CPU_SEED", "abc")]),
            Err(ConfigError::Invalid { var: "CPU_SEED", .. })
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }

    #[test]
    fn tempo_and_seed_are_read() {
        let config = load(&[("BPM", "120"), ("GAMEOVER_DELAY_MS", "500"), ("CPU_SEED", "7")]).unwrap();
        assert_eq!(config.beat_period(), Duration::from_millis(500));
        assert_eq!(config.gameover_delay, Duration::from_millis(500));
        assert_eq!(config.cpu_seed, Some(7));
    }
}
