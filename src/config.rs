//! Game constants and client configuration.

use std::env;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Side length of the square grid.
pub const BOARD_SIZE: usize = 10;

/// Cell value of untouched water.
pub const EMPTY: i32 = 0;

/// Cell value of a fired-upon cell with no vessel.
pub const MISS: i32 = 11;

/// Reserved nickname identifying the CPU participant.
pub const CPU_NICKNAME: &str = "cpu";

/// Order in which the CPU places its fleet.
pub const VESSEL_ORDER: [u32; 5] = [1, 2, 3, 4, 5];

/// Delay between re-fetches while waiting on the opponent.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on rejection-sampling attempts for a single vessel.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 10_000;

/// Number of rows kept in the leaderboard.
pub const LEADERBOARD_SIZE: usize = 5;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Runtime settings for the client, read from `BATTLESHIP_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub username: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub poll_interval: Duration,
    pub seed: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            username: None,
            access_token: None,
            refresh_token: None,
            poll_interval: POLL_INTERVAL,
            seed: None,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            api_url: lookup("BATTLESHIP_API_URL").unwrap_or(defaults.api_url),
            username: lookup("BATTLESHIP_USER"),
            access_token: lookup("BATTLESHIP_ACCESS_TOKEN"),
            refresh_token: lookup("BATTLESHIP_REFRESH_TOKEN"),
            poll_interval: lookup("BATTLESHIP_POLL_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            seed: lookup("BATTLESHIP_SEED").and_then(|s| s.parse().ok()),
        }
    }
}

/// RNG seeded from `seed` when given, from the OS otherwise.
pub fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("BATTLESHIP_API_URL", "http://example.test"),
            ("BATTLESHIP_USER", "alice"),
            ("BATTLESHIP_POLL_MS", "250"),
            ("BATTLESHIP_SEED", "7"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_url, "http://example.test");
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.seed, Some(7));
        assert!(config.access_token.is_none());
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = ClientConfig::from_lookup(|k| match k {
            "BATTLESHIP_POLL_MS" | "BATTLESHIP_SEED" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = seeded_rng(Some(42));
        let mut b = seeded_rng(Some(42));
        for _ in 0..16 {
            assert_eq!(a.random_range(0..100u32), b.random_range(0..100u32));
        }
    }
}
