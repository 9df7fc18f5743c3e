//! Pool configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`ThreadPool`](crate::ThreadPool).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Identifier used in events, logs, and errors.
    pub name: String,
    /// Number of worker shards; fixed for the pool's lifetime.
    pub worker_count: usize,
    /// Admission threshold per worker; the pool rejects submissions once
    /// `max_tasks_per_worker * worker_count` tasks are in flight.
    pub max_tasks_per_worker: usize,
    /// Reserved for future fairness logic; currently informational.
    pub max_idle_workers: usize,
    /// A worker exits after blocking this long on an empty shard.
    pub max_idle_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            worker_count: num_cpus::get().max(1),
            max_tasks_per_worker: 16,
            max_idle_workers: 2,
            max_idle_ms: 5000,
        }
    }
}

impl PoolConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("name must not be empty".into());
        }
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.max_tasks_per_worker == 0 {
            return Err("max_tasks_per_worker must be greater than 0".into());
        }
        if self.max_idle_ms == 0 {
            return Err("max_idle_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a pool configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// Returns a message for both parse and validation failures.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a configuration from `WORKSHARD_*` environment variables,
    /// loading a `.env` file first if one exists. Unset variables keep their
    /// defaults.
    ///
    /// Recognised variables: `WORKSHARD_POOL_NAME`, `WORKSHARD_WORKER_COUNT`,
    /// `WORKSHARD_MAX_TASKS_PER_WORKER`, `WORKSHARD_MAX_IDLE_WORKERS`,
    /// `WORKSHARD_MAX_IDLE_MS`.
    ///
    /// # Errors
    ///
    /// Returns a message when a variable fails to parse or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let mut cfg = Self::default();
        if let Ok(name) = std::env::var("WORKSHARD_POOL_NAME") {
            cfg.name = name;
        }
        cfg.worker_count = env_usize("WORKSHARD_WORKER_COUNT", cfg.worker_count)?;
        cfg.max_tasks_per_worker =
            env_usize("WORKSHARD_MAX_TASKS_PER_WORKER", cfg.max_tasks_per_worker)?;
        cfg.max_idle_workers = env_usize("WORKSHARD_MAX_IDLE_WORKERS", cfg.max_idle_workers)?;
        if let Ok(raw) = std::env::var("WORKSHARD_MAX_IDLE_MS") {
            cfg.max_idle_ms = raw
                .parse()
                .map_err(|e| format!("WORKSHARD_MAX_IDLE_MS: {e}"))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Idle interval as a [`Duration`].
    #[must_use]
    pub const fn max_idle(&self) -> Duration {
        Duration::from_millis(self.max_idle_ms)
    }
}

fn env_usize(key: &str, default: usize) -> Result<usize, String> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| format!("{key}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = PoolConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.worker_count >= 1);
        assert_eq!(cfg.max_idle(), Duration::from_millis(5000));
    }

    #[test]
    fn test_validation_rejects_zeroes() {
        let cfg = PoolConfig {
            worker_count: 0,
            ..PoolConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PoolConfig {
            max_tasks_per_worker: 0,
            ..PoolConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PoolConfig {
            name: String::new(),
            ..PoolConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_str() {
        let cfg = PoolConfig::from_json_str(
            r#"{"name":"etl","worker_count":4,"max_tasks_per_worker":8,"max_idle_ms":100}"#,
        )
        .unwrap();
        assert_eq!(cfg.name, "etl");
        assert_eq!(cfg.worker_count, 4);
        assert_eq!(cfg.max_tasks_per_worker, 8);
        assert_eq!(cfg.max_idle_ms, 100);

        assert!(PoolConfig::from_json_str(r#"{"worker_count":0}"#).is_err());
        assert!(PoolConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let cfg = PoolConfig {
            name: "round".into(),
            worker_count: 3,
            max_tasks_per_worker: 5,
            max_idle_workers: 1,
            max_idle_ms: 250,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back = PoolConfig::from_json_str(&json).unwrap();
        assert_eq!(back.name, cfg.name);
        assert_eq!(back.worker_count, cfg.worker_count);
        assert_eq!(back.max_idle_ms, cfg.max_idle_ms);
    }
}
