//! # Run Configuration
//!
//! Every knob the coordinator needs, with defaults matching the classic demo
//! run: a warehouse of 10, one producer submitting 20 orders, four consumers
//! taking five each.
//!
//! Values come from three places, later ones winning:
//! 1. [`WarehouseConfig::default`]
//! 2. Any serde source (`#[serde(default)]` fills the gaps)
//! 3. `WAREHOUSE_*` environment variables via [`WarehouseConfig::from_env`]
//!
//! | Variable | Field |
//! |----------|-------|
//! | `WAREHOUSE_CAPACITY` | `capacity` |
//! | `WAREHOUSE_PRODUCERS` | `producers` |
//! | `WAREHOUSE_ORDERS_PER_PRODUCER` | `orders_per_producer` |
//! | `WAREHOUSE_CONSUMERS` | `consumers` |
//! | `WAREHOUSE_CONSUMER_QUOTA` | `consumer_quota` (`none` = until stopped) |
//! | `WAREHOUSE_PRODUCE_DELAY_MS` | `produce_delay_ms` |
//! | `WAREHOUSE_PROCESS_DELAY_MS` | `process_delay_ms` |
//! | `WAREHOUSE_JOIN_TIMEOUT_MS` | `join_timeout_ms` |
//! | `WAREHOUSE_WAKE_POLICY` | `wake_policy` (`one` / `all`) |
//! | `WAREHOUSE_MODE` | `mode` (`tasks` / `executor`) |
//! | `WAREHOUSE_CATALOG` | `catalog` (comma separated) |

use crate::model::{Catalog, SHOE_CATEGORIES};
use crate::tasks::ConsumerQuota;
use crate::warehouse::{WakePolicy, WarehouseError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Which consumer side the coordinator wires up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Long-lived consumer loops, one thread each.
    #[default]
    Tasks,
    /// A fulfillment pool with one job and one receipt per order.
    Executor,
}

impl FromStr for RunMode {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tasks" => Ok(RunMode::Tasks),
            "executor" => Ok(RunMode::Executor),
            other => Err(WarehouseError::Configuration(format!(
                "unknown run mode '{other}', expected 'tasks' or 'executor'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub capacity: usize,
    pub producers: usize,
    pub orders_per_producer: usize,
    /// In executor mode this is the fulfillment pool size.
    pub consumers: usize,
    /// `None` means consumers run until the coordinator stops them.
    pub consumer_quota: Option<usize>,
    pub produce_delay_ms: u64,
    pub process_delay_ms: u64,
    pub join_timeout_ms: u64,
    pub wake_policy: WakePolicy,
    pub mode: RunMode,
    pub catalog: Vec<String>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            producers: 1,
            orders_per_producer: 20,
            consumers: 4,
            consumer_quota: Some(5),
            produce_delay_ms: 200,
            process_delay_ms: 300,
            join_timeout_ms: 5_000,
            wake_policy: WakePolicy::One,
            mode: RunMode::Tasks,
            catalog: SHOE_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl WarehouseConfig {
    /// Defaults overridden by `WAREHOUSE_*` environment variables.
    pub fn from_env() -> Result<Self, WarehouseError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup (the environment, a map in tests).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, WarehouseError> {
        override_parsed(&lookup, "WAREHOUSE_CAPACITY", &mut self.capacity)?;
        override_parsed(&lookup, "WAREHOUSE_PRODUCERS", &mut self.producers)?;
        override_parsed(
            &lookup,
            "WAREHOUSE_ORDERS_PER_PRODUCER",
            &mut self.orders_per_producer,
        )?;
        override_parsed(&lookup, "WAREHOUSE_CONSUMERS", &mut self.consumers)?;
        override_parsed(&lookup, "WAREHOUSE_PRODUCE_DELAY_MS", &mut self.produce_delay_ms)?;
        override_parsed(&lookup, "WAREHOUSE_PROCESS_DELAY_MS", &mut self.process_delay_ms)?;
        override_parsed(&lookup, "WAREHOUSE_JOIN_TIMEOUT_MS", &mut self.join_timeout_ms)?;
        override_parsed(&lookup, "WAREHOUSE_WAKE_POLICY", &mut self.wake_policy)?;
        override_parsed(&lookup, "WAREHOUSE_MODE", &mut self.mode)?;

        if let Some(raw) = lookup("WAREHOUSE_CONSUMER_QUOTA") {
            self.consumer_quota = match raw.trim() {
                "" | "none" | "until_stopped" => None,
                value => Some(parse_value("WAREHOUSE_CONSUMER_QUOTA", value)?),
            };
        }

        if let Some(raw) = lookup("WAREHOUSE_CATALOG") {
            self.catalog = raw
                .split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(self)
    }

    /// Checks every constraint the coordinator relies on.
    ///
    /// A fixed consumer quota that does not add up to the number of produced
    /// orders is allowed but logged: the coordinator's bounded join and forced
    /// stop take care of consumers that would otherwise wait forever.
    pub fn validate(&self) -> Result<(), WarehouseError> {
        if self.capacity == 0 {
            return Err(WarehouseError::Configuration(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.producers == 0 {
            return Err(WarehouseError::Configuration(
                "at least one producer is required".to_string(),
            ));
        }
        if self.consumers == 0 {
            return Err(WarehouseError::Configuration(
                "at least one consumer is required".to_string(),
            ));
        }
        if self.consumer_quota == Some(0) {
            return Err(WarehouseError::Configuration(
                "a fixed consumer quota must be at least 1".to_string(),
            ));
        }
        if self.catalog.is_empty() {
            return Err(WarehouseError::Configuration(
                "catalog must contain at least one category".to_string(),
            ));
        }

        let produced = self
            .producers
            .checked_mul(self.orders_per_producer)
            .ok_or_else(|| {
                WarehouseError::Configuration(format!(
                    "{} producers x {} orders overflows the order count",
                    self.producers, self.orders_per_producer
                ))
            })?;

        if let (RunMode::Tasks, Some(quota)) = (self.mode, self.consumer_quota) {
            let consumed = self.consumers.checked_mul(quota).ok_or_else(|| {
                WarehouseError::Configuration(format!(
                    "{} consumers x quota {quota} overflows the order count",
                    self.consumers
                ))
            })?;
            if produced != consumed {
                warn!(produced, consumed, "Consumer quotas do not match produced orders");
            }
        }

        Ok(())
    }

    pub fn catalog(&self) -> Result<Catalog, WarehouseError> {
        Catalog::new(self.catalog.iter().cloned())
    }

    pub fn consumer_quota(&self) -> ConsumerQuota {
        ConsumerQuota::from(self.consumer_quota)
    }

    /// Orders the producers will submit between them. Saturates instead of
    /// overflowing; [`validate`](Self::validate) rejects configs where it would.
    pub fn total_orders(&self) -> usize {
        self.producers.saturating_mul(self.orders_per_producer)
    }

    pub fn produce_delay(&self) -> Duration {
        Duration::from_millis(self.produce_delay_ms)
    }

    pub fn process_delay(&self) -> Duration {
        Duration::from_millis(self.process_delay_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

fn override_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> Result<(), WarehouseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = parse_value(key, &raw)?;
    }
    Ok(())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, WarehouseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| WarehouseError::Configuration(format!("{key}={raw:?}: {e}")))
}
