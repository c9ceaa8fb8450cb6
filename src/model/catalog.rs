//! # Category Catalog
//!
//! The fixed, read-only set of labels producers draw order categories from.
//! The labels live behind an `Arc<[String]>`, so cloning a catalog into every
//! producer thread shares one allocation and needs no locking.

use crate::warehouse::WarehouseError;
use std::sync::Arc;

/// Labels used by [`Catalog::default`].
pub const SHOE_CATEGORIES: [&str; 8] = [
    "Running shoes",
    "Basketball sneakers",
    "Football boots",
    "Tennis shoes",
    "Trekking boots",
    "Sneakers",
    "Sandals",
    "Boots",
];

#[derive(Debug, Clone)]
pub struct Catalog {
    labels: Arc<[String]>,
}

impl Catalog {
    /// Builds a catalog, rejecting an empty label list.
    pub fn new<I, S>(labels: I) -> Result<Self, WarehouseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Arc<[String]> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(WarehouseError::Configuration(
                "catalog must contain at least one category".to_string(),
            ));
        }
        Ok(Self { labels })
    }

    /// Round-robin lookup: index `i` maps to `labels[i mod len]`.
    pub fn category(&self, index: usize) -> &str {
        &self.labels[index % self.labels.len()]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            labels: SHOE_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
