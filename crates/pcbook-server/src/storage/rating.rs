//! Running rating aggregates per laptop.

use std::collections::HashMap;
use std::sync::RwLock;

use super::StoreError;

/// Count and sum of every score a laptop has received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub count: u32,
    pub sum: f64,
}

impl Rating {
    /// Mean score. `count` is never zero for a stored rating.
    pub fn average(&self) -> f64 {
        self.sum / f64::from(self.count)
    }
}

/// Accumulates scores. Score validation is the caller's concern.
pub trait RatingStore: Send + Sync {
    /// Fold `score` into the laptop's aggregate and return the new value.
    fn add(&self, laptop_id: &str, score: f64) -> Result<Rating, StoreError>;

    fn find(&self, laptop_id: &str) -> Result<Option<Rating>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: RwLock<HashMap<String, Rating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn add(&self, laptop_id: &str, score: f64) -> Result<Rating, StoreError> {
        let mut ratings = self.ratings.write()?;
        let rating = match ratings.get(laptop_id) {
            None => Rating {
                count: 1,
                sum: score,
            },
            Some(current) => Rating {
                count: current
                    .count
                    .checked_add(1)
                    .ok_or_else(|| StoreError::Overflow(laptop_id.to_string()))?,
                sum: current.sum + score,
            },
        };
        ratings.insert(laptop_id.to_string(), rating);
        Ok(rating)
    }

    fn find(&self, laptop_id: &str) -> Result<Option<Rating>, StoreError> {
        Ok(self.ratings.read()?.get(laptop_id).copied())
    }
}
