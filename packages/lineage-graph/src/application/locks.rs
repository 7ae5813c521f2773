//! Per-run serialization
//!
//! A fixed set of async mutex stripes; a run id always hashes to the same
//! stripe. Holding the stripe while ingesting an event or reading a run
//! makes operations on one run linearizable without stopping unrelated
//! runs (which only contend when they share a stripe).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

/// Striped per-run locks
#[derive(Debug)]
pub struct RunLocks {
    stripes: Vec<Mutex<()>>,
}

impl RunLocks {
    /// `stripes` is clamped to at least one
    pub fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            stripes: (0..stripes).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Default stripe count (`num_cpus * 4`)
    pub fn default_stripes() -> usize {
        num_cpus::get() * 4
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    fn stripe_of(&self, run_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        run_id.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Wait for exclusive access to `run_id`
    pub async fn lock(&self, run_id: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(run_id)].lock().await
    }
}

impl Default for RunLocks {
    fn default() -> Self {
        Self::new(Self::default_stripes())
    }
}
