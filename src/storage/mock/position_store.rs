//! Mock PositionStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{PositionStore, Result};

/// Mock position store that stores positions in memory.
#[derive(Default)]
pub struct MockPositionStore {
    positions: RwLock<HashMap<String, u64>>,
}

impl MockPositionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionStore for MockPositionStore {
    async fn get(&self, handler: &str) -> Result<Option<u64>> {
        Ok(self.positions.read().await.get(handler).copied())
    }

    async fn put(&self, handler: &str, sequence: u64) -> Result<()> {
        self.positions
            .write()
            .await
            .insert(handler.to_string(), sequence);
        Ok(())
    }
}
