use std::fmt;

use parking_lot::RwLock;
use tracing::info;

/// Buffer-chain geometry consumed by the oddbuf stage.
///
/// Values are not range-checked here; the stage checks them against the actual buffer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Copy count, interpreted by the stage.
    pub copy_count: u32,
    pub first_chunk_offset: u32,
    pub second_chunk_offset: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { copy_count: 1, first_chunk_offset: 0, second_chunk_offset: 1 }
    }
}

impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_to_copy {} first_offset {} offset {}",
            self.copy_count, self.first_chunk_offset, self.second_chunk_offset
        )
    }
}

/// A partial update to [`RuntimeConfig`]. Only the fields that are set are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub copy_count: Option<u32>,
    pub first_chunk_offset: Option<u32>,
    pub second_chunk_offset: Option<u32>,
}

impl ConfigUpdate {
    pub fn copy_count(mut self, copy_count: u32) -> Self {
        self.copy_count = Some(copy_count);
        self
    }

    pub fn first_chunk_offset(mut self, offset: u32) -> Self {
        self.first_chunk_offset = Some(offset);
        self
    }

    pub fn second_chunk_offset(mut self, offset: u32) -> Self {
        self.second_chunk_offset = Some(offset);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.copy_count.is_none() &&
            self.first_chunk_offset.is_none() &&
            self.second_chunk_offset.is_none()
    }

    fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(copy_count) = self.copy_count {
            config.copy_count = copy_count;
        }
        if let Some(offset) = self.first_chunk_offset {
            config.first_chunk_offset = offset;
        }
        if let Some(offset) = self.second_chunk_offset {
            config.second_chunk_offset = offset;
        }
    }
}

/// The process-wide [`RuntimeConfig`], readable and writable from any context.
///
/// Every update is applied under a single write lock, so readers observe either the whole old
/// record or the whole new one.
#[derive(Debug, Default)]
pub struct SharedConfig {
    inner: RwLock<RuntimeConfig>,
}

impl SharedConfig {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { inner: RwLock::new(config) }
    }

    /// Returns a copy of the current record.
    pub fn snapshot(&self) -> RuntimeConfig {
        *self.inner.read()
    }

    /// Applies `update` and returns the resulting record.
    pub fn configure(&self, update: ConfigUpdate) -> RuntimeConfig {
        let mut config = self.inner.write();
        update.apply(&mut config);

        let updated = *config;
        drop(config);

        info!(
            copy_count = updated.copy_count,
            first_chunk_offset = updated.first_chunk_offset,
            second_chunk_offset = updated.second_chunk_offset,
            "runtime configuration updated"
        );

        updated
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn defaults() {
        let config = SharedConfig::default();
        assert_eq!(
            config.snapshot(),
            RuntimeConfig { copy_count: 1, first_chunk_offset: 0, second_chunk_offset: 1 }
        );
    }

    #[test]
    fn only_supplied_fields_change() {
        let config = SharedConfig::default();
        config.configure(ConfigUpdate::default().first_chunk_offset(3).second_chunk_offset(9));

        let updated = config.configure(ConfigUpdate::default().copy_count(5));
        assert_eq!(
            updated,
            RuntimeConfig { copy_count: 5, first_chunk_offset: 3, second_chunk_offset: 9 }
        );
    }

    #[test]
    fn offset_scenario() {
        let config = SharedConfig::default();
        config.configure(ConfigUpdate::default().second_chunk_offset(4));

        assert_eq!(
            config.snapshot(),
            RuntimeConfig { copy_count: 1, first_chunk_offset: 0, second_chunk_offset: 4 }
        );
    }

    #[test]
    fn out_of_range_values_are_accepted() {
        let config = SharedConfig::default();
        let updated = config.configure(ConfigUpdate::default().copy_count(u32::MAX));
        assert_eq!(updated.copy_count, u32::MAX);
    }

    #[test]
    fn readers_never_observe_torn_records() {
        let config = Arc::new(SharedConfig::new(RuntimeConfig {
            copy_count: 0,
            first_chunk_offset: 0,
            second_chunk_offset: 0,
        }));

        let writer = {
            let config = Arc::clone(&config);
            thread::spawn(move || {
                for i in 1..=10_000u32 {
                    config.configure(
                        ConfigUpdate::default()
                            .copy_count(i)
                            .first_chunk_offset(i)
                            .second_chunk_offset(i),
                    );
                }
            })
        };

        for _ in 0..10_000 {
            let seen = config.snapshot();
            assert_eq!(seen.copy_count, seen.first_chunk_offset);
            assert_eq!(seen.copy_count, seen.second_chunk_offset);
        }

        writer.join().unwrap();
    }
}
