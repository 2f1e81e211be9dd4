//! Typed view over the persisted property store
//!
//! Integers are stored as decimal strings. A value that does not parse is
//! reported as corruption rather than read as zero.

use std::str::FromStr;

use crate::backend::PropertyStore;
use crate::types::error::{FilterError, Result};

pub const VERSION_KEY: &str = "version";
pub const TOTAL_KEY: &str = "total";

pub struct PersistedState<'a> {
    store: &'a dyn PropertyStore,
}

impl<'a> PersistedState<'a> {
    pub fn new(store: &'a dyn PropertyStore) -> Self {
        Self { store }
    }

    /// Installed schema version. A store holding `total` but no `version`
    /// predates versioning and reads as version 0.
    pub fn version(&self) -> Result<Option<u32>> {
        match self.store.get(VERSION_KEY)? {
            Some(raw) => parse(VERSION_KEY, &raw).map(Some),
            None if self.store.get(TOTAL_KEY)?.is_some() => Ok(Some(0)),
            None => Ok(None),
        }
    }

    pub fn set_version(&self, version: u32) -> Result<()> {
        self.store.set(VERSION_KEY, &version.to_string())
    }

    /// Threads processed since the last digest; a missing key reads as 0.
    pub fn total(&self) -> Result<u64> {
        match self.store.get(TOTAL_KEY)? {
            Some(raw) => parse(TOTAL_KEY, &raw),
            None => Ok(0),
        }
    }

    pub fn set_total(&self, total: u64) -> Result<()> {
        self.store.set(TOTAL_KEY, &total.to_string())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.delete_all()
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| FilterError::CorruptState {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryStore;

    #[test]
    fn absent_store_is_not_installed() {
        let store = MemoryStore::default();
        let state = PersistedState::new(&store);
        assert_eq!(state.version().unwrap(), None);
        assert_eq!(state.total().unwrap(), 0);
    }

    #[test]
    fn legacy_total_without_version_reads_as_version_zero() {
        let store = MemoryStore::with(&[(TOTAL_KEY, "12")]);
        let state = PersistedState::new(&store);
        assert_eq!(state.version().unwrap(), Some(0));
        assert_eq!(state.total().unwrap(), 12);
    }

    #[test]
    fn round_trips_decimal_strings() {
        let store = MemoryStore::default();
        let state = PersistedState::new(&store);
        state.set_version(1).unwrap();
        state.set_total(41).unwrap();

        assert_eq!(store.get(VERSION_KEY).unwrap().as_deref(), Some("1"));
        assert_eq!(store.get(TOTAL_KEY).unwrap().as_deref(), Some("41"));
        assert_eq!(state.version().unwrap(), Some(1));
        assert_eq!(state.total().unwrap(), 41);
    }

    #[test]
    fn non_numeric_values_are_corruption() {
        let store = MemoryStore::with(&[(VERSION_KEY, "1"), (TOTAL_KEY, "lots")]);
        let state = PersistedState::new(&store);

        match state.total() {
            Err(FilterError::CorruptState { key, value }) => {
                assert_eq!(key, TOTAL_KEY);
                assert_eq!(value, "lots");
            }
            other => panic!("expected corruption, got {:?}", other),
        }

        let store = MemoryStore::with(&[(VERSION_KEY, "-1")]);
        assert!(matches!(
            PersistedState::new(&store).version(),
            Err(FilterError::CorruptState { .. })
        ));
    }
}
