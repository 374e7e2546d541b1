use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::Ordinal;

/// Version stamped on every persisted progress record.
pub const PROGRESS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressRecordError {
    #[error("unsupported progress schema version {found} (expected {})", PROGRESS_SCHEMA_VERSION)]
    UnsupportedVersion { found: u32 },

    #[error("persisted ordinal 0 is not a valid lesson position")]
    ZeroOrdinal,
}

/// The set of completed lesson ordinals.
///
/// Grows monotonically; the only way to shrink it is `clear`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressRecord {
    completed: BTreeSet<Ordinal>,
}

impl ProgressRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a record from its persisted form.
    ///
    /// # Errors
    ///
    /// Returns `ProgressRecordError` if the version is unknown or an ordinal is zero.
    pub fn from_persisted(
        version: u32,
        ordinals: impl IntoIterator<Item = u32>,
    ) -> Result<Self, ProgressRecordError> {
        if version != PROGRESS_SCHEMA_VERSION {
            return Err(ProgressRecordError::UnsupportedVersion { found: version });
        }
        let completed = ordinals
            .into_iter()
            .map(|raw| Ordinal::try_new(raw).ok_or(ProgressRecordError::ZeroOrdinal))
            .collect::<Result<_, _>>()?;
        Ok(Self { completed })
    }

    /// Adds `ordinal`, returning `true` if it was not already present.
    pub fn insert(&mut self, ordinal: Ordinal) -> bool {
        self.completed.insert(ordinal)
    }

    #[must_use]
    pub fn contains(&self, ordinal: Ordinal) -> bool {
        self.completed.contains(&ordinal)
    }

    pub fn clear(&mut self) {
        self.completed.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Completed ordinals in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Ordinal> + '_ {
        self.completed.iter().copied()
    }

    #[must_use]
    pub fn to_persisted(&self) -> Vec<u32> {
        self.iter().map(|ordinal| ordinal.value()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ord(n: u32) -> Ordinal {
        Ordinal::try_new(n).unwrap()
    }

    #[test]
    fn insert_is_idempotent() {
        let mut record = ProgressRecord::new();
        assert!(record.insert(ord(2)));
        let once = record.clone();
        assert!(!record.insert(ord(2)));
        assert_eq!(record, once);
    }

    #[test]
    fn never_shrinks_until_cleared() {
        let mut record = ProgressRecord::new();
        let mut last = 0;
        for n in [3, 1, 3, 2, 1, 5] {
            record.insert(ord(n));
            assert!(record.len() >= last);
            last = record.len();
        }
        assert_eq!(record.to_persisted(), vec![1, 2, 3, 5]);

        record.clear();
        assert!(record.is_empty());
    }

    #[test]
    fn from_persisted_checks_version_and_values() {
        let record = ProgressRecord::from_persisted(PROGRESS_SCHEMA_VERSION, [2, 1, 2]).unwrap();
        assert_eq!(record.to_persisted(), vec![1, 2]);

        assert_eq!(
            ProgressRecord::from_persisted(99, [1]),
            Err(ProgressRecordError::UnsupportedVersion { found: 99 })
        );
        assert_eq!(
            ProgressRecord::from_persisted(PROGRESS_SCHEMA_VERSION, [1, 0]),
            Err(ProgressRecordError::ZeroOrdinal)
        );
    }
}
