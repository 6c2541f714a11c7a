use shrink_core::error::Result;
use shrink_core::{OwnerId, ShortCode, Stats, StorageError, UrlRecord, UserUrl};
use std::collections::{HashMap, HashSet};

/// Append-only, insertion-ordered record collection with lookup indexes.
///
/// Shared by the in-process backends. Callers are responsible for locking.
#[derive(Debug, Default)]
pub(crate) struct RecordSet {
    records: Vec<UrlRecord>,
    by_code: HashMap<ShortCode, usize>,
    // First record stored for each original URL.
    by_url: HashMap<String, usize>,
}

impl RecordSet {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn contains(&self, code: &ShortCode) -> bool {
        self.by_code.contains_key(code)
    }

    pub(crate) fn get_original(&self, code: &ShortCode) -> Result<String> {
        let Some(&idx) = self.by_code.get(code) else {
            return Err(StorageError::NotFound(format!("short code {code}")));
        };

        let record = &self.records[idx];
        if record.deleted {
            return Err(StorageError::Gone(code.clone()));
        }

        Ok(record.original_url.clone())
    }

    /// Checks that `record` can be inserted without breaking uniqueness.
    pub(crate) fn check_insert(&self, record: &UrlRecord, unique_urls: bool) -> Result<()> {
        if self.contains(&record.short_code) {
            return Err(StorageError::CodeTaken(record.short_code.clone()));
        }

        if unique_urls {
            if let Some(&idx) = self.by_url.get(&record.original_url) {
                return Err(StorageError::Conflict(self.records[idx].short_code.clone()));
            }
        }

        Ok(())
    }

    /// Checks a whole batch against the stored records and against itself.
    pub(crate) fn check_batch(&self, records: &[UrlRecord], unique_urls: bool) -> Result<()> {
        let mut codes = HashSet::with_capacity(records.len());
        let mut urls = HashSet::with_capacity(records.len());

        for record in records {
            self.check_insert(record, unique_urls)?;

            if !codes.insert(&record.short_code) {
                return Err(StorageError::CodeTaken(record.short_code.clone()));
            }

            if unique_urls && !urls.insert(record.original_url.as_str()) {
                return Err(StorageError::DuplicateInBatch(record.original_url.clone()));
            }
        }

        Ok(())
    }

    /// Appends a record. The caller must have run [`RecordSet::check_insert`].
    pub(crate) fn insert(&mut self, record: UrlRecord) {
        let idx = self.records.len();
        self.by_code.insert(record.short_code.clone(), idx);
        self.by_url.entry(record.original_url.clone()).or_insert(idx);
        self.records.push(record);
    }

    /// Applies a replayed journal entry.
    ///
    /// A code seen for the first time creates a record; a known code only
    /// carries a tombstone update.
    pub(crate) fn replay(&mut self, record: UrlRecord) {
        match self.by_code.get(&record.short_code) {
            Some(&idx) => {
                if record.deleted {
                    self.records[idx].deleted = true;
                }
            }
            None => self.insert(record),
        }
    }

    pub(crate) fn owned_by(&self, owner: &OwnerId, base_url: &str) -> Result<Vec<UserUrl>> {
        let urls: Vec<UserUrl> = self
            .records
            .iter()
            .filter(|record| !record.deleted && record.is_owned_by(owner))
            .map(|record| UserUrl {
                short_url: record.short_code.to_url(base_url),
                original_url: record.original_url.clone(),
            })
            .collect();

        if urls.is_empty() {
            return Err(StorageError::NotFound(format!("no urls for owner {owner}")));
        }

        Ok(urls)
    }

    /// Positions of the live records among `codes` that belong to `owner`.
    pub(crate) fn deletable(&self, codes: &[ShortCode], owner: &OwnerId) -> Vec<usize> {
        let mut seen = HashSet::with_capacity(codes.len());
        codes
            .iter()
            .filter_map(|code| self.by_code.get(code).copied())
            .filter(|&idx| {
                let record = &self.records[idx];
                !record.deleted && record.is_owned_by(owner)
            })
            .filter(|&idx| seen.insert(idx))
            .collect()
    }

    /// Tombstoned copies of the records at `positions`, for journaling.
    pub(crate) fn tombstones(&self, positions: &[usize]) -> Vec<UrlRecord> {
        positions
            .iter()
            .map(|&idx| UrlRecord {
                deleted: true,
                ..self.records[idx].clone()
            })
            .collect()
    }

    pub(crate) fn mark_deleted(&mut self, positions: &[usize]) {
        for &idx in positions {
            self.records[idx].deleted = true;
        }
    }

    pub(crate) fn stats(&self) -> Stats {
        let users: HashSet<&OwnerId> = self
            .records
            .iter()
            .filter_map(|record| record.owner.as_ref())
            .collect();

        Stats {
            urls: self.records.len() as u64,
            users: users.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, url: &str, owner: Option<&str>) -> UrlRecord {
        UrlRecord::new(
            ShortCode::new_unchecked(code),
            url,
            owner.map(|o| OwnerId::new(o).unwrap()),
        )
    }

    #[test]
    fn replay_of_known_code_only_applies_tombstone() {
        let mut set = RecordSet::default();
        set.replay(record("abc123", "https://example.com", Some("u1")));

        let mut tombstone = record("abc123", "https://ignored.example", Some("u1"));
        tombstone.deleted = true;
        set.replay(tombstone);

        assert_eq!(set.len(), 1);
        let err = set.get_original(&ShortCode::new_unchecked("abc123")).unwrap_err();
        assert!(matches!(err, StorageError::Gone(_)));
    }

    #[test]
    fn check_batch_rejects_duplicate_codes_within_batch() {
        let set = RecordSet::default();
        let batch = vec![
            record("abc123", "https://one.example", None),
            record("abc123", "https://two.example", None),
        ];

        let err = set.check_batch(&batch, false).unwrap_err();
        assert!(matches!(err, StorageError::CodeTaken(code) if code.as_str() == "abc123"));
    }

    #[test]
    fn check_batch_reports_repeated_url_as_domain_error() {
        let set = RecordSet::default();
        let batch = vec![
            record("abc123", "https://same.example", None),
            record("def456", "https://same.example", None),
        ];

        let err = set.check_batch(&batch, true).unwrap_err();
        assert!(matches!(&err, StorageError::DuplicateInBatch(url) if url == "https://same.example"));
        assert!(!err.is_internal());
        assert!(set.check_batch(&batch, false).is_ok());
    }

    #[test]
    fn deletable_ignores_duplicates_and_foreign_records() {
        let mut set = RecordSet::default();
        set.insert(record("aaa111", "https://a.example", Some("u1")));
        set.insert(record("bbb222", "https://b.example", Some("u2")));

        let codes = [
            ShortCode::new_unchecked("aaa111"),
            ShortCode::new_unchecked("aaa111"),
            ShortCode::new_unchecked("bbb222"),
            ShortCode::new_unchecked("zzz999"),
        ];
        let positions = set.deletable(&codes, &OwnerId::new("u1").unwrap());
        assert_eq!(positions, vec![0]);
    }

    #[test]
    fn stats_count_tombstones_and_skip_anonymous_owners() {
        let mut set = RecordSet::default();
        set.insert(record("aaa111", "https://a.example", Some("u1")));
        set.insert(record("bbb222", "https://b.example", Some("u1")));
        set.insert(record("ccc333", "https://c.example", None));
        set.mark_deleted(&[0]);

        assert_eq!(set.stats(), Stats { urls: 3, users: 1 });
    }
}
