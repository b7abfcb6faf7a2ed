//! 选择过滤 - 决定本次运行处理哪些 bitstream
//!
//! Candidates come from the current-status table in ascending id order,
//! read page by page. Each candidate must pass every supplied predicate:
//!
//! | Predicate | Passes when |
//! |-----------|-------------|
//! | include | last result equals it (never-processed records fail) |
//! | exclude | last result not in the set (never-processed records pass) |
//! | before | last end date strictly earlier (never-processed records pass) |
//! | after | last end date strictly later (never-processed records pass) |
//! | root | bitstream is the root or contained in it |

use crate::db::MetadataRepository;
use crate::scope;
use crate::utils::{CheckerError, CheckerResult};
use shared::error::ErrorCode;
use shared::util::format_optional_millis;
use shared::{ChecksumResult, DsoRef, MostRecentChecksum};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// 选择条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    pub include: Option<ChecksumResult>,
    pub exclude: Option<BTreeSet<ChecksumResult>>,
    /// Unix millis
    pub before: Option<i64>,
    /// Unix millis
    pub after: Option<i64>,
    pub root: Option<DsoRef>,
}

/// Raw selection flags as typed by the operator
#[derive(Debug, Clone, Default)]
pub struct SelectionFlags {
    pub include_result: Option<String>,
    /// Comma separated result names
    pub exclude_results: Option<String>,
    /// Exclude [`ChecksumResult::DEFAULT_EXCLUDES`]
    pub use_default_excludes: bool,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl SelectionCriteria {
    /// Criteria that skip bitstreams already known to be unverifiable
    pub fn default_excludes() -> Self {
        Self {
            exclude: Some(ChecksumResult::DEFAULT_EXCLUDES.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Build criteria from operator flags. Scope root is resolved separately.
    pub fn from_flags(flags: &SelectionFlags) -> CheckerResult<Self> {
        let exclusion_sources =
            usize::from(flags.exclude_results.is_some()) + usize::from(flags.use_default_excludes);
        if exclusion_sources > 1 || (flags.include_result.is_some() && exclusion_sources > 0) {
            return Err(CheckerError::conflicting_criteria(
                "-x, -i, and -l options are mutually exclusive",
            ));
        }

        let include = flags
            .include_result
            .as_deref()
            .map(parse_result)
            .transpose()?;

        let exclude = if flags.use_default_excludes {
            Some(ChecksumResult::DEFAULT_EXCLUDES.into_iter().collect())
        } else {
            flags
                .exclude_results
                .as_deref()
                .map(|list| {
                    list.split(',')
                        .filter(|name| !name.trim().is_empty())
                        .map(parse_result)
                        .collect::<CheckerResult<BTreeSet<_>>>()
                })
                .transpose()?
        };

        Ok(Self {
            include,
            exclude,
            before: flags
                .before
                .as_deref()
                .map(crate::utils::time::parse_date_bound)
                .transpose()?,
            after: flags
                .after
                .as_deref()
                .map(crate::utils::time::parse_date_bound)
                .transpose()?,
            root: None,
        })
    }

    pub fn with_root(mut self, root: DsoRef) -> Self {
        self.root = Some(root);
        self
    }

    /// Reject contradictory criteria. Touches no storage.
    pub fn validate(&self) -> CheckerResult<()> {
        if self.include.is_some() && self.exclude.is_some() {
            return Err(CheckerError::conflicting_criteria(
                "include and exclude result criteria are mutually exclusive",
            ));
        }
        Ok(())
    }

    /// Status predicates only; scope is checked by the cursor
    pub fn matches(&self, record: &MostRecentChecksum) -> bool {
        if let Some(include) = self.include
            && record.result != Some(include)
        {
            return false;
        }

        if let Some(exclude) = &self.exclude
            && let Some(result) = record.result
            && exclude.contains(&result)
        {
            return false;
        }

        if let Some(end) = record.process_end_date {
            if let Some(before) = self.before
                && end >= before
            {
                return false;
            }
            if let Some(after) = self.after
                && end <= after
            {
                return false;
            }
        }

        true
    }
}

fn parse_result(name: &str) -> CheckerResult<ChecksumResult> {
    name.parse().map_err(|e: shared::ParseModelError| {
        CheckerError::configuration(ErrorCode::UnknownResult, e.to_string())
    })
}

impl fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SelectionCriteria")?;
        match self.include {
            Some(result) => write!(f, " include={}", result)?,
            None => write!(f, " include=-")?,
        }
        match &self.exclude {
            Some(set) => {
                let names: Vec<&str> = set.iter().map(|r| r.code()).collect();
                write!(f, " exclude=[{}]", names.join(","))?;
            }
            None => write!(f, " exclude=-")?,
        }
        write!(
            f,
            " before={} after={}",
            format_optional_millis(self.before),
            format_optional_millis(self.after)
        )?;
        match self.root {
            Some(root) => write!(f, " root={}", root),
            None => write!(f, " root=-"),
        }
    }
}

/// 选择器 - produces lazy candidate cursors
pub struct SelectionFilter {
    repo: Arc<dyn MetadataRepository>,
    page_size: usize,
}

impl SelectionFilter {
    pub fn new(repo: Arc<dyn MetadataRepository>, page_size: usize) -> Self {
        Self {
            repo,
            page_size: page_size.max(1),
        }
    }

    /// Validate `criteria`, then return a forward-only cursor over matching ids.
    ///
    /// Validation failures surface here, before any storage access.
    pub fn select(&self, criteria: &SelectionCriteria) -> CheckerResult<BitstreamCursor> {
        criteria.validate()?;
        Ok(BitstreamCursor {
            repo: Arc::clone(&self.repo),
            criteria: criteria.clone(),
            page_size: self.page_size,
            buffer: VecDeque::new(),
            last_id: None,
            exhausted: false,
        })
    }
}

/// Lazy, forward-only sequence of candidate bitstream ids (ascending).
///
/// Storage is read one page at a time and the cursor resumes strictly after
/// the last id it saw, so records rewritten during the run are not revisited.
/// Once it returns `None` (or an error) it stays finished.
pub struct BitstreamCursor {
    repo: Arc<dyn MetadataRepository>,
    criteria: SelectionCriteria,
    page_size: usize,
    buffer: VecDeque<MostRecentChecksum>,
    last_id: Option<u64>,
    exhausted: bool,
}

impl BitstreamCursor {
    fn fill(&mut self) -> CheckerResult<()> {
        let page = self.repo.status_page_after(self.last_id, self.page_size)?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.last_id = Some(last.bitstream_id);
        }
        self.buffer.extend(page);
        Ok(())
    }

    fn in_scope(&self, bitstream_id: u64) -> CheckerResult<bool> {
        match &self.criteria.root {
            Some(root) => Ok(scope::contains(
                self.repo.as_ref(),
                root,
                DsoRef::bitstream(bitstream_id),
            )?),
            None => Ok(true),
        }
    }
}

impl Iterator for BitstreamCursor {
    type Item = CheckerResult<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.buffer.is_empty() {
                if self.exhausted {
                    return None;
                }
                if let Err(e) = self.fill() {
                    self.exhausted = true;
                    self.buffer.clear();
                    return Some(Err(e));
                }
                continue;
            }

            let record = self.buffer.pop_front()?;
            if !self.criteria.matches(&record) {
                continue;
            }
            match self.in_scope(record.bitstream_id) {
                Ok(true) => return Some(Ok(record.bitstream_id)),
                Ok(false) => continue,
                Err(e) => {
                    self.exhausted = true;
                    self.buffer.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for BitstreamCursor {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ChecksumStorage, StorageError, StorageResult};
    use shared::{
        BitstreamInfo, ChecksumHistory, ChecksumHistoryCreate, DsoRecord, DsoType,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn status(id: u64, result: Option<ChecksumResult>, end: Option<i64>) -> MostRecentChecksum {
        MostRecentChecksum {
            bitstream_id: id,
            checksum_algorithm: "MD5".to_string(),
            expected_checksum: "abc".to_string(),
            current_checksum: None,
            result,
            process_start_date: end,
            process_end_date: end,
            to_be_processed: true,
            marked_deleted: false,
        }
    }

    fn seeded(records: &[MostRecentChecksum]) -> Arc<ChecksumStorage> {
        let storage = ChecksumStorage::open_in_memory().unwrap();
        for record in records {
            storage.upsert_current_status(record).unwrap();
        }
        Arc::new(storage)
    }

    fn collect(filter: &SelectionFilter, criteria: &SelectionCriteria) -> Vec<u64> {
        filter
            .select(criteria)
            .unwrap()
            .collect::<CheckerResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_flags_conflicts() {
        let both = SelectionFlags {
            include_result: Some("MATCH".into()),
            exclude_results: Some("NOT_FOUND".into()),
            ..Default::default()
        };
        assert!(SelectionCriteria::from_flags(&both).unwrap_err().is_configuration());

        let loop_and_exclude = SelectionFlags {
            exclude_results: Some("NOT_FOUND".into()),
            use_default_excludes: true,
            ..Default::default()
        };
        assert!(SelectionCriteria::from_flags(&loop_and_exclude).is_err());

        let loop_and_include = SelectionFlags {
            include_result: Some("MATCH".into()),
            use_default_excludes: true,
            ..Default::default()
        };
        assert!(SelectionCriteria::from_flags(&loop_and_include).is_err());
    }

    #[test]
    fn test_flags_parse_results_and_dates() {
        let flags = SelectionFlags {
            exclude_results: Some("not_found, CHECKSUM_NO_MATCH".into()),
            before: Some("2/20/2013".into()),
            ..Default::default()
        };
        let criteria = SelectionCriteria::from_flags(&flags).unwrap();
        let exclude = criteria.exclude.unwrap();
        assert!(exclude.contains(&ChecksumResult::NotFound));
        assert!(exclude.contains(&ChecksumResult::NoMatch));
        assert_eq!(exclude.len(), 2);
        assert!(criteria.before.is_some());

        let unknown = SelectionFlags {
            include_result: Some("BROKEN".into()),
            ..Default::default()
        };
        let err = SelectionCriteria::from_flags(&unknown).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::UnknownResult);
    }

    #[test]
    fn test_loop_flag_uses_default_excludes() {
        let flags = SelectionFlags {
            use_default_excludes: true,
            ..Default::default()
        };
        assert_eq!(
            SelectionCriteria::from_flags(&flags).unwrap(),
            SelectionCriteria::default_excludes()
        );
    }

    #[test]
    fn test_matches_never_processed() {
        let fresh = status(1, None, None);
        assert!(SelectionCriteria::default_excludes().matches(&fresh));
        assert!(
            SelectionCriteria {
                before: Some(10),
                after: Some(5),
                ..Default::default()
            }
            .matches(&fresh)
        );
        assert!(
            !SelectionCriteria {
                include: Some(ChecksumResult::Match),
                ..Default::default()
            }
            .matches(&fresh)
        );
    }

    #[test]
    fn test_date_bounds_are_strict() {
        let record = status(1, Some(ChecksumResult::Match), Some(100));
        let before = |b| SelectionCriteria {
            before: Some(b),
            ..Default::default()
        };
        let after = |a| SelectionCriteria {
            after: Some(a),
            ..Default::default()
        };
        assert!(before(101).matches(&record));
        assert!(!before(100).matches(&record));
        assert!(after(99).matches(&record));
        assert!(!after(100).matches(&record));
    }

    #[test]
    fn test_select_include_only() {
        let repo = seeded(&[
            status(1, Some(ChecksumResult::Match), Some(1)),
            status(2, Some(ChecksumResult::NoMatch), Some(1)),
            status(3, None, None),
            status(4, Some(ChecksumResult::NoMatch), Some(1)),
        ]);
        let filter = SelectionFilter::new(repo, 2);
        let criteria = SelectionCriteria {
            include: Some(ChecksumResult::NoMatch),
            ..Default::default()
        };
        assert_eq!(collect(&filter, &criteria), vec![2, 4]);
    }

    #[test]
    fn test_select_default_excludes_across_pages() {
        let repo = seeded(&[
            status(1, Some(ChecksumResult::NotFound), Some(1)),
            status(2, Some(ChecksumResult::Match), Some(1)),
            status(3, Some(ChecksumResult::MarkedDeleted), Some(1)),
            status(4, None, None),
            status(5, Some(ChecksumResult::AlgorithmInvalid), Some(1)),
            status(6, Some(ChecksumResult::NotProcessed), Some(1)),
        ]);
        let filter = SelectionFilter::new(repo, 2);
        assert_eq!(
            collect(&filter, &SelectionCriteria::default_excludes()),
            vec![2, 4, 6]
        );
    }

    #[test]
    fn test_select_with_scope_root() {
        let storage = ChecksumStorage::open_in_memory().unwrap();
        let item = DsoRef::new(DsoType::Item, 1);
        storage
            .register_object(&DsoRecord {
                object: item,
                handle: Some("123456789/1".into()),
                parent: None,
            })
            .unwrap();
        for (id, parent) in [(1, Some(item)), (2, None), (3, Some(item))] {
            let info = BitstreamInfo {
                bitstream_id: id,
                internal_id: id.to_string(),
                checksum: String::new(),
                checksum_algorithm: "MD5".into(),
                deleted: false,
            };
            storage.register_bitstream(&info, parent).unwrap();
        }
        storage.reconcile_missing().unwrap();

        let filter = SelectionFilter::new(Arc::new(storage), 10);
        let criteria = SelectionCriteria::default().with_root(item);
        assert_eq!(collect(&filter, &criteria), vec![1, 3]);

        let single = SelectionCriteria::default().with_root(DsoRef::bitstream(2));
        assert_eq!(collect(&filter, &single), vec![2]);
    }

    /// Counts every repository call; pages always fail
    #[derive(Default)]
    struct CountingRepository {
        calls: AtomicUsize,
    }

    impl CountingRepository {
        fn touch(&self) -> StorageError {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StorageError::Unavailable("offline".into())
        }
    }

    impl MetadataRepository for CountingRepository {
        fn load_bitstream(&self, _: u64) -> StorageResult<Option<BitstreamInfo>> {
            Err(self.touch())
        }
        fn load_current_status(&self, _: u64) -> StorageResult<Option<MostRecentChecksum>> {
            Err(self.touch())
        }
        fn upsert_current_status(&self, _: &MostRecentChecksum) -> StorageResult<()> {
            Err(self.touch())
        }
        fn append_history(&self, _: ChecksumHistoryCreate) -> StorageResult<ChecksumHistory> {
            Err(self.touch())
        }
        fn history_for(&self, _: u64) -> StorageResult<Vec<ChecksumHistory>> {
            Err(self.touch())
        }
        fn status_page_after(
            &self,
            _: Option<u64>,
            _: usize,
        ) -> StorageResult<Vec<MostRecentChecksum>> {
            Err(self.touch())
        }
        fn reconcile_missing(&self) -> StorageResult<usize> {
            Err(self.touch())
        }
        fn find_object(&self, _: &DsoRef) -> StorageResult<Option<DsoRecord>> {
            Err(self.touch())
        }
        fn find_by_handle(&self, _: &str) -> StorageResult<Option<DsoRecord>> {
            Err(self.touch())
        }
    }

    #[test]
    fn test_conflicting_criteria_fail_before_storage_access() {
        let repo = Arc::new(CountingRepository::default());
        let filter = SelectionFilter::new(repo.clone(), 10);
        let criteria = SelectionCriteria {
            include: Some(ChecksumResult::Match),
            exclude: Some([ChecksumResult::NotFound].into_iter().collect()),
            ..Default::default()
        };

        let err = filter.select(&criteria).err().unwrap();
        assert!(err.is_configuration());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cursor_is_lazy_and_stops_after_error() {
        let repo = Arc::new(CountingRepository::default());
        let filter = SelectionFilter::new(repo.clone(), 10);

        let mut cursor = filter.select(&SelectionCriteria::default()).unwrap();
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);

        assert!(matches!(cursor.next(), Some(Err(CheckerError::Storage(_)))));
        assert!(cursor.next().is_none());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_display_lists_criteria() {
        let criteria = SelectionCriteria::default_excludes().with_root(DsoRef::new(DsoType::Item, 3));
        let text = criteria.to_string();
        assert!(text.contains("include=-"));
        assert!(text.contains(
            "exclude=[BITSTREAM_NOT_FOUND,BITSTREAM_MARKED_DELETED,CHECKSUM_ALGORITHM_INVALID]"
        ));
        assert!(text.contains("root=ITEM.3"));
    }
}
