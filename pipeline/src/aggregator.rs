//! The current, capped collection of normalized listings.
//!
//! One `Aggregator` owns the `ResultSet`; display and export code only ever
//! see borrowed views or cloned snapshots.

use chrono::NaiveDate;
use common::JobRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use tracing::debug;
use url::Url;

/// Ordered listings, arrival order unless a sort has been applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<JobRecord>);

impl Deref for ResultSet {
    type Target = [JobRecord];

    fn deref(&self) -> &[JobRecord] {
        &self.0
    }
}

impl From<Vec<JobRecord>> for ResultSet {
    fn from(records: Vec<JobRecord>) -> Self {
        Self(records)
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a JobRecord;
    type IntoIter = std::slice::Iter<'a, JobRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// What a new batch of listings does to the existing aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Each fetch wholesale replaces the aggregate.
    #[default]
    Replace,
    /// New listings are appended, skipping URLs already held.
    MergeDedupByUrl,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "merge" | "merge-dedup-by-url" => Ok(Self::MergeDedupByUrl),
            other => Err(format!("unknown merge policy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Date,
    Title,
    Company,
    Location,
    ContractType,
    Salary,
    Url,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown column {0:?}")]
pub struct UnknownColumn(pub String);

impl FromStr for Column {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "posted_date" => Ok(Self::Date),
            "title" => Ok(Self::Title),
            "company" => Ok(Self::Company),
            "location" => Ok(Self::Location),
            "type" | "contract_type" => Ok(Self::ContractType),
            "salary" | "salary_display" => Ok(Self::Salary),
            "url" | "link" => Ok(Self::Url),
            _ => Err(UnknownColumn(s.to_string())),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Date => "date",
            Self::Title => "title",
            Self::Company => "company",
            Self::Location => "location",
            Self::ContractType => "contract_type",
            Self::Salary => "salary",
            Self::Url => "url",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Default)]
pub struct Aggregator {
    records: ResultSet,
    policy: MergePolicy,
    last_sort: Option<(Column, Direction)>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Applies a freshly fetched batch according to the configured policy.
    pub fn ingest(&mut self, records: Vec<JobRecord>, cap: usize) -> &ResultSet {
        match self.policy {
            MergePolicy::Replace => self.replace(records, cap),
            MergePolicy::MergeDedupByUrl => self.merge(records, cap),
        }
    }

    /// The first `cap` records, in arrival order, become the aggregate.
    pub fn replace(&mut self, mut records: Vec<JobRecord>, cap: usize) -> &ResultSet {
        records.truncate(cap);
        debug!(kept = records.len(), cap, "replacing aggregate");
        self.records = ResultSet(records);
        self.last_sort = None;
        &self.records
    }

    /// Appends incoming records after the held ones, skipping any whose
    /// non-empty URL is already held, until the aggregate holds `cap`
    /// records. Records without a URL are never treated as repeats.
    pub fn merge(&mut self, records: Vec<JobRecord>, cap: usize) -> &ResultSet {
        self.records.0.truncate(cap);
        let mut seen: HashSet<String> = self
            .records
            .iter()
            .filter(|r| !r.url.is_empty())
            .map(|r| r.url.clone())
            .collect();

        let before = self.records.len();
        for record in records {
            if self.records.len() >= cap {
                break;
            }
            if record.url.is_empty() || seen.insert(record.url.clone()) {
                self.records.0.push(record);
            }
        }
        debug!(added = self.records.len() - before, total = self.records.len(), cap, "merged into aggregate");
        self.last_sort = None;
        &self.records
    }

    pub fn current(&self) -> &ResultSet {
        &self.records
    }

    pub fn snapshot(&self) -> ResultSet {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&JobRecord> {
        self.records.get(index)
    }

    /// Validated link of the record at `index`, for "open" actions.
    pub fn link(&self, index: usize) -> Option<Url> {
        self.get(index)?.link()
    }

    pub fn clear(&mut self) {
        self.records.0.clear();
        self.last_sort = None;
    }

    /// Stable sort on one column. Sorting the same column again flips the
    /// direction; any other column starts ascending.
    pub fn sort_by(&mut self, column: Column) -> Direction {
        let direction = match self.last_sort {
            Some((last, direction)) if last == column => direction.reversed(),
            _ => Direction::Ascending,
        };
        self.sort_by_keys(&[(column, direction)]);
        self.last_sort = Some((column, direction));
        direction
    }

    /// Stable sort on several keys, earlier keys taking precedence.
    pub fn sort_by_keys(&mut self, keys: &[(Column, Direction)]) {
        self.records.0.sort_by(|a, b| {
            keys.iter()
                .map(|&(column, direction)| {
                    let ordering = compare(column, a, b);
                    match direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        self.last_sort = None;
    }

    /// Records posted within `[from, to]`; a missing bound is open.
    pub fn filter_by_date(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<JobRecord> {
        within_dates(&self.records, from, to)
    }

    /// Records whose `column` contains `needle`, ignoring case. A blank
    /// needle matches everything.
    pub fn filter_by_column(&self, column: Column, needle: &str) -> Vec<JobRecord> {
        matching(&self.records, column, needle)
    }
}

pub fn within_dates(records: &[JobRecord], from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<JobRecord> {
    records
        .iter()
        .filter(|r| from.map_or(true, |from| r.posted_date >= from))
        .filter(|r| to.map_or(true, |to| r.posted_date <= to))
        .cloned()
        .collect()
}

pub fn matching(records: &[JobRecord], column: Column, needle: &str) -> Vec<JobRecord> {
    let needle = needle.trim().to_lowercase();
    records
        .iter()
        .filter(|r| needle.is_empty() || column_text(column, r).to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

fn column_text(column: Column, record: &JobRecord) -> Cow<'_, str> {
    match column {
        Column::Date => Cow::Owned(record.posted_date.to_string()),
        Column::Title => Cow::Borrowed(&record.title),
        Column::Company => Cow::Borrowed(&record.company),
        Column::Location => Cow::Borrowed(&record.location),
        Column::ContractType => Cow::Borrowed(&record.contract_type),
        Column::Salary => Cow::Borrowed(&record.salary_display),
        Column::Url => Cow::Borrowed(&record.url),
    }
}

fn compare(column: Column, a: &JobRecord, b: &JobRecord) -> Ordering {
    match column {
        Column::Date => a.posted_date.cmp(&b.posted_date),
        Column::Salary => salary_amount(&a.salary_display).cmp(&salary_amount(&b.salary_display)),
        Column::Url => a.url.cmp(&b.url),
        _ => column_text(column, a)
            .to_lowercase()
            .cmp(&column_text(column, b).to_lowercase()),
    }
}

static SALARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?)(\d{1,3}(?:,\d{3})+|\d+)").expect("salary pattern is valid")
});

/// Numeric amount behind a display such as `£80,000`; `N/A` has none.
fn salary_amount(display: &str) -> Option<i64> {
    let caps = SALARY_RE.captures(display)?;
    let digits: String = caps[2].chars().filter(|c| c.is_ascii_digit()).collect();
    let amount = digits.parse::<i64>().ok()?;
    Some(if &caps[1] == "-" { -amount } else { amount })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, date: (i32, u32, u32), salary: &str, url: &str) -> JobRecord {
        JobRecord {
            posted_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "London".to_string(),
            contract_type: "N/A".to_string(),
            salary_display: salary.to_string(),
            url: url.to_string(),
        }
    }

    fn titles(records: &[JobRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    fn five_jobs() -> Vec<JobRecord> {
        (1..=5)
            .map(|i| job(&format!("Job {i}"), (2024, 1, i), "N/A", &format!("http://jobs.test/{i}")))
            .collect()
    }

    #[test]
    fn test_replace_keeps_all_when_under_cap() {
        let mut agg = Aggregator::new();
        let set = agg.replace(five_jobs(), 50);
        assert_eq!(titles(set), ["Job 1", "Job 2", "Job 3", "Job 4", "Job 5"]);
    }

    #[test]
    fn test_replace_truncates_to_cap_in_arrival_order() {
        let mut agg = Aggregator::new();
        let set = agg.replace(five_jobs(), 3);
        assert_eq!(titles(set), ["Job 1", "Job 2", "Job 3"]);
    }

    #[test]
    fn test_replace_discards_previous_aggregate() {
        let mut agg = Aggregator::new();
        agg.replace(five_jobs(), 50);
        agg.replace(vec![job("Only", (2024, 2, 1), "N/A", "")], 50);
        assert_eq!(titles(agg.current()), ["Only"]);
    }

    #[test]
    fn test_replace_with_nothing_empties() {
        let mut agg = Aggregator::new();
        agg.replace(five_jobs(), 50);
        assert!(agg.replace(Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut agg = Aggregator::new();
        agg.replace(five_jobs(), 50);
        agg.clear();
        assert!(agg.is_empty());
        agg.clear();
        assert_eq!(agg.len(), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut agg = Aggregator::new();
        agg.replace(five_jobs(), 50);
        let snapshot = agg.snapshot();
        agg.clear();
        assert_eq!(snapshot.len(), 5);
    }

    #[test]
    fn test_merge_dedups_by_url() {
        let mut agg = Aggregator::with_policy(MergePolicy::MergeDedupByUrl);
        agg.ingest(five_jobs()[..3].to_vec(), 50);
        let mut second = five_jobs()[2..].to_vec();
        second.push(job("No link", (2024, 1, 9), "N/A", ""));
        second.push(job("No link", (2024, 1, 9), "N/A", ""));
        let set = agg.ingest(second, 50);
        assert_eq!(
            titles(set),
            ["Job 1", "Job 2", "Job 3", "Job 4", "Job 5", "No link", "No link"]
        );
    }

    #[test]
    fn test_merge_caps_total() {
        let mut agg = Aggregator::with_policy(MergePolicy::MergeDedupByUrl);
        agg.ingest(five_jobs(), 2);
        assert_eq!(titles(agg.current()), ["Job 1", "Job 2"]);
        agg.ingest(five_jobs(), 4);
        assert_eq!(titles(agg.current()), ["Job 1", "Job 2", "Job 3", "Job 4"]);
    }

    #[test]
    fn test_repeated_merges_never_exceed_cap() {
        let mut agg = Aggregator::with_policy(MergePolicy::MergeDedupByUrl);
        for batch in 0..20 {
            let records = (0..50)
                .map(|i| job("Job", (2024, 1, 1), "N/A", &format!("http://jobs.test/{batch}/{i}")))
                .collect();
            assert!(agg.ingest(records, 50).len() <= 50);
        }
        assert_eq!(agg.len(), 50);
        assert_eq!(agg.get(0).unwrap().url, "http://jobs.test/0/0");
    }

    #[test]
    fn test_ingest_defaults_to_replace() {
        let mut agg = Aggregator::new();
        assert_eq!(agg.policy(), MergePolicy::Replace);
        agg.ingest(five_jobs(), 50);
        agg.ingest(five_jobs(), 50);
        assert_eq!(agg.len(), 5);
    }

    #[test]
    fn test_sort_toggles_direction_for_same_column() {
        let mut agg = Aggregator::new();
        agg.replace(
            vec![
                job("b", (2024, 1, 1), "N/A", ""),
                job("C", (2024, 1, 2), "N/A", ""),
                job("a", (2024, 1, 3), "N/A", ""),
            ],
            10,
        );
        assert_eq!(agg.sort_by(Column::Title), Direction::Ascending);
        assert_eq!(titles(agg.current()), ["a", "b", "C"]);
        assert_eq!(agg.sort_by(Column::Title), Direction::Descending);
        assert_eq!(titles(agg.current()), ["C", "b", "a"]);
        assert_eq!(agg.sort_by(Column::Date), Direction::Ascending);
        assert_eq!(titles(agg.current()), ["b", "C", "a"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut agg = Aggregator::new();
        agg.replace(
            vec![
                job("first", (2024, 1, 2), "N/A", ""),
                job("early", (2024, 1, 1), "N/A", ""),
                job("second", (2024, 1, 2), "N/A", ""),
                job("third", (2024, 1, 2), "N/A", ""),
            ],
            10,
        );
        agg.sort_by(Column::Date);
        assert_eq!(titles(agg.current()), ["early", "first", "second", "third"]);
        agg.sort_by(Column::Date);
        assert_eq!(titles(agg.current()), ["first", "second", "third", "early"]);
    }

    #[test]
    fn test_salary_sorts_numerically() {
        let mut agg = Aggregator::new();
        agg.replace(
            vec![
                job("high", (2024, 1, 1), "£100,000", ""),
                job("none", (2024, 1, 1), "N/A", ""),
                job("low", (2024, 1, 1), "£9,500", ""),
                job("mid", (2024, 1, 1), "£80,000", ""),
            ],
            10,
        );
        agg.sort_by(Column::Salary);
        assert_eq!(titles(agg.current()), ["none", "low", "mid", "high"]);
    }

    #[test]
    fn test_multi_key_sort() {
        let mut agg = Aggregator::new();
        agg.replace(
            vec![
                job("a", (2024, 1, 1), "£10", ""),
                job("b", (2024, 1, 2), "£10", ""),
                job("c", (2024, 1, 1), "£20", ""),
            ],
            10,
        );
        agg.sort_by_keys(&[
            (Column::Salary, Direction::Descending),
            (Column::Date, Direction::Descending),
        ]);
        assert_eq!(titles(agg.current()), ["c", "b", "a"]);
    }

    #[test]
    fn test_new_fetch_resets_sort_toggle() {
        let mut agg = Aggregator::new();
        agg.replace(five_jobs(), 10);
        agg.sort_by(Column::Title);
        agg.replace(five_jobs(), 10);
        assert_eq!(agg.sort_by(Column::Title), Direction::Ascending);
    }

    #[test]
    fn test_filter_by_date_is_inclusive() {
        let mut agg = Aggregator::new();
        agg.replace(five_jobs(), 10);
        let from = NaiveDate::from_ymd_opt(2024, 1, 2);
        let to = NaiveDate::from_ymd_opt(2024, 1, 4);
        assert_eq!(titles(&agg.filter_by_date(from, to)), ["Job 2", "Job 3", "Job 4"]);
        assert_eq!(titles(&agg.filter_by_date(None, from)), ["Job 1", "Job 2"]);
        assert_eq!(agg.filter_by_date(None, None).len(), 5);
        assert!(agg.filter_by_date(to, from).is_empty());
        assert_eq!(agg.len(), 5);
    }

    #[test]
    fn test_filter_by_column_ignores_case() {
        let mut agg = Aggregator::new();
        agg.replace(
            vec![
                job("Senior Rust Engineer", (2024, 1, 1), "N/A", ""),
                job("Python Developer", (2024, 1, 1), "N/A", ""),
                job("rust intern", (2024, 1, 1), "N/A", ""),
            ],
            10,
        );
        assert_eq!(
            titles(&agg.filter_by_column(Column::Title, "RUST")),
            ["Senior Rust Engineer", "rust intern"]
        );
        assert_eq!(agg.filter_by_column(Column::Title, "  ").len(), 3);
        assert_eq!(agg.filter_by_column(Column::Date, "2024-01").len(), 3);
    }

    #[test]
    fn test_link_only_for_valid_urls() {
        let mut agg = Aggregator::new();
        agg.replace(vec![job("a", (2024, 1, 1), "N/A", "https://jobs.test/a"), job("b", (2024, 1, 1), "N/A", "")], 10);
        assert_eq!(agg.link(0).unwrap().as_str(), "https://jobs.test/a");
        assert!(agg.link(1).is_none());
        assert!(agg.link(7).is_none());
    }

    #[test]
    fn test_column_parsing() {
        assert_eq!("Salary".parse::<Column>(), Ok(Column::Salary));
        assert_eq!("type".parse::<Column>(), Ok(Column::ContractType));
        assert_eq!("link".parse::<Column>(), Ok(Column::Url));
        assert_eq!("bogus".parse::<Column>(), Err(UnknownColumn("bogus".to_string())));
        assert_eq!(Column::ContractType.to_string().parse::<Column>(), Ok(Column::ContractType));
    }

    #[test]
    fn test_salary_amount_extraction() {
        assert_eq!(salary_amount("£80,000"), Some(80000));
        assert_eq!(salary_amount("$950"), Some(950));
        assert_eq!(salary_amount("£-1,500"), Some(-1500));
        assert_eq!(salary_amount("N/A"), None);
    }

    #[test]
    fn test_result_set_serializes_as_array() {
        let set = ResultSet::from(five_jobs()[..1].to_vec());
        let json = serde_json::to_value(&set).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["title"], "Job 1");
    }
}
