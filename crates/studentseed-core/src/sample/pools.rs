use chrono::{Duration, Local, NaiveDate};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{StudentRecord, StudentStatus};

/// Span used when every observed birth date is the same day.
const DEGENERATE_BIRTH_SPAN_DAYS: i64 = 365 * 5;
/// Span used when every observed enrollment date is the same day.
const DEGENERATE_ENROLLMENT_SPAN_DAYS: i64 = 365;

/// Largest `max_age` a configuration may ask for.
pub const MAX_AGE_YEARS: u32 = 150;
/// Largest `enrollment_max_days_ago` a configuration may ask for.
pub const MAX_ENROLLMENT_DAYS_AGO: u32 = 36_500;

/// Where a candidate pool's values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSource {
    /// Distinct values observed in the reference sample.
    Observed,
    /// The configured fallback list or default date window.
    Fallback,
    /// Generated per record by the `fake` locale generators (empty fallback list).
    Faker,
}

impl PoolSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolSource::Observed => "observed",
            PoolSource::Fallback => "fallback",
            PoolSource::Faker => "faker",
        }
    }
}

/// Static values used when the reference sample is empty or too sparse.
///
/// Passed explicitly into [`derive_pools`] so tests and configs can supply
/// their own lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPools {
    /// Given names. An empty list means "let `fake` generate them".
    pub first_names: Vec<String>,
    /// Family names. An empty list means "let `fake` generate them".
    pub last_names: Vec<String>,
    pub genders: Vec<String>,
    pub statuses: Vec<StudentStatus>,
}

impl Default for FallbackPools {
    fn default() -> Self {
        Self {
            first_names: to_strings(&[
                "Mari", "Jaan", "Kati", "Toomas", "Liis", "Martin", "Kadri", "Andres", "Piret",
                "Rasmus", "Triin", "Karl", "Maarja", "Mihkel", "Kristiina", "Siim", "Anu",
                "Priit", "Helen", "Tõnu",
            ]),
            last_names: to_strings(&[
                "Tamm", "Saar", "Sepp", "Mägi", "Kask", "Kukk", "Rebane", "Ilves", "Pärn",
                "Koppel", "Lepik", "Kuusk", "Oja", "Vaher", "Luik", "Kallas", "Lõhmus", "Raud",
                "Mets", "Karu",
            ]),
            genders: to_strings(&["male", "female"]),
            statuses: vec![StudentStatus::Active, StudentStatus::Inactive],
        }
    }
}

/// Knobs for pool derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolOptions {
    /// Observed names are used only if there are more distinct values than this.
    pub name_threshold: usize,
    /// Observed genders/statuses are used only if there are more distinct values than this.
    pub categorical_threshold: usize,
    /// Youngest age in the default birth window.
    pub min_age: u32,
    /// Oldest age in the default birth window.
    pub max_age: u32,
    /// Most recent enrollment in the default window, in days before today.
    pub enrollment_min_days_ago: u32,
    /// Oldest enrollment in the default window, in days before today.
    pub enrollment_max_days_ago: u32,
    /// Anchor for the default windows. `None` uses the local date at derivation time.
    pub today: Option<NaiveDate>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            name_threshold: 5,
            categorical_threshold: 0,
            min_age: 18,
            max_age: 30,
            enrollment_min_days_ago: 30,
            enrollment_max_days_ago: 730,
            today: None,
        }
    }
}

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Number of days between start and end (0 for a single-day window).
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Min/max of the given dates, or `None` if there are none.
    pub fn observed(dates: impl IntoIterator<Item = NaiveDate>) -> Option<Self> {
        dates.into_iter().fold(None, |acc, d| match acc {
            None => Some(Self { start: d, end: d }),
            Some(w) => Some(Self {
                start: w.start.min(d),
                end: w.end.max(d),
            }),
        })
    }
}

/// A set of candidate values plus where they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pool<T> {
    pub values: Vec<T>,
    pub source: PoolSource,
}

/// A date window plus where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub window: DateWindow,
    pub source: PoolSource,
}

/// Everything the synthesizer samples from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidatePools {
    pub first_names: Pool<String>,
    pub last_names: Pool<String>,
    pub genders: Pool<String>,
    pub statuses: Pool<StudentStatus>,
    pub birth_dates: DateRange,
    pub enrollment_dates: DateRange,
}

/// Derive per-field candidate pools from a reference sample.
///
/// Never fails: sparse or empty samples fall back to `fallback` and to the
/// default date windows in `options`.
pub fn derive_pools(
    sample: &[StudentRecord],
    fallback: &FallbackPools,
    options: &PoolOptions,
) -> CandidatePools {
    let today = options.today.unwrap_or_else(|| Local::now().date_naive());

    let first_names = name_pool(
        distinct(sample.iter().map(|r| r.first_name.clone())),
        &fallback.first_names,
        options.name_threshold,
    );
    let last_names = name_pool(
        distinct(sample.iter().map(|r| r.last_name.clone())),
        &fallback.last_names,
        options.name_threshold,
    );
    let genders = categorical_pool(
        distinct(sample.iter().filter_map(|r| r.gender.clone())),
        &fallback.genders,
        options.categorical_threshold,
    );
    let statuses = categorical_pool(
        distinct(sample.iter().map(|r| r.status)),
        &fallback.statuses,
        options.categorical_threshold,
    );

    let birth_dates = date_range(
        DateWindow::observed(sample.iter().filter_map(|r| r.date_of_birth)),
        default_birth_window(today, options),
        DEGENERATE_BIRTH_SPAN_DAYS,
    );
    let enrollment_dates = date_range(
        DateWindow::observed(sample.iter().map(|r| r.enrollment_date)),
        default_enrollment_window(today, options),
        DEGENERATE_ENROLLMENT_SPAN_DAYS,
    );

    debug!(
        reference_rows = sample.len(),
        first_names = ?first_names.source,
        last_names = ?last_names.source,
        genders = ?genders.source,
        statuses = ?statuses.source,
        birth_dates = ?birth_dates.source,
        enrollment_dates = ?enrollment_dates.source,
        "Derived candidate pools"
    );

    CandidatePools {
        first_names,
        last_names,
        genders,
        statuses,
        birth_dates,
        enrollment_dates,
    }
}

/// Default birth window: ages `min_age` through `max_age` (inclusive of the
/// whole final year) counted back from `today`.
pub fn default_birth_window(today: NaiveDate, options: &PoolOptions) -> DateWindow {
    let (young, old) = if options.min_age <= options.max_age {
        (options.min_age, options.max_age)
    } else {
        (options.max_age, options.min_age)
    };
    let end = days_before(today, 365 * i64::from(young));
    let start = days_before(today, 365 * i64::from(old) + 364);
    DateWindow::new(start, end)
}

/// Default enrollment window: between `enrollment_max_days_ago` and
/// `enrollment_min_days_ago` before `today`.
pub fn default_enrollment_window(today: NaiveDate, options: &PoolOptions) -> DateWindow {
    DateWindow::new(
        days_before(today, i64::from(options.enrollment_max_days_ago)),
        days_before(today, i64::from(options.enrollment_min_days_ago)),
    )
}

/// `today - days`, clamped to the earliest representable date.
fn days_before(today: NaiveDate, days: i64) -> NaiveDate {
    today
        .checked_sub_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MIN)
}

fn date_range(observed: Option<DateWindow>, default: DateWindow, degenerate_span: i64) -> DateRange {
    match observed {
        Some(w) if w.span_days() > 0 => DateRange {
            window: w,
            source: PoolSource::Observed,
        },
        Some(w) => DateRange {
            window: DateWindow::new(
                w.start,
                w.start
                    .checked_add_signed(Duration::days(degenerate_span))
                    .unwrap_or(NaiveDate::MAX),
            ),
            source: PoolSource::Fallback,
        },
        None => DateRange {
            window: default,
            source: PoolSource::Fallback,
        },
    }
}

fn name_pool(observed: Vec<String>, fallback: &[String], threshold: usize) -> Pool<String> {
    if observed.len() > threshold {
        Pool {
            values: observed,
            source: PoolSource::Observed,
        }
    } else if fallback.is_empty() {
        Pool {
            values: Vec::new(),
            source: PoolSource::Faker,
        }
    } else {
        Pool {
            values: fallback.to_vec(),
            source: PoolSource::Fallback,
        }
    }
}

fn categorical_pool<T: Clone>(observed: Vec<T>, fallback: &[T], threshold: usize) -> Pool<T> {
    if observed.len() > threshold || (fallback.is_empty() && !observed.is_empty()) {
        Pool {
            values: observed,
            source: PoolSource::Observed,
        }
    } else {
        Pool {
            values: fallback.to_vec(),
            source: PoolSource::Fallback,
        }
    }
}

/// Distinct values in first-seen order, so seeded runs stay reproducible.
fn distinct<T: std::hash::Hash + Eq>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    values.into_iter().collect::<IndexSet<T>>().into_iter().collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn options() -> PoolOptions {
        PoolOptions {
            today: Some(today()),
            ..PoolOptions::default()
        }
    }

    fn record(id: i64, first: &str, last: &str, dob: Option<(i32, u32, u32)>) -> StudentRecord {
        StudentRecord {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}.{}@example.com", first, last),
            phone: None,
            date_of_birth: dob.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            gender: Some(if id % 2 == 0 { "female" } else { "male" }.to_string()),
            enrollment_date: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap()
                + Duration::days(id * 10),
            status: if id % 3 == 0 {
                StudentStatus::Graduated
            } else {
                StudentStatus::Active
            },
            created_at: None,
            updated_at: None,
        }
    }

    fn rich_sample() -> Vec<StudentRecord> {
        let firsts = ["Ada", "Ben", "Cleo", "Dan", "Eve", "Finn", "Gus"];
        let lasts = ["Ames", "Bell", "Cole", "Dunn", "Eads", "Fox", "Gray"];
        (0..7)
            .map(|i| {
                record(
                    i as i64 + 1,
                    firsts[i],
                    lasts[i],
                    Some((2000 + i as i32, 1 + i as u32, 1)),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_sample_uses_fallbacks() {
        let fallback = FallbackPools::default();
        let pools = derive_pools(&[], &fallback, &options());

        assert_eq!(pools.first_names.source, PoolSource::Fallback);
        assert_eq!(pools.first_names.values, fallback.first_names);
        assert_eq!(pools.last_names.values, fallback.last_names);
        assert_eq!(pools.genders.values, fallback.genders);
        assert_eq!(pools.statuses.values, fallback.statuses);
        assert_eq!(pools.birth_dates.source, PoolSource::Fallback);
        assert_eq!(
            pools.birth_dates.window,
            default_birth_window(today(), &options())
        );
        assert_eq!(
            pools.enrollment_dates.window,
            default_enrollment_window(today(), &options())
        );
    }

    #[test]
    fn test_rich_sample_uses_observed_values() {
        let pools = derive_pools(&rich_sample(), &FallbackPools::default(), &options());

        assert_eq!(pools.first_names.source, PoolSource::Observed);
        assert_eq!(pools.first_names.values.len(), 7);
        assert_eq!(pools.first_names.values[0], "Ada");
        assert_eq!(pools.genders.source, PoolSource::Observed);
        assert_eq!(pools.genders.values, vec!["male", "female"]);
        assert_eq!(
            pools.statuses.values,
            vec![StudentStatus::Active, StudentStatus::Graduated]
        );
        assert_eq!(pools.birth_dates.source, PoolSource::Observed);
        assert_eq!(
            pools.birth_dates.window,
            DateWindow::new(
                NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2006, 7, 1).unwrap()
            )
        );
    }

    #[test]
    fn test_sparse_names_fall_back() {
        let sample: Vec<StudentRecord> = (1..=10)
            .map(|i| record(i, if i % 2 == 0 { "Ada" } else { "Ben" }, "Ames", None))
            .collect();
        let fallback = FallbackPools::default();
        let pools = derive_pools(&sample, &fallback, &options());

        assert_eq!(pools.first_names.source, PoolSource::Fallback);
        assert!(!pools.first_names.values.contains(&"Ada".to_string()));
        assert_eq!(pools.last_names.source, PoolSource::Fallback);
        // Categoricals only need one distinct value by default.
        assert_eq!(pools.genders.source, PoolSource::Observed);
    }

    #[test]
    fn test_exactly_threshold_distinct_names_is_sparse() {
        let names = ["A", "B", "C", "D", "E"];
        let sample: Vec<StudentRecord> = names
            .iter()
            .enumerate()
            .map(|(i, n)| record(i as i64 + 1, n, n, None))
            .collect();
        let pools = derive_pools(&sample, &FallbackPools::default(), &options());
        assert_eq!(pools.first_names.source, PoolSource::Fallback);
    }

    #[test]
    fn test_empty_fallback_names_switch_to_faker() {
        let fallback = FallbackPools {
            first_names: Vec::new(),
            ..FallbackPools::default()
        };
        let pools = derive_pools(&[], &fallback, &options());
        assert_eq!(pools.first_names.source, PoolSource::Faker);
        assert!(pools.first_names.values.is_empty());
        assert_eq!(pools.last_names.source, PoolSource::Fallback);
    }

    #[test]
    fn test_degenerate_dates_extend_from_observed_day() {
        let sample = vec![
            record(1, "Ada", "Ames", Some((2001, 4, 4))),
            record(1, "Ben", "Bell", Some((2001, 4, 4))),
        ];
        let pools = derive_pools(&sample, &FallbackPools::default(), &options());

        let birth = pools.birth_dates;
        assert_eq!(birth.source, PoolSource::Fallback);
        assert_eq!(birth.window.start, NaiveDate::from_ymd_opt(2001, 4, 4).unwrap());
        assert_eq!(birth.window.span_days(), DEGENERATE_BIRTH_SPAN_DAYS);

        let enrollment = pools.enrollment_dates;
        assert_eq!(enrollment.source, PoolSource::Fallback);
        assert_eq!(enrollment.window.span_days(), DEGENERATE_ENROLLMENT_SPAN_DAYS);
    }

    #[test]
    fn test_missing_birth_dates_use_default_window() {
        let sample = vec![record(1, "Ada", "Ames", None), record(2, "Ben", "Bell", None)];
        let pools = derive_pools(&sample, &FallbackPools::default(), &options());
        assert_eq!(
            pools.birth_dates.window,
            default_birth_window(today(), &options())
        );
        // Enrollment dates differ, so their window is observed.
        assert_eq!(pools.enrollment_dates.source, PoolSource::Observed);
    }

    #[test]
    fn test_default_birth_window_covers_student_ages() {
        let w = default_birth_window(today(), &options());
        assert_eq!(w.end, today() - Duration::days(365 * 18));
        assert_eq!(w.start, today() - Duration::days(365 * 30 + 364));
        assert!(w.start < w.end);
    }

    #[test]
    fn test_huge_ages_clamp_instead_of_overflowing() {
        let opts = PoolOptions {
            max_age: 1_000_000,
            ..options()
        };
        let pools = derive_pools(&[], &FallbackPools::default(), &opts);
        assert_eq!(pools.birth_dates.window.start, NaiveDate::MIN);
        assert_eq!(
            pools.birth_dates.window.end,
            today() - Duration::days(365 * 18)
        );
    }

    #[test]
    fn test_huge_enrollment_window_clamps_instead_of_overflowing() {
        let opts = PoolOptions {
            enrollment_max_days_ago: 4_000_000_000,
            ..options()
        };
        let pools = derive_pools(&[], &FallbackPools::default(), &opts);
        assert_eq!(pools.enrollment_dates.window.start, NaiveDate::MIN);
        assert_eq!(pools.enrollment_dates.window.end, today() - Duration::days(30));
    }

    #[test]
    fn test_degenerate_window_near_max_date_clamps() {
        let last = record(1, "Ada", "Ames", None);
        let sample = vec![StudentRecord {
            date_of_birth: Some(NaiveDate::MAX),
            ..last
        }];
        let pools = derive_pools(&sample, &FallbackPools::default(), &options());
        assert_eq!(
            pools.birth_dates.window,
            DateWindow::new(NaiveDate::MAX, NaiveDate::MAX)
        );
    }

    #[test]
    fn test_date_window_normalizes_order() {
        let a = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let w = DateWindow::new(a, b);
        assert_eq!(w.start, b);
        assert!(w.contains(a));
        assert!(w.contains(b));
        assert_eq!(DateWindow::observed(Vec::new()), None);
    }
}
