use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::generate::unique::EmailTracker;
use crate::record::{NewStudent, StudentStatus};
use crate::sample::pools::{CandidatePools, DateWindow, Pool};

/// Domain used if the configured domain list is empty.
const FALLBACK_EMAIL_DOMAIN: &str = "example.com";

/// Phone numbers are `prefix` followed by `digits` random digits, the first
/// of which is 5–9 (mobile range).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneFormat {
    pub prefix: String,
    pub digits: u32,
}

impl Default for PhoneFormat {
    fn default() -> Self {
        Self {
            prefix: "+372".to_string(),
            digits: 7,
        }
    }
}

impl PhoneFormat {
    /// Inclusive numeric range of the subscriber part.
    fn subscriber_range(&self) -> (u64, u64) {
        let digits = self.digits.clamp(1, 18);
        let magnitude = 10u64.pow(digits - 1);
        (5 * magnitude, 10 * magnitude - 1)
    }

    pub fn generate(&self, rng: &mut impl Rng) -> String {
        let (low, high) = self.subscriber_range();
        format!("{}{}", self.prefix, rng.random_range(low..=high))
    }
}

/// Settings for a synthesis run that don't come from the reference sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    pub email_domains: Vec<String>,
    pub phone: PhoneFormat,
    /// Random suffix redraws on an in-batch email collision before the
    /// counter suffix takes over.
    pub max_email_retries: usize,
    /// Fixed seed for reproducible batches. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Timestamp stamped on every record. `None` uses the current UTC time.
    pub now: Option<NaiveDateTime>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            email_domains: ["gmail.com", "hotmail.com", "yahoo.com", "mail.ee"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            phone: PhoneFormat::default(),
            max_email_retries: 10,
            seed: None,
            now: None,
        }
    }
}

/// Produce `count` synthetic students from the candidate pools.
///
/// Pure: no store access. Every record in the batch gets the same
/// `created_at`/`updated_at`, and emails are unique within the batch.
pub fn synthesize(
    pools: &CandidatePools,
    count: usize,
    options: &SynthesisOptions,
) -> Vec<NewStudent> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let now = options.now.unwrap_or_else(|| Utc::now().naive_utc());
    let mut tracker = EmailTracker::new(options.max_email_retries);

    let records: Vec<NewStudent> = (0..count)
        .map(|_| synthesize_one(pools, options, now, &mut rng, &mut tracker))
        .collect();

    debug!(count = records.len(), "Synthesized student records");
    records
}

fn synthesize_one(
    pools: &CandidatePools,
    options: &SynthesisOptions,
    now: NaiveDateTime,
    rng: &mut StdRng,
    tracker: &mut EmailTracker,
) -> NewStudent {
    let first_name = pick_name(&pools.first_names, rng, |r| FirstName().fake_with_rng(r));
    let last_name = pick_name(&pools.last_names, rng, |r| LastName().fake_with_rng(r));
    let email = unique_email(&first_name, &last_name, options, rng, tracker);
    let phone = options.phone.generate(rng);
    let date_of_birth = date_in(&pools.birth_dates.window, rng);
    let enrollment_date = date_in(&pools.enrollment_dates.window, rng);
    let gender = pick(&pools.genders.values, rng).cloned();
    let status = pick(&pools.statuses.values, rng)
        .copied()
        .unwrap_or(StudentStatus::Active);

    NewStudent {
        first_name,
        last_name,
        email,
        phone,
        date_of_birth,
        gender,
        enrollment_date,
        status,
        created_at: now,
        updated_at: now,
    }
}

/// Build a batch-unique email for the given names.
///
/// Draws a random 3–4 digit suffix, redraws up to `max_retries` times on a
/// collision, then falls back to the tracker's counter suffix.
fn unique_email(
    first_name: &str,
    last_name: &str,
    options: &SynthesisOptions,
    rng: &mut StdRng,
    tracker: &mut EmailTracker,
) -> String {
    let base = format!("{}.{}", email_fragment(first_name), email_fragment(last_name));
    let domain = pick(&options.email_domains, rng)
        .map(String::as_str)
        .unwrap_or(FALLBACK_EMAIL_DOMAIN);

    for _ in 0..=tracker.max_retries {
        let suffix: u32 = rng.random_range(100..=9999);
        let candidate = format!("{}{}@{}", base, suffix, domain);
        if tracker.try_insert(&candidate) {
            return candidate;
        }
    }

    warn!(
        base = %base,
        retries = tracker.max_retries,
        "Email suffix retries exhausted, using counter suffix"
    );
    tracker.issue_with_counter(|n| format!("{}{}@{}", base, n, domain))
}

/// Lowercased name with whitespace removed, for the email local part.
pub fn email_fragment(name: &str) -> String {
    name.split_whitespace().collect::<String>().to_lowercase()
}

fn pick_name(
    pool: &Pool<String>,
    rng: &mut StdRng,
    fake: impl FnOnce(&mut StdRng) -> String,
) -> String {
    if pool.values.is_empty() {
        return fake(rng);
    }
    pool.values[rng.random_range(0..pool.values.len())].clone()
}

fn pick<'a, T>(values: &'a [T], rng: &mut impl Rng) -> Option<&'a T> {
    if values.is_empty() {
        None
    } else {
        Some(&values[rng.random_range(0..values.len())])
    }
}

/// Uniform date in the inclusive window.
fn date_in(window: &DateWindow, rng: &mut impl Rng) -> NaiveDate {
    let span = window.span_days().max(0);
    window.start + Duration::days(rng.random_range(0..=span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::pools::{DateRange, PoolSource};

    fn window(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
    }

    fn pools() -> CandidatePools {
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        CandidatePools {
            first_names: Pool {
                values: strings(&["Mari", "Jaan", "Kati"]),
                source: PoolSource::Fallback,
            },
            last_names: Pool {
                values: strings(&["Tamm", "Saar"]),
                source: PoolSource::Fallback,
            },
            genders: Pool {
                values: strings(&["male", "female"]),
                source: PoolSource::Fallback,
            },
            statuses: Pool {
                values: vec![StudentStatus::Active, StudentStatus::Graduated],
                source: PoolSource::Fallback,
            },
            birth_dates: DateRange {
                window: window((1999, 1, 1), (2005, 12, 31)),
                source: PoolSource::Fallback,
            },
            enrollment_dates: DateRange {
                window: window((2023, 9, 1), (2025, 2, 1)),
                source: PoolSource::Fallback,
            },
        }
    }

    fn seeded(seed: u64) -> SynthesisOptions {
        SynthesisOptions {
            seed: Some(seed),
            now: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0),
            ..SynthesisOptions::default()
        }
    }

    #[test]
    fn test_exact_count() {
        let p = pools();
        for count in [0, 1, 7, 250] {
            assert_eq!(synthesize(&p, count, &seeded(1)).len(), count);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let p = pools();
        let a = synthesize(&p, 20, &seeded(42));
        let b = synthesize(&p, 20, &seeded(42));
        assert_eq!(a, b);
        let c = synthesize(&p, 20, &seeded(43));
        assert_ne!(a, c);
    }

    #[test]
    fn test_values_drawn_from_pools() {
        let p = pools();
        for s in synthesize(&p, 100, &seeded(7)) {
            assert!(p.first_names.values.contains(&s.first_name));
            assert!(p.last_names.values.contains(&s.last_name));
            assert!(p.genders.values.contains(s.gender.as_ref().unwrap()));
            assert!(p.statuses.values.contains(&s.status));
            assert!(p.birth_dates.window.contains(s.date_of_birth));
            assert!(p.enrollment_dates.window.contains(s.enrollment_date));
            assert_eq!(s.created_at, s.updated_at);
        }
    }

    #[test]
    fn test_phone_format() {
        for s in synthesize(&pools(), 50, &seeded(3)) {
            let rest = s.phone.strip_prefix("+372").unwrap();
            assert_eq!(rest.len(), 7);
            assert!(rest.chars().all(|c| c.is_ascii_digit()));
            assert!(rest.as_bytes()[0] >= b'5');
        }
    }

    #[test]
    fn test_emails_unique_even_with_tiny_name_pool() {
        let mut p = pools();
        p.first_names.values = vec!["Ada".to_string()];
        p.last_names.values = vec!["Ames".to_string()];
        let opts = SynthesisOptions {
            email_domains: vec!["x.ee".to_string()],
            max_email_retries: 0,
            ..seeded(9)
        };
        // More records than the 9900 random suffixes can cover.
        let records = synthesize(&p, 10_000, &opts);
        let distinct: std::collections::HashSet<&str> =
            records.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(distinct.len(), records.len());
    }

    #[test]
    fn test_single_day_window() {
        let mut p = pools();
        p.enrollment_dates.window = window((2024, 9, 2), (2024, 9, 2));
        for s in synthesize(&p, 10, &seeded(5)) {
            assert_eq!(s.enrollment_date, NaiveDate::from_ymd_opt(2024, 9, 2).unwrap());
        }
    }

    #[test]
    fn test_empty_pools_use_defaults() {
        let mut p = pools();
        p.first_names.values.clear();
        p.genders.values.clear();
        p.statuses.values.clear();
        let opts = SynthesisOptions {
            email_domains: Vec::new(),
            ..seeded(11)
        };
        for s in synthesize(&p, 5, &opts) {
            assert!(!s.first_name.is_empty());
            assert!(s.gender.is_none());
            assert_eq!(s.status, StudentStatus::Active);
            assert!(s.email.ends_with("@example.com"));
        }
    }

    #[test]
    fn test_email_fragment() {
        assert_eq!(email_fragment("Mari Liis"), "mariliis");
        assert_eq!(email_fragment("Lõhmus"), "lõhmus");
    }

    #[test]
    fn test_phone_format_custom_length() {
        let format = PhoneFormat {
            prefix: "+1".to_string(),
            digits: 10,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let phone = format.generate(&mut rng);
        assert_eq!(phone.len(), 12);
    }
}
