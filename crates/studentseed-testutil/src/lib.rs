use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{Duration, NaiveDate};
use studentseed_core::error::{Result, StudentSeedError};
use studentseed_core::record::{NewStudent, StudentRecord, StudentStatus};
use studentseed_core::store::StudentStore;

/// In-memory student store with failure injection.
///
/// Mirrors the database stores: ids are assigned sequentially from 1,
/// reference rows come back ordered by id, and a failed batch leaves no rows
/// behind. Emails are unique, like the `students.email` constraint.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StudentRecord>>,
    fail_loads: AtomicBool,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `records`, ids kept as given.
    pub fn with_records(records: Vec<StudentRecord>) -> Self {
        let store = Self::default();
        *store.lock() = records;
        store
    }

    /// Make every subsequent `load_reference` fail.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `insert_batch` fail.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all stored rows.
    pub fn rows(&self) -> Vec<StudentRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StudentRecord>> {
        // A poisoned lock only means a test panicked mid-insert.
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn injected(kind: &str) -> sqlx::Error {
        sqlx::Error::Protocol(format!("injected {} failure", kind))
    }
}

impl StudentStore for MemoryStore {
    async fn load_reference(&self, limit: u64) -> Result<Vec<StudentRecord>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StudentSeedError::Connection {
                message: "Memory store is unreachable".to_string(),
                connection_hint: "memory://".to_string(),
                source: Self::injected("load"),
            });
        }
        let mut rows = self.rows();
        rows.sort_by_key(|r| r.id);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn insert_batch(&self, records: &[NewStudent]) -> Result<Vec<i64>> {
        let fail = |message: String, source| StudentSeedError::InsertFailed {
            row_count: records.len(),
            message,
            sql_preview: "memory insert".to_string(),
            source,
        };

        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(fail(
                "Injected insert failure".to_string(),
                Self::injected("insert"),
            ));
        }

        let mut rows = self.lock();
        let mut emails: HashSet<String> = rows.iter().map(|r| r.email.clone()).collect();
        if let Some(dup) = records.iter().find(|r| !emails.insert(r.email.clone())) {
            return Err(fail(
                format!("duplicate email '{}'", dup.email),
                Self::injected("unique constraint"),
            ));
        }

        let mut next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            rows.push(persisted(next_id, record));
            ids.push(next_id);
            next_id += 1;
        }
        Ok(ids)
    }
}

fn persisted(id: i64, record: &NewStudent) -> StudentRecord {
    StudentRecord {
        id,
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        email: record.email.clone(),
        phone: Some(record.phone.clone()),
        date_of_birth: Some(record.date_of_birth),
        gender: record.gender.clone(),
        enrollment_date: record.enrollment_date,
        status: record.status,
        created_at: Some(record.created_at),
        updated_at: Some(record.updated_at),
    }
}

/// A single reference row with plausible defaults.
pub fn student_record(id: i64, first_name: &str, last_name: &str) -> StudentRecord {
    let base_dob = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
    let base_enroll = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap_or_default();
    StudentRecord {
        id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!(
            "{}.{}{}@mail.ee",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            100 + id
        ),
        phone: Some(format!("+372{}", 5_000_000 + id)),
        date_of_birth: Some(base_dob + Duration::days(id * 37)),
        gender: Some(if id % 2 == 0 { "female" } else { "male" }.to_string()),
        enrollment_date: base_enroll + Duration::days(id * 11),
        status: match id % 3 {
            0 => StudentStatus::Graduated,
            1 => StudentStatus::Active,
            _ => StudentStatus::Inactive,
        },
        created_at: None,
        updated_at: None,
    }
}

/// `count` reference rows with distinct first and last names, enough to
/// clear the default name threshold.
pub fn reference_records(count: usize) -> Vec<StudentRecord> {
    const FIRST: &[&str] = &[
        "Aino", "Brita", "Carl", "Dmitri", "Elsa", "Frida", "Georg", "Hanna", "Ivo", "Jana",
    ];
    const LAST: &[&str] = &[
        "Aavik", "Berg", "Calder", "Dahl", "Eller", "Fuchs", "Grau", "Hein", "Ivask", "Jogi",
    ];
    (0..count)
        .map(|i| {
            let id = i as i64 + 1;
            student_record(id, FIRST[i % FIRST.len()], LAST[(i * 3) % LAST.len()])
        })
        .collect()
}

/// Reference rows that all share two first names and one last name.
pub fn sparse_reference_records(count: usize) -> Vec<StudentRecord> {
    (0..count)
        .map(|i| {
            let first = if i % 2 == 0 { "Ada" } else { "Ben" };
            student_record(i as i64 + 1, first, "Ames")
        })
        .collect()
}
