//! Student record types.
//!
//! `StudentRecord` is a row as it exists in the store (identifier assigned).
//! `NewStudent` is a synthesized row that has not been inserted yet; it never
//! carries an identifier because only the store assigns one.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::generate::value::Value;

/// Table the records live in.
pub const STUDENTS_TABLE: &str = "students";

/// Every column a `NewStudent` can fill. The store assigns `id`.
pub const WRITABLE_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "phone",
    "date_of_birth",
    "gender",
    "enrollment_date",
    "status",
    "created_at",
    "updated_at",
];

/// Enrollment status of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
    Graduated,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Graduated => "graduated",
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StudentStatus::Active),
            "inactive" => Ok(StudentStatus::Inactive),
            "graduated" => Ok(StudentStatus::Graduated),
            other => Err(format!("unknown student status '{}'", other)),
        }
    }
}

/// A student row loaded from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub enrollment_date: NaiveDate,
    pub status: StudentStatus,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A synthesized student, ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    /// `None` when neither the sample nor the fallback offered a gender.
    pub gender: Option<String>,
    pub enrollment_date: NaiveDate,
    pub status: StudentStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewStudent {
    /// Value for a single column, or `None` if this record has no such column.
    pub fn value(&self, column: &str) -> Option<Value> {
        let value = match column {
            "first_name" => Value::String(Cow::Owned(self.first_name.clone())),
            "last_name" => Value::String(Cow::Owned(self.last_name.clone())),
            "email" => Value::String(Cow::Owned(self.email.clone())),
            "phone" => Value::String(Cow::Owned(self.phone.clone())),
            "date_of_birth" => Value::Date(self.date_of_birth),
            "gender" => match &self.gender {
                Some(g) => Value::String(Cow::Owned(g.clone())),
                None => Value::Null,
            },
            "enrollment_date" => Value::Date(self.enrollment_date),
            "status" => Value::String(Cow::Borrowed(self.status.as_str())),
            "created_at" => Value::Timestamp(self.created_at),
            "updated_at" => Value::Timestamp(self.updated_at),
            _ => return None,
        };
        Some(value)
    }

    /// Project this record onto the destination columns.
    ///
    /// Columns the record doesn't know about (including `id`) are dropped
    /// silently; the returned map keeps the caller's column order.
    pub fn to_row<S: AsRef<str>>(&self, columns: &[S]) -> IndexMap<String, Value> {
        columns
            .iter()
            .filter_map(|c| {
                let name = c.as_ref();
                self.value(name).map(|v| (name.to_string(), v))
            })
            .collect()
    }
}
