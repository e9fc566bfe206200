//! End-to-end pipeline tests against the in-memory store.

use chrono::NaiveDate;
use regex::Regex;
use studentseed_core::generate::synthesize::SynthesisOptions;
use studentseed_core::pipeline::{
    bulk_insert, generate_and_insert, prepare_batch, GenerationRequest, GenerationSettings,
};
use studentseed_core::sample::pools::{
    default_birth_window, default_enrollment_window, FallbackPools, PoolOptions, PoolSource,
};
use studentseed_core::StudentSeedError;
use studentseed_testutil::{reference_records, sparse_reference_records, MemoryStore};

fn settings(seed: u64) -> GenerationSettings {
    GenerationSettings {
        pool_options: PoolOptions {
            today: NaiveDate::from_ymd_opt(2025, 6, 1),
            ..PoolOptions::default()
        },
        synthesis: SynthesisOptions {
            seed: Some(seed),
            ..SynthesisOptions::default()
        },
        ..GenerationSettings::default()
    }
}

#[tokio::test]
async fn test_empty_store_inserts_requested_count() {
    let store = MemoryStore::new();
    let request = GenerationRequest { samples: 5, limit: 100 };
    let report = generate_and_insert(&store, request, &settings(1)).await.unwrap();

    assert_eq!(report.reference_rows, 0);
    assert_eq!(report.inserted_ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(store.len(), 5);

    let fallback = FallbackPools::default();
    let options = settings(1).pool_options;
    let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let birth = default_birth_window(today, &options);
    let enrollment = default_enrollment_window(today, &options);
    for row in store.rows() {
        assert!(fallback.first_names.contains(&row.first_name));
        assert!(fallback.last_names.contains(&row.last_name));
        assert!(fallback.statuses.contains(&row.status));

        let gender = row.gender.as_ref().unwrap();
        assert!(fallback.genders.contains(gender), "{}", gender);
        assert!(birth.contains(row.date_of_birth.unwrap()));
        assert!(enrollment.contains(row.enrollment_date));
    }
}

#[tokio::test]
async fn test_insert_failure_persists_nothing() {
    let store = MemoryStore::with_records(reference_records(8));
    store.fail_inserts(true);

    let request = GenerationRequest { samples: 5, limit: 100 };
    let report = generate_and_insert(&store, request, &settings(2)).await.unwrap();

    assert_eq!(report.generated, 5);
    assert!(report.inserted_ids.is_empty());
    assert!(!report.inserted());
    assert_eq!(store.len(), 8);
}

#[tokio::test]
async fn test_unreachable_store_is_an_error() {
    let store = MemoryStore::new();
    store.fail_loads(true);

    let request = GenerationRequest { samples: 5, limit: 5 };
    let err = generate_and_insert(&store, request, &settings(3))
        .await
        .unwrap_err();
    assert!(matches!(err, StudentSeedError::Connection { .. }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_sparse_names_come_only_from_fallback() {
    let store = MemoryStore::with_records(sparse_reference_records(20));
    let request = GenerationRequest { samples: 50, limit: 20 };
    let report = generate_and_insert(&store, request, &settings(4)).await.unwrap();

    assert_eq!(report.sources.first_names, PoolSource::Fallback);
    assert_eq!(report.sources.last_names, PoolSource::Fallback);

    let fallback = FallbackPools::default();
    for row in store.rows().into_iter().skip(20) {
        assert!(fallback.first_names.contains(&row.first_name), "{}", row.first_name);
        assert!(fallback.last_names.contains(&row.last_name), "{}", row.last_name);
    }
}

#[tokio::test]
async fn test_rich_sample_reuses_observed_values() {
    let reference = reference_records(10);
    let store = MemoryStore::with_records(reference.clone());
    let request = GenerationRequest { samples: 40, limit: 10 };
    let report = generate_and_insert(&store, request, &settings(5)).await.unwrap();
    assert_eq!(report.sources.first_names, PoolSource::Observed);
    assert_eq!(report.sources.birth_dates, PoolSource::Observed);

    let min_dob = reference.iter().filter_map(|r| r.date_of_birth).min().unwrap();
    let max_dob = reference.iter().filter_map(|r| r.date_of_birth).max().unwrap();
    for row in store.rows().into_iter().skip(10) {
        assert!(reference.iter().any(|r| r.first_name == row.first_name));
        let dob = row.date_of_birth.unwrap();
        assert!(min_dob <= dob && dob <= max_dob);
    }
}

#[tokio::test]
async fn test_emails_are_well_formed_and_unique() {
    let store = MemoryStore::new();
    let (_, _, records) = prepare_batch(
        &store,
        GenerationRequest { samples: 500, limit: 10 },
        &settings(6),
    )
    .await
    .unwrap();

    let pattern =
        Regex::new(r"^[\p{Ll}]+\.[\p{Ll}]+[0-9]{3,4}@(gmail\.com|hotmail\.com|yahoo\.com|mail\.ee)$")
            .unwrap();
    let phone = Regex::new(r"^\+372[5-9][0-9]{6}$").unwrap();
    for record in &records {
        assert!(pattern.is_match(&record.email), "bad email {}", record.email);
        assert!(phone.is_match(&record.phone), "bad phone {}", record.phone);
        let local = format!(
            "{}.{}",
            record.first_name.to_lowercase(),
            record.last_name.to_lowercase()
        );
        assert!(record.email.starts_with(&local));
    }

    let ids = bulk_insert(&store, &records).await;
    assert_eq!(ids.len(), 500);
}

#[tokio::test]
async fn test_bulk_insert_of_nothing_returns_nothing() {
    let store = MemoryStore::new();
    assert!(bulk_insert(&store, &[]).await.is_empty());
}
