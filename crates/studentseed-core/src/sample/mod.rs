//! # Reference Sampling
//!
//! Reduces a handful of existing student rows to per-field candidate pools:
//! distinct names and categoricals, plus min/max date windows. Sparse or
//! empty samples fall back to configured lists and default windows, so
//! derivation never fails.

pub mod pools;
