//! # Record Synthesis
//!
//! Turns candidate pools into new student records. Nothing in here touches a
//! store: [`synthesize::synthesize`] is a pure function of the pools, the
//! requested count and [`synthesize::SynthesisOptions`].

pub mod synthesize;
pub mod unique;
pub mod value;
