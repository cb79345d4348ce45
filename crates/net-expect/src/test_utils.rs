//! Test utilities for net-expect.
//!
//! Builders for observed traffic and registrations, plus assertion helpers
//! for outcomes. Enabled in this crate's own tests and, for downstream
//! crates, by the `test-utils` feature.

mod assertions;
mod builders;

pub use assertions::{OutcomeAssertions, assert_outcome_success};
pub use builders::{CriteriaBuilder, ExchangeBuilder};
