//! Expectation matching module.
//!
//! This module provides the match criteria an expectation is registered
//! with, their compiled form, a shared regex cache, and the pure matcher that
//! tests an observed exchange against compiled criteria.

mod cache;
mod criteria;
mod matcher;
mod pattern;

pub use cache::{CacheStats, DEFAULT_CACHE_SIZE, RegexCache};
pub use criteria::{
    CompiledCriteria, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, MatchCriteria, NewExpectation,
    validate_timeout,
};
pub use matcher::{MatchMiss, check, check_request, matches, request_matches, status_matches};
pub use pattern::CompiledRegex;
