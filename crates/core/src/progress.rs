//! Per-session progress maps and the read-side progress estimate.
//!
//! The progress map is sparse: a missing code means "unknown", not zero.
//! Only the worker writes measured progress. When nothing has been
//! measured, readers may show an [`ProgressEstimate`] computed from
//! elapsed time; estimates are never written back to the ledger.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoreError;

/// Session code -> completion percentage in `[0, 100]`.
pub type ProgressMap = BTreeMap<String, u8>;

/// Upper bound for a progress percentage.
pub const MAX_PERCENT: u8 = 100;

/// Assumed wall-clock time to ingest one session, used by the estimate.
pub const DEFAULT_SECS_PER_SESSION: u64 = 90;

/// Estimates never claim completion; only the worker can.
const MAX_ESTIMATE_PERCENT: u8 = 99;

/// Validate a reported percentage.
pub fn validate_percent(percent: i64) -> Result<u8, CoreError> {
    if !(0..=MAX_PERCENT as i64).contains(&percent) {
        return Err(CoreError::Validation(format!(
            "Progress must be between 0 and {MAX_PERCENT}, got {percent}"
        )));
    }
    Ok(percent as u8)
}

/// Record `percent` for `code`, overwriting any previous value.
pub fn merge_progress(map: &mut ProgressMap, code: &str, percent: u8) {
    map.insert(code.to_string(), percent.min(MAX_PERCENT));
}

/// Mark every requested code as complete.
pub fn complete_all(map: &mut ProgressMap, requested: &[String]) {
    for code in requested {
        map.insert(code.clone(), MAX_PERCENT);
    }
}

/// A time-based guess at job progress. Always tagged as an estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEstimate {
    /// Always `"estimate"` so clients can tell it apart from measurements.
    pub kind: &'static str,
    pub percent: u8,
    pub elapsed_secs: u64,
    pub assumed_secs_per_session: u64,
}

/// Estimate progress from elapsed time against an assumed per-session
/// duration. Capped below 100.
pub fn estimate_progress(
    elapsed_secs: u64,
    session_count: usize,
    secs_per_session: u64,
) -> ProgressEstimate {
    let expected = secs_per_session.saturating_mul(session_count.max(1) as u64).max(1);
    let raw = elapsed_secs.saturating_mul(100) / expected;
    ProgressEstimate {
        kind: "estimate",
        percent: raw.min(u64::from(MAX_ESTIMATE_PERCENT)) as u8,
        elapsed_secs,
        assumed_secs_per_session: secs_per_session,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_bounds() {
        assert_eq!(validate_percent(0).unwrap(), 0);
        assert_eq!(validate_percent(100).unwrap(), 100);
        assert!(validate_percent(101).is_err());
        assert!(validate_percent(-1).is_err());
    }

    #[test]
    fn merge_overwrites_single_code() {
        let mut map = ProgressMap::new();
        merge_progress(&mut map, "Q", 10);
        merge_progress(&mut map, "R", 0);
        merge_progress(&mut map, "Q", 100);
        assert_eq!(map.get("Q"), Some(&100));
        assert_eq!(map.get("R"), Some(&0));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn complete_all_fills_every_requested_code() {
        let mut map = ProgressMap::new();
        merge_progress(&mut map, "Q", 10);
        complete_all(&mut map, &["Q".to_string(), "R".to_string()]);
        assert!(map.values().all(|&p| p == 100));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn estimate_scales_with_elapsed_time() {
        let est = estimate_progress(90, 2, 90);
        assert_eq!(est.percent, 50);
        assert_eq!(est.kind, "estimate");
    }

    #[test]
    fn estimate_never_reaches_100() {
        assert_eq!(estimate_progress(10_000, 1, 90).percent, 99);
    }

    #[test]
    fn estimate_handles_zero_sessions() {
        assert_eq!(estimate_progress(45, 0, 90).percent, 50);
    }
}
