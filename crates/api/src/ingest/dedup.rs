//! Point-in-time check of which requested sessions are already stored.

use std::sync::Arc;

use pitwall_core::error::CoreError;
use pitwall_core::ingest::WeekendTarget;
use pitwall_core::session_codes::compute_missing;
use pitwall_db::ledger::SessionCatalog;

use crate::error::AppResult;

/// Outcome of a dedup check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupResult {
    /// Every code storage already holds for the weekend.
    pub existing: Vec<String>,
    /// Requested codes not yet present, in request order.
    pub missing: Vec<String>,
}

impl DedupResult {
    /// Nothing to ingest; the caller must not create a job.
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct DedupChecker {
    catalog: Arc<dyn SessionCatalog>,
}

impl DedupChecker {
    pub fn new(catalog: Arc<dyn SessionCatalog>) -> Self {
        Self { catalog }
    }

    /// Compare `requested` against stored sessions for `target`.
    ///
    /// Reads without locking, so two concurrent callers can both see the
    /// same codes as missing.
    pub async fn compute_missing(
        &self,
        target: WeekendTarget,
        requested: &[String],
    ) -> AppResult<DedupResult> {
        if requested.is_empty() {
            return Err(CoreError::Validation("At least one session code is required".into()).into());
        }

        let existing = self.catalog.existing_codes(target).await?;
        let missing = compute_missing(requested, &existing);

        tracing::debug!(
            season = target.season,
            round = target.round,
            existing = existing.len(),
            missing = missing.len(),
            "Dedup check complete",
        );

        Ok(DedupResult { existing, missing })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pitwall_db::memory::MemorySessionCatalog;

    use super::*;
    use crate::error::AppError;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn returns_only_codes_not_in_storage() {
        let catalog = Arc::new(MemorySessionCatalog::new());
        let target = WeekendTarget::new(2024, 5).unwrap();
        catalog.insert(target, "Q").await;

        let checker = DedupChecker::new(catalog);
        let result = checker
            .compute_missing(target, &codes(&["Q", "R", "SQ"]))
            .await
            .unwrap();

        assert_eq!(result.existing, codes(&["Q"]));
        assert_eq!(result.missing, codes(&["R", "SQ"]));
        assert!(!result.is_satisfied());
    }

    #[tokio::test]
    async fn other_weekends_do_not_count() {
        let catalog = Arc::new(MemorySessionCatalog::new());
        catalog.insert(WeekendTarget::new(2024, 4).unwrap(), "R").await;

        let checker = DedupChecker::new(catalog);
        let result = checker
            .compute_missing(WeekendTarget::new(2024, 5).unwrap(), &codes(&["R"]))
            .await
            .unwrap();
        assert_eq!(result.missing, codes(&["R"]));
    }

    #[tokio::test]
    async fn everything_present_is_satisfied() {
        let catalog = Arc::new(MemorySessionCatalog::new());
        let target = WeekendTarget::new(2023, 1).unwrap();
        catalog.insert(target, "Q").await;
        catalog.insert(target, "R").await;
        catalog.insert(target, "FP1").await;

        let checker = DedupChecker::new(catalog);
        let result = checker.compute_missing(target, &codes(&["R", "Q"])).await.unwrap();
        assert!(result.is_satisfied());
        assert_eq!(result.existing.len(), 3);
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let checker = DedupChecker::new(Arc::new(MemorySessionCatalog::new()));
        let err = checker
            .compute_missing(WeekendTarget::new(2024, 1).unwrap(), &[])
            .await
            .unwrap_err();
        assert_matches!(err, AppError::Core(CoreError::Validation(_)));
    }
}
