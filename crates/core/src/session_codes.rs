//! Session code handling and the dedup set difference.
//!
//! Session codes are short identifiers such as `Q`, `R`, `FP1`, `SQ`.
//! Requests are normalized (trimmed, upper-cased, de-duplicated in
//! first-seen order) before they are compared with what storage holds.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Valid session code: 1-8 upper-case alphanumerics.
static SESSION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{1,8}$").expect("valid regex"));

/// Codes ingested when a request does not name any.
pub const DEFAULT_SESSION_CODES: &[&str] = &["Q", "R"];

/// Separator used when codes travel through an environment variable.
pub const CODE_SEPARATOR: char = ',';

/// Normalize a requested list of session codes.
///
/// Blank entries are dropped. The result must be non-empty and every code
/// must match `^[A-Z0-9]{1,8}$` after upper-casing.
pub fn normalize_codes<S: AsRef<str>>(codes: &[S]) -> Result<Vec<String>, CoreError> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for raw in codes {
        let code = raw.as_ref().trim().to_ascii_uppercase();
        if code.is_empty() {
            continue;
        }
        if !SESSION_CODE_RE.is_match(&code) {
            return Err(CoreError::Validation(format!(
                "Invalid session code '{}'",
                raw.as_ref().trim()
            )));
        }
        if !out.contains(&code) {
            out.push(code);
        }
    }

    if out.is_empty() {
        return Err(CoreError::Validation(
            "At least one session code is required".into(),
        ));
    }
    Ok(out)
}

/// Return the requested codes that are not present in `existing`.
///
/// Comparison is by exact code string. Order follows `requested`. No side
/// effects: this is the point-in-time dedup check.
pub fn compute_missing<S: AsRef<str>>(requested: &[String], existing: &[S]) -> Vec<String> {
    let present: HashSet<&str> = existing.iter().map(|c| c.as_ref()).collect();
    requested
        .iter()
        .filter(|code| !present.contains(code.as_str()))
        .cloned()
        .collect()
}

/// Join codes for the `SESSION_CODES` environment variable.
pub fn join_codes(codes: &[String]) -> String {
    codes.join(&CODE_SEPARATOR.to_string())
}

/// Split a comma-separated code list, dropping blanks.
pub fn split_codes(joined: &str) -> Vec<String> {
    joined
        .split(CODE_SEPARATOR)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_trims_uppercases_and_dedups() {
        let out = normalize_codes(&[" q", "R", "Q ", "", "fp1"]).unwrap();
        assert_eq!(out, codes(&["Q", "R", "FP1"]));
    }

    #[test]
    fn normalize_rejects_empty_input() {
        assert_matches!(
            normalize_codes::<&str>(&[]),
            Err(CoreError::Validation(_))
        );
        assert_matches!(normalize_codes(&["  ", ""]), Err(CoreError::Validation(_)));
    }

    #[test]
    fn normalize_rejects_malformed_codes() {
        assert_matches!(
            normalize_codes(&["Q; DROP TABLE"]),
            Err(CoreError::Validation(msg)) if msg.contains("Invalid session code")
        );
        assert!(normalize_codes(&["TOOLONGCODE"]).is_err());
    }

    #[test]
    fn missing_is_set_difference_in_request_order() {
        let requested = codes(&["Q", "R", "SQ"]);
        let missing = compute_missing(&requested, &["SQ", "Q"]);
        assert_eq!(missing, codes(&["R"]));
    }

    #[test]
    fn missing_is_empty_when_everything_exists() {
        let requested = codes(&["Q", "R"]);
        assert!(compute_missing(&requested, &["R", "Q", "FP1"]).is_empty());
    }

    #[test]
    fn missing_compares_exact_strings() {
        let requested = codes(&["FP1"]);
        assert_eq!(compute_missing(&requested, &["fp1"]), codes(&["FP1"]));
    }

    #[test]
    fn join_and_split_codes() {
        let joined = join_codes(&codes(&["Q", "R"]));
        assert_eq!(joined, "Q,R");
        assert_eq!(split_codes(" Q, ,R "), codes(&["Q", "R"]));
    }
}
