//! Machine-readable test report emitted by a test binary.
//!
//! Wire format (stdout of `<binary> --json`):
//!
//! ```json
//! {
//!   "title": "JSON Parser",
//!   "success": false,
//!   "passed": 3,
//!   "failed": 1,
//!   "infos": [ { "input": "empty object", "error": "unexpected EOF" } ]
//! }
//! ```
//!
//! `passed`, `failed` and `infos` are optional; `null` counts as absent.

use serde::{Deserialize, Deserializer, Serialize};

/// One failing test case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureInfo {
    /// Label identifying the failing input.
    pub input: String,

    /// Error message reported for it.
    pub error: String,
}

/// Parsed report of one test binary run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportDocument {
    pub title: String,

    pub success: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub passed: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub failed: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub infos: Vec<FailureInfo>,
}

impl ReportDocument {
    /// Parse a report from raw stdout.
    pub fn parse(stdout: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(stdout.trim())
    }

    /// Total number of test cases. Widened so two `u64::MAX` counts still add.
    pub fn total(&self) -> u128 {
        u128::from(self.passed) + u128::from(self.failed)
    }

    /// Name of the summary result, e.g. `"Suite (3/5)"`.
    pub fn summary_name(&self) -> String {
        format!("{} ({}/{})", self.title, self.passed, self.total())
    }

    /// Human summary of the failure count.
    pub fn summary_message(&self) -> String {
        match self.failed {
            0 => "All tests passed".to_string(),
            1 => "1 test failed".to_string(),
            n => format!("{n} tests failed"),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failing_report() {
        let doc = ReportDocument::parse(
            r#"{"title":"Suite","success":false,"passed":3,"failed":2,"infos":[{"input":"caseA","error":"boom"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.title, "Suite");
        assert!(!doc.success);
        assert_eq!(doc.total(), 5);
        assert_eq!(doc.infos.len(), 1);
        assert_eq!(doc.infos[0].input, "caseA");
    }

    #[test]
    fn test_optional_fields_default() {
        let doc = ReportDocument::parse(r#"{ "title" : "Exceptions", "success": true }"#).unwrap();
        assert_eq!(doc.passed, 0);
        assert_eq!(doc.failed, 0);
        assert!(doc.infos.is_empty());
        assert_eq!(doc.summary_name(), "Exceptions (0/0)");
    }

    #[test]
    fn test_pretty_printed_report_with_escapes() {
        let stdout = "{\n  \"title\" : \"Parser \\\"strict\\\"\",\n  \"success\": true,\n  \"passed\" : 12\n}\n";
        let doc = ReportDocument::parse(stdout).unwrap();
        assert_eq!(doc.title, "Parser \"strict\"");
        assert_eq!(doc.summary_name(), "Parser \"strict\" (12/12)");
    }

    #[test]
    fn test_summary_message_plurals() {
        let mut doc = ReportDocument::parse(r#"{"title":"T","success":true}"#).unwrap();
        assert_eq!(doc.summary_message(), "All tests passed");
        doc.failed = 1;
        assert_eq!(doc.summary_message(), "1 test failed");
        doc.failed = 7;
        assert_eq!(doc.summary_message(), "7 tests failed");
    }

    #[test]
    fn test_null_counts_treated_as_zero() {
        let doc = ReportDocument::parse(
            r#"{"title":"Nulls","success":true,"passed":null,"failed":null,"infos":null}"#,
        )
        .unwrap();
        assert_eq!(doc.passed, 0);
        assert_eq!(doc.failed, 0);
        assert!(doc.infos.is_empty());
        assert_eq!(doc.summary_name(), "Nulls (0/0)");
    }

    #[test]
    fn test_huge_counts_do_not_overflow() {
        let doc = ReportDocument::parse(
            r#"{"title":"Big","success":false,"passed":18446744073709551615,"failed":1,"infos":[]}"#,
        )
        .unwrap();
        assert_eq!(doc.total(), u128::from(u64::MAX) + 1);
        assert_eq!(
            doc.summary_name(),
            "Big (18446744073709551615/18446744073709551616)"
        );
        assert_eq!(doc.summary_message(), "1 test failed");
    }

    #[test]
    fn test_missing_title_rejected() {
        assert!(ReportDocument::parse(r#"{"success":true}"#).is_err());
        assert!(ReportDocument::parse("Segmentation fault").is_err());
        assert!(ReportDocument::parse("").is_err());
    }
}
