use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a data point fails the structural integrity check.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("patch field is empty")]
    EmptyPatch,
    #[error("no test cases in FAIL_TO_PASS or PASS_TO_PASS")]
    NoTestCases,
    #[error("{field} is not a JSON list of test names: {source}")]
    BadTestList {
        field: &'static str,
        source: serde_json::Error,
    },
}

/// One benchmark data point as stored on disk.
///
/// All six fields are mandatory. The two test-list fields arrive
/// double-encoded (a JSON array literal stored as a string) and are kept
/// verbatim; [`parse_test_list`] decodes them at the point of use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub instance_id: String,
    pub repo: String,
    pub base_commit: String,
    pub patch: String,
    #[serde(rename = "FAIL_TO_PASS")]
    pub fail_to_pass: String,
    #[serde(rename = "PASS_TO_PASS")]
    pub pass_to_pass: String,
}

impl DataPoint {
    /// Tests expected to flip from failing to passing under the patch.
    pub fn fail_to_pass_tests(&self) -> Result<Vec<String>, serde_json::Error> {
        parse_test_list(&self.fail_to_pass)
    }

    /// Tests expected to keep passing under the patch.
    pub fn pass_to_pass_tests(&self) -> Result<Vec<String>, serde_json::Error> {
        parse_test_list(&self.pass_to_pass)
    }

    /// Structural integrity check. A data point that fails here must not
    /// reach the rest of the pipeline.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        if self.patch.trim().is_empty() {
            return Err(IntegrityError::EmptyPatch);
        }

        let failing = self
            .fail_to_pass_tests()
            .map_err(|source| IntegrityError::BadTestList {
                field: "FAIL_TO_PASS",
                source,
            })?;
        let passing = self
            .pass_to_pass_tests()
            .map_err(|source| IntegrityError::BadTestList {
                field: "PASS_TO_PASS",
                source,
            })?;

        if failing.is_empty() && passing.is_empty() {
            return Err(IntegrityError::NoTestCases);
        }

        Ok(())
    }
}

/// Decode a test-list field. Blank text counts as the empty list; anything
/// else must be a JSON array of test names.
pub fn parse_test_list(raw: &str) -> Result<Vec<String>, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> DataPoint {
        DataPoint {
            instance_id: "astropy__astropy-12907".to_string(),
            repo: "astropy/astropy".to_string(),
            base_commit: "d16bfe05a744909de4b27f5875fe0d4ed41ce607".to_string(),
            patch: "diff --git a/astropy/modeling/separable.py b/astropy/modeling/separable.py"
                .to_string(),
            fail_to_pass: r#"["test_separable[compound_model6-result6]"]"#.to_string(),
            pass_to_pass: r#"["test_coord_matrix", "test_cdot"]"#.to_string(),
        }
    }

    #[test]
    fn test_parse_test_list_array() {
        let tests = parse_test_list(r#"["test_a", "test_b"]"#).unwrap();
        assert_eq!(tests, vec!["test_a", "test_b"]);
    }

    #[test]
    fn test_parse_test_list_blank_is_empty() {
        assert!(parse_test_list("").unwrap().is_empty());
        assert!(parse_test_list("   ").unwrap().is_empty());
        assert!(parse_test_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_test_list_rejects_non_array() {
        assert!(parse_test_list("not json").is_err());
        assert!(parse_test_list(r#"{"test_a": true}"#).is_err());
    }

    #[test]
    fn test_deserialize_uppercase_test_list_keys() {
        let json = r#"{
            "instance_id": "X",
            "repo": "r",
            "base_commit": "c",
            "patch": "diff",
            "FAIL_TO_PASS": "[\"t1\"]",
            "PASS_TO_PASS": "[]"
        }"#;
        let record: DataPoint = serde_json::from_str(json).unwrap();
        assert_eq!(record.instance_id, "X");
        assert_eq!(record.fail_to_pass, r#"["t1"]"#);
        assert_eq!(record.fail_to_pass_tests().unwrap(), vec!["t1"]);
        assert!(record.pass_to_pass_tests().unwrap().is_empty());
    }

    #[test]
    fn test_deserialize_rejects_missing_field() {
        let json = r#"{
            "instance_id": "X",
            "repo": "r",
            "base_commit": "c",
            "patch": "diff",
            "FAIL_TO_PASS": "[\"t1\"]"
        }"#;
        let err = serde_json::from_str::<DataPoint>(json).unwrap_err();
        assert!(err.to_string().contains("PASS_TO_PASS"));
    }

    #[test]
    fn test_validate_accepts_complete_record() {
        assert!(sample_record().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_patch() {
        let mut record = sample_record();
        record.patch = "  \n ".to_string();
        assert!(matches!(record.validate(), Err(IntegrityError::EmptyPatch)));
    }

    #[test]
    fn test_validate_rejects_empty_test_lists() {
        let mut record = sample_record();
        record.fail_to_pass = "[]".to_string();
        record.pass_to_pass = String::new();
        assert!(matches!(record.validate(), Err(IntegrityError::NoTestCases)));
    }

    #[test]
    fn test_validate_rejects_unparseable_test_list() {
        let mut record = sample_record();
        record.pass_to_pass = "not a list".to_string();
        match record.validate() {
            Err(IntegrityError::BadTestList { field, .. }) => assert_eq!(field, "PASS_TO_PASS"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
