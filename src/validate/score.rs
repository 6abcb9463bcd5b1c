//! Quality and completeness scoring (spec §4.E), grounded in
//! `SchemaValidator._calculate_quality_score`/`_calculate_completeness_score`
//! in `original_source/scripts/validation_system.py`.

use crate::types::{IssueSeverity, ModelRecord};

/// Optional fields whose presence earns up to 10 bonus points — the
/// closest analogue to the Python schema's `optional_fields` list for the
/// normalized Rust record (license/description aren't modeled as
/// first-class fields here, so this tracks the ones that are).
const OPTIONAL_FIELD_CHECKS: &[fn(&ModelRecord) -> bool] = &[
    |r| !r.tags.is_empty(),
    |r| r.last_modified.is_some(),
    |r| r.created_at.is_some(),
    |r| r.architecture != "Unknown",
    |r| !r.quantizations.is_empty() && !r.quantizations.iter().all(|q| q == "Unknown"),
];

/// Required fields mirroring the Python schema's `required_fields` list.
const REQUIRED_FIELD_CHECKS: &[fn(&ModelRecord) -> bool] = &[
    |r| !r.id.trim().is_empty(),
    |r| !r.name.trim().is_empty(),
    |r| !r.files.is_empty(),
    |r| !r.architecture.trim().is_empty(),
    |r| !r.family.trim().is_empty(),
];

/// Quality score (0-100): start at 100, subtract per-issue penalties,
/// add up to a 10-point bonus for optional-field coverage (spec §4.E).
pub fn quality_score(issues: &[crate::types::ValidationIssue]) -> f64 {
    let mut score = 100.0;
    for issue in issues {
        score -= match issue.severity {
            IssueSeverity::Critical => 25.0,
            IssueSeverity::Error => 10.0,
            IssueSeverity::Warning => 5.0,
            IssueSeverity::Info => 1.0,
        };
    }
    score.clamp(0.0, 100.0)
}

/// Quality score including the optional-field completeness bonus,
/// applied once repair has settled the record's final shape.
pub fn quality_score_with_bonus(record: &ModelRecord, issues: &[crate::types::ValidationIssue]) -> f64 {
    let base = quality_score(issues);
    let present = OPTIONAL_FIELD_CHECKS.iter().filter(|check| check(record)).count();
    let bonus = (present as f64 / OPTIONAL_FIELD_CHECKS.len() as f64) * 10.0;
    (base + bonus).clamp(0.0, 100.0)
}

/// Completeness score: fraction of (required ∪ optional) fields present,
/// as a percentage (spec §4.E).
pub fn completeness_score(record: &ModelRecord) -> f64 {
    let total = REQUIRED_FIELD_CHECKS.len() + OPTIONAL_FIELD_CHECKS.len();
    let present = REQUIRED_FIELD_CHECKS.iter().filter(|check| check(record)).count()
        + OPTIONAL_FIELD_CHECKS.iter().filter(|check| check(record)).count();
    (present as f64 / total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileRecord, IssueCategory, ValidationIssue};
    use std::collections::HashSet;

    fn full_record() -> ModelRecord {
        ModelRecord {
            id: "org/model".into(),
            name: "Model".into(),
            family: "org".into(),
            architecture: "Llama".into(),
            files: vec![FileRecord {
                filename: "m.gguf".into(),
                size_bytes: 1,
                size_human: "1 B".into(),
                quantization: "Q4_K_M".into(),
                download_url: "https://x/m.gguf".into(),
                last_modified: None,
            }],
            downloads: 5,
            tags: HashSet::from(["chat".to_string()]),
            total_size_bytes: 1,
            quantizations: HashSet::from(["Q4_K_M".to_string()]),
            last_modified: Some(chrono::Utc::now()),
            created_at: Some(chrono::Utc::now()),
            discovery_method: vec!["primary".into()],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        }
    }

    #[test]
    fn no_issues_scores_full_minus_nothing() {
        assert_eq!(quality_score(&[]), 100.0);
    }

    #[test]
    fn critical_issue_costs_twenty_five_points() {
        let issues = vec![ValidationIssue {
            category: IssueCategory::Schema,
            severity: IssueSeverity::Critical,
            field: "files".into(),
            message: "missing".into(),
            suggested_fix: None,
            auto_fixable: false,
        }];
        assert_eq!(quality_score(&issues), 75.0);
    }

    #[test]
    fn completeness_is_full_for_fully_populated_record() {
        assert_eq!(completeness_score(&full_record()), 100.0);
    }

    #[test]
    fn completeness_drops_when_optional_fields_absent() {
        let mut record = full_record();
        record.tags.clear();
        record.last_modified = None;
        assert!(completeness_score(&record) < 100.0);
    }
}
