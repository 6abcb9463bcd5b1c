//! Rule-based schema validation: required fields, type checks, and
//! constraints, expressed as plain data rather than an inheritance tree of
//! validator classes.

use crate::types::{IssueCategory, IssueSeverity, ModelRecord, ValidationIssue, QUANTIZATION_LABELS, UNKNOWN_QUANTIZATION};

const MAX_TAGS: usize = 10;
const MAX_NAME_LEN: usize = 200;

pub fn validate(record: &ModelRecord) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if record.id.trim().is_empty() {
        issues.push(missing("id"));
    }
    if record.name.trim().is_empty() {
        issues.push(missing("name"));
    }
    if record.family.trim().is_empty() {
        issues.push(missing("family"));
    }

    if record.name.len() > MAX_NAME_LEN {
        issues.push(ValidationIssue {
            category: IssueCategory::Schema,
            severity: IssueSeverity::Warning,
            field: "name".to_string(),
            message: format!("name exceeds {MAX_NAME_LEN} characters"),
            suggested_fix: Some("truncate".to_string()),
            auto_fixable: true,
        });
    }

    if record.tags.len() > MAX_TAGS {
        issues.push(ValidationIssue {
            category: IssueCategory::Schema,
            severity: IssueSeverity::Warning,
            field: "tags".to_string(),
            message: format!("more than {MAX_TAGS} tags"),
            suggested_fix: Some("truncate".to_string()),
            auto_fixable: true,
        });
    }

    if record.architecture.trim().is_empty() {
        issues.push(ValidationIssue {
            category: IssueCategory::DataIntegrity,
            severity: IssueSeverity::Error,
            field: "architecture".to_string(),
            message: "architecture missing or null".to_string(),
            suggested_fix: Some("heuristic guess".to_string()),
            auto_fixable: true,
        });
    }

    // Checked per file, not per the derived `record.quantizations` set: a
    // file's label can be out-of-set while the set itself (built from other
    // files) looks fine, and repair needs the offending filename to re-derive.
    for file in &record.files {
        if file.quantization != UNKNOWN_QUANTIZATION && !QUANTIZATION_LABELS.contains(&file.quantization.as_str()) {
            issues.push(ValidationIssue {
                category: IssueCategory::DataIntegrity,
                severity: IssueSeverity::Warning,
                field: "quantizations".to_string(),
                message: format!("unexpected quantization label on {}: {}", file.filename, file.quantization),
                suggested_fix: Some("re-derive from filename".to_string()),
                auto_fixable: true,
            });
        }
    }

    for file in &record.files {
        if !file.schema_valid() {
            issues.push(ValidationIssue {
                category: IssueCategory::FileAccess,
                severity: IssueSeverity::Error,
                field: format!("files.{}", file.filename),
                message: "filename or download_url fails schema constraints".to_string(),
                suggested_fix: None,
                auto_fixable: false,
            });
        }
    }

    if record.files.is_empty() {
        issues.push(ValidationIssue {
            category: IssueCategory::Completeness,
            severity: IssueSeverity::Critical,
            field: "files".to_string(),
            message: "model has no files".to_string(),
            suggested_fix: None,
            auto_fixable: false,
        });
    }

    issues
}

fn missing(field: &str) -> ValidationIssue {
    ValidationIssue {
        category: IssueCategory::Schema,
        severity: IssueSeverity::Critical,
        field: field.to_string(),
        message: format!("required field `{field}` is missing or null"),
        suggested_fix: Some("derive from id".to_string()),
        auto_fixable: field == "name" || field == "family",
    }
}
