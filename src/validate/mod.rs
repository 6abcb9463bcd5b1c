pub mod accessibility;
pub mod repair;
pub mod schema;
pub mod score;

use crate::types::{ModelRecord, ValidationAnnotation};

pub use accessibility::AccessibilityCache;

/// Validate, auto-repair, re-validate, and score a single record in place.
/// Returns the annotation that gets attached to the record.
pub fn validate_and_repair(record: &mut ModelRecord) -> ValidationAnnotation {
    let issues = schema::validate(record);
    let auto_fixes_applied = repair::apply_fixes(record, &issues);

    let issues = if auto_fixes_applied > 0 {
        schema::validate(record)
    } else {
        issues
    };

    let quality_score = score::quality_score_with_bonus(record, &issues);
    let completeness_score = score::completeness_score(record);
    let is_valid = !issues.iter().any(|i| {
        i.severity == crate::types::IssueSeverity::Critical || i.severity == crate::types::IssueSeverity::Error
    });

    ValidationAnnotation {
        is_valid,
        quality_score,
        completeness_score,
        issues_count: issues.len() as u32,
        auto_fixes_applied,
        validated_at: chrono::Utc::now(),
    }
}
