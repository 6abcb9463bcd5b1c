//! Automatic repair (spec §4.E): for each `auto_fixable` issue, apply the
//! fix named in spec.md's list. Grounded in `DataFixer` from
//! `original_source/scripts/validation_system.py`, reworked from its
//! message-string matching into matching on `(category, field)` directly
//! since the issue carries a typed field already.

use crate::enrich::derive_quantization_from_filename;
use crate::types::{derive_display_name, IssueSeverity, ModelRecord, ValidationIssue};

const MAX_NAME_LEN: usize = 200;
const MAX_TAGS: usize = 10;

/// Apply every auto-fixable issue to `record` in place, returning the
/// number of fixes actually applied.
pub fn apply_fixes(record: &mut ModelRecord, issues: &[ValidationIssue]) -> u32 {
    let mut applied = 0;

    for issue in issues {
        if !issue.auto_fixable {
            continue;
        }
        let fixed = match issue.field.as_str() {
            "name" => fix_name(record),
            "family" => fix_family(record),
            "architecture" => fix_architecture(record),
            "tags" => fix_tags(record),
            "quantizations" => fix_quantizations(record),
            _ => false,
        };
        if fixed {
            applied += 1;
        }
    }

    applied
}

fn fix_name(record: &mut ModelRecord) -> bool {
    if record.name.trim().is_empty() {
        record.name = derive_display_name(&record.id);
        return true;
    }
    if record.name.len() > MAX_NAME_LEN {
        record.name.truncate(MAX_NAME_LEN);
        return true;
    }
    false
}

fn fix_family(record: &mut ModelRecord) -> bool {
    if record.family.trim().is_empty() {
        record.family = record.id.split('/').next().unwrap_or("Unknown").to_string();
        return true;
    }
    false
}

fn fix_architecture(record: &mut ModelRecord) -> bool {
    if record.architecture.trim().is_empty() {
        let tags: Vec<String> = record.tags.iter().cloned().collect();
        record.architecture = crate::enrich::derive_architecture(&record.id, &tags);
        return true;
    }
    false
}

fn fix_tags(record: &mut ModelRecord) -> bool {
    if record.tags.len() > MAX_TAGS {
        let mut kept: Vec<String> = record.tags.iter().cloned().collect();
        kept.sort();
        kept.truncate(MAX_TAGS);
        record.tags = kept.into_iter().collect();
        return true;
    }
    false
}

/// Re-derive any quantization label outside the closed set from its
/// owning file's filename (spec §4.E "unexpected quantization").
fn fix_quantizations(record: &mut ModelRecord) -> bool {
    let mut changed = false;
    for file in &mut record.files {
        if !crate::types::QUANTIZATION_LABELS.contains(&file.quantization.as_str())
            && file.quantization != crate::types::UNKNOWN_QUANTIZATION
        {
            file.quantization = derive_quantization_from_filename(&file.filename);
            changed = true;
        }
    }
    if changed {
        record.quantizations = record.files.iter().map(|f| f.quantization.clone()).collect();
    }
    changed
}

/// Whether a repair target is worth attempting at all (spec §4.E: only
/// when `auto_fixable`). Kept separate from [`apply_fixes`] so callers
/// that only want to know "is there anything to fix" don't pay for the
/// mutation pass.
pub fn has_fixable_issue(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.auto_fixable && i.severity != IssueSeverity::Info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;
    use std::collections::HashSet;

    fn bare_record() -> ModelRecord {
        ModelRecord {
            id: "org/my-model".to_string(),
            name: String::new(),
            family: String::new(),
            architecture: String::new(),
            files: vec![FileRecord {
                filename: "model.bogus.gguf".to_string(),
                size_bytes: 1,
                size_human: "1 B".to_string(),
                quantization: "BOGUS".to_string(),
                download_url: "https://x/model.gguf".to_string(),
                last_modified: None,
            }],
            downloads: 0,
            tags: HashSet::new(),
            total_size_bytes: 1,
            quantizations: HashSet::from(["BOGUS".to_string()]),
            last_modified: None,
            created_at: None,
            discovery_method: vec![],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        }
    }

    #[test]
    fn derives_name_family_and_quantization() {
        let mut record = bare_record();
        let issues = crate::validate::schema::validate(&record);
        let applied = apply_fixes(&mut record, &issues);
        assert!(applied >= 3);
        assert_eq!(record.name, "My Model");
        assert_eq!(record.family, "org");
        assert_eq!(record.files[0].quantization, "Unknown");
    }

    #[test]
    fn second_pass_is_a_no_op_after_repair() {
        let mut record = bare_record();
        let issues = crate::validate::schema::validate(&record);
        apply_fixes(&mut record, &issues);
        let remaining = crate::validate::schema::validate(&record);
        let applied_again = apply_fixes(&mut record, &remaining);
        assert_eq!(applied_again, 0);
    }
}
