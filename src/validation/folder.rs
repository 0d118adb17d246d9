//! Folder-level orchestration: run the per-file validators over every CSV
//! present, then the cross-table checks.

use std::path::Path;

use crate::schema::{locate_table_file, TableSet, TABLES};
use crate::validation::{
    read_rows, validate_cross, validate_file, IssueCode, ValidationIssue, ValidationReport,
};

/// Validate a folder of activity CSV files.
///
/// `activities.csv` is the one required file; the other tables are validated
/// when present (located by exact name or prefix match, e.g.
/// `ORG-transactions.csv`) and skipped otherwise.
pub fn validate_folder(folder: &Path) -> ValidationReport {
    let mut report = ValidationReport::new();

    if !folder.is_dir() {
        report.push(ValidationIssue::error(
            IssueCode::MissingFile,
            format!("Folder not found: {}", folder.display()),
        ));
        return report;
    }

    if !folder.join("activities.csv").exists() {
        report.push(
            ValidationIssue::error(
                IssueCode::MissingFile,
                "Required file activities.csv not found",
            )
            .in_file("activities.csv"),
        );
        return report;
    }

    let mut tables = TableSet::new();
    for spec in TABLES.iter() {
        let path = match locate_table_file(folder, spec) {
            Some(path) => path,
            None => {
                if spec.required {
                    report.push(
                        ValidationIssue::error(
                            IssueCode::MissingFile,
                            format!("Required file {} not found", spec.filename),
                        )
                        .in_file(spec.filename),
                    );
                }
                continue;
            }
        };

        report.merge(validate_file(&path, spec));

        // Load rows for the cross-table pass; read failures were already
        // reported above.
        if let Ok((_, rows)) = read_rows(&path) {
            tables.set(spec.id, rows);
        }
    }

    if !tables.rows(crate::schema::TableId::Activities).is_empty() {
        report.merge(validate_cross(&tables));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ACTIVITIES_HEADER: &str = "activity_identifier,title,activity_status,reporting_org_ref,planned_start_date";

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_folder(&dir.path().join("nope"));
        assert!(!report.is_valid());
        assert!(report.issues[0].message.starts_with("Folder not found:"));
    }

    #[test]
    fn test_missing_activities_file_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sectors.csv", "activity_identifier,sector_code\nAA-1,111\n");
        let report = validate_folder(dir.path());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(
            report.issues[0].message,
            "Required file activities.csv not found"
        );
    }

    #[test]
    fn test_valid_minimal_folder() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "activities.csv",
            &format!("{ACTIVITIES_HEADER}\nAA-1,Clean water,2,XM-DAC-1,2024-01-01\n"),
        );
        let report = validate_folder(dir.path());
        assert!(report.is_valid(), "{:?}", report.issues);
        // Absent optional tables produce no issues at all.
        assert!(!report.issues.iter().any(|i| i.code == IssueCode::MissingFile));
    }

    #[test]
    fn test_prefix_named_files_are_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "activities.csv",
            &format!("{ACTIVITIES_HEADER}\nAA-1,Clean water,2,XM-DAC-1,2024-01-01\n"),
        );
        write(
            dir.path(),
            "ORG-budgets.csv",
            "activity_identifier,budget_type,budget_status,period_start,period_end,value\n\
             AA-1,1,1,2024-01-01,2024-12-31,nope\n",
        );
        let report = validate_folder(dir.path());
        let decimal_errors: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::InvalidDecimal)
            .collect();
        assert_eq!(decimal_errors.len(), 1);
        assert_eq!(decimal_errors[0].file_name.as_deref(), Some("ORG-budgets.csv"));
    }

    #[test]
    fn test_cross_checks_run_after_file_checks() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "activities.csv",
            &format!("{ACTIVITIES_HEADER}\nAA-1,Clean water,2,XM-DAC-1,2024-01-01\n"),
        );
        write(
            dir.path(),
            "results.csv",
            "activity_identifier,result_ref,result_type\nAA-OTHER,r1,1\n",
        );
        let report = validate_folder(dir.path());
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::OrphanReference
                && i.message == "activity_identifier 'AA-OTHER' not found in activities.csv"));
    }

    #[test]
    fn test_invalid_cells_accumulate_per_row() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "activities.csv",
            &format!(
                "{ACTIVITIES_HEADER},default_currency\n\
                 AA-1,Clean water,99,XM-DAC-1,2024-01-01,usd\n"
            ),
        );
        let report = validate_folder(dir.path());
        assert!(!report.is_valid());
        assert!(report.issues.iter().any(|i| i.code == IssueCode::InvalidEnum));
        assert!(report.issues.iter().any(|i| i.code == IssueCode::InvalidCurrency));
    }
}
