//! Merge report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

/// One per-file failure: file name + user-facing error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMergeError {
    /// Display name of the failed input file.
    pub file_name: String,
    /// User-facing error text.
    pub exception: String,
}

impl fmt::Display for SpecMergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error processing {}: {}", self.file_name, self.exception)
    }
}

/// Aggregate counters and diagnostics for one `merge_files` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportMerge {
    /// Number of input files seen.
    pub cnt_files_total: u64,
    /// Number of files whose sheets were all parsed.
    pub cnt_files_merged: u64,
    /// Number of files rejected as a whole.
    pub cnt_files_failed: u64,
    /// Number of sheets contributing to the union.
    pub cnt_sheets_merged: u64,
    /// Number of rows in the unioned table.
    pub cnt_rows_merged: u64,
    /// Non-fatal warnings collected while merging.
    pub warnings: Vec<String>,
    /// Per-file failures, in input order.
    pub errors: Vec<SpecMergeError>,
}

impl ReportMerge {
    /// Number of collected per-file errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// `(file name, message)` pairs for display, one per failed file.
    pub fn diagnostics(&self) -> Vec<(String, String)> {
        self.errors
            .iter()
            .map(|err| (err.file_name.clone(), err.exception.clone()))
            .collect()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files_total".to_string(), self.cnt_files_total);
        dict_counts.insert("cnt_files_merged".to_string(), self.cnt_files_merged);
        dict_counts.insert("cnt_files_failed".to_string(), self.cnt_files_failed);
        dict_counts.insert("cnt_sheets_merged".to_string(), self.cnt_sheets_merged);
        dict_counts.insert("cnt_rows_merged".to_string(), self.cnt_rows_merged);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} files={} merged={} failed={} sheets={} rows={} errors={} warnings={}",
            dict_counts["cnt_files_total"],
            dict_counts["cnt_files_merged"],
            dict_counts["cnt_files_failed"],
            dict_counts["cnt_sheets_merged"],
            dict_counts["cnt_rows_merged"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportMerge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[MERGE]"))
    }
}

/// Mutable accumulator for merge statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportMergeBuilder {
    /// See [`ReportMerge::cnt_files_total`].
    pub cnt_files_total: u64,
    /// See [`ReportMerge::cnt_files_merged`].
    pub cnt_files_merged: u64,
    /// See [`ReportMerge::cnt_files_failed`].
    pub cnt_files_failed: u64,
    /// See [`ReportMerge::cnt_sheets_merged`].
    pub cnt_sheets_merged: u64,
    /// See [`ReportMerge::cnt_rows_merged`].
    pub cnt_rows_merged: u64,
    /// See [`ReportMerge::errors`].
    pub errors: Vec<SpecMergeError>,
    /// See [`ReportMerge::warnings`].
    pub warnings: Vec<String>,
}

impl ReportMergeBuilder {
    /// Increment seen-file count by one.
    pub fn add_file(&mut self) {
        self.cnt_files_total += 1;
    }

    /// Record one fully parsed file with `n_sheets` sheets.
    pub fn add_merged_file(&mut self, n_sheets: u64) {
        self.cnt_files_merged += 1;
        self.cnt_sheets_merged += n_sheets;
    }

    /// Add `n_rows` to the merged row count.
    pub fn add_rows(&mut self, n_rows: u64) {
        self.cnt_rows_merged += n_rows;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Record one failed file.
    pub fn add_error(&mut self, file_name: String, exception: String) {
        self.cnt_files_failed += 1;
        self.errors.push(SpecMergeError {
            file_name,
            exception,
        });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportMerge {
        ReportMerge {
            cnt_files_total: self.cnt_files_total,
            cnt_files_merged: self.cnt_files_merged,
            cnt_files_failed: self.cnt_files_failed,
            cnt_sheets_merged: self.cnt_sheets_merged,
            cnt_rows_merged: self.cnt_rows_merged,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportMerge, ReportMergeBuilder};

    #[test]
    fn report_merge_to_dict_and_format() {
        let mut builder = ReportMergeBuilder::default();
        builder.add_file();
        builder.add_file();
        builder.add_merged_file(3);
        builder.add_rows(12);
        builder.add_error("notes.xlsx".to_string(), "bad zip".to_string());
        builder.add_warning("w".to_string());
        let report: ReportMerge = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_files_total"], 2);
        assert_eq!(dict_counts["cnt_files_merged"], 1);
        assert_eq!(dict_counts["cnt_files_failed"], 1);
        assert_eq!(dict_counts["cnt_sheets_merged"], 3);
        assert_eq!(dict_counts["cnt_rows_merged"], 12);
        assert_eq!(dict_counts["cnt_errors"], 1);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[MERGE]");
        assert_eq!(
            txt,
            "[MERGE] files=2 merged=1 failed=1 sheets=3 rows=12 errors=1 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
        assert_eq!(
            report.errors[0].to_string(),
            "Error processing notes.xlsx: bad zip"
        );
        assert_eq!(
            report.diagnostics(),
            vec![("notes.xlsx".to_string(), "bad zip".to_string())]
        );
    }
}
