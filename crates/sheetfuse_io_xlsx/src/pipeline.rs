//! Merge-then-serialize entry point for download-style hosts.

use log::info;

use crate::conf::{C_FILE_NAME_MERGED, C_MIME_XLSX, N_NROWS_PREVIEW_DEFAULT};
use crate::merger::merge_files;
use crate::report::ReportMerge;
use crate::spec::{
    MergeError, SpecInputFile, SpecMergeOptions, SpecTable, SpecUnionedTable,
    SpecXlsxWriteOptions,
};
use crate::writer::serialize_table;

/// Serialized workbook ready to hand to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDownloadArtifact {
    /// `.xlsx` bytes.
    pub content: Vec<u8>,
    /// Suggested file name.
    pub file_name: String,
    /// Content type.
    pub mime: String,
}

impl SpecDownloadArtifact {
    fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            file_name: C_FILE_NAME_MERGED.to_string(),
            mime: C_MIME_XLSX.to_string(),
        }
    }
}

/// Output of [`merge_and_serialize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpecMergeOutcome {
    pub report: ReportMerge,
    pub table: SpecUnionedTable,
    /// `None` when the merge produced no rows.
    pub artifact: Option<SpecDownloadArtifact>,
}

impl SpecMergeOutcome {
    /// Whether the merge produced no rows.
    pub fn is_empty(&self) -> bool {
        self.artifact.is_none()
    }

    /// First `n_rows` rows, or [`N_NROWS_PREVIEW_DEFAULT`] when `None`.
    pub fn preview(&self, n_rows: Option<usize>) -> SpecTable {
        self.table
            .as_table()
            .head(n_rows.unwrap_or(N_NROWS_PREVIEW_DEFAULT))
    }
}

/// Merge `files`, then serialize the result when it has rows.
///
/// Per-file failures stay in the report. Only invalid options and a failed
/// serialization abort the call.
pub fn merge_and_serialize(
    files: &[SpecInputFile],
    merge_options: &SpecMergeOptions,
    write_options: &SpecXlsxWriteOptions,
) -> Result<SpecMergeOutcome, MergeError> {
    let result = merge_files(files, merge_options)?;

    if result.is_empty() {
        info!("no rows merged from {} file(s)", files.len());
        return Ok(SpecMergeOutcome {
            report: result.report,
            table: result.table,
            artifact: None,
        });
    }

    let v_content = serialize_table(result.table.as_table(), write_options)?;
    Ok(SpecMergeOutcome {
        report: result.report,
        table: result.table,
        artifact: Some(SpecDownloadArtifact::new(v_content)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{build_xlsx_bytes, number, text};
    use crate::reader::read_workbook_bytes;
    use crate::spec::EnumCellValue;

    fn build_files() -> Vec<SpecInputFile> {
        vec![
            SpecInputFile::new(
                "sales.xlsx",
                build_xlsx_bytes(&[
                    (
                        "Jan",
                        &["region", "amount"],
                        vec![
                            vec![text("north"), number(10.0)],
                            vec![text("south"), number(12.5)],
                        ],
                    ),
                    ("Feb", &["region", "note"], vec![vec![text("east"), text("late")]]),
                ]),
            ),
            SpecInputFile::new("readme.txt", b"plain text".to_vec()),
        ]
    }

    #[test]
    fn test_merge_and_serialize_round_trips_through_reader() {
        let outcome = merge_and_serialize(
            &build_files(),
            &SpecMergeOptions::default(),
            &SpecXlsxWriteOptions::default(),
        )
        .expect("pipeline");

        assert!(!outcome.is_empty());
        assert_eq!(outcome.report.error_count(), 1);
        let artifact = outcome.artifact.as_ref().expect("artifact");
        assert_eq!(artifact.file_name, "merged_file.xlsx");
        assert_eq!(artifact.mime, C_MIME_XLSX);

        let l_sheets = read_workbook_bytes(&artifact.content, true).expect("reread");
        assert_eq!(l_sheets.len(), 1);
        assert_eq!(l_sheets[0].sheet_name, "Merged_Data");

        let table_reread = &l_sheets[0].table;
        let table_merged = outcome.table.as_table();
        assert_eq!(table_reread.columns, table_merged.columns);
        assert_eq!(table_reread.height(), 3);
        assert_eq!(table_reread.rows, table_merged.rows);
        assert_eq!(
            table_reread.get(2, "amount"),
            Some(&EnumCellValue::None)
        );
        assert_eq!(table_reread.get(2, "Sheet_Name"), Some(&text("Feb")));
    }

    #[test]
    fn test_merge_and_serialize_without_rows_has_no_artifact() {
        let outcome = merge_and_serialize(
            &[SpecInputFile::new("bad.xls", vec![1, 2, 3])],
            &SpecMergeOptions::default(),
            &SpecXlsxWriteOptions::default(),
        )
        .expect("pipeline");
        assert!(outcome.is_empty());
        assert!(outcome.artifact.is_none());
        assert_eq!(outcome.report.diagnostics()[0].0, "bad.xls");

        let outcome_none = merge_and_serialize(
            &[],
            &SpecMergeOptions::default(),
            &SpecXlsxWriteOptions::default(),
        )
        .expect("pipeline");
        assert!(outcome_none.is_empty());
        assert_eq!(outcome_none.preview(None).width(), 0);
    }

    #[test]
    fn test_preview_defaults_to_five_rows() {
        let rows = (0..8).map(|n| vec![number(n as f64)]).collect::<Vec<_>>();
        let files = [SpecInputFile::new(
            "long.xlsx",
            build_xlsx_bytes(&[("S", &["n"], rows)]),
        )];
        let outcome = merge_and_serialize(
            &files,
            &SpecMergeOptions::default(),
            &SpecXlsxWriteOptions::default(),
        )
        .expect("pipeline");
        assert_eq!(outcome.preview(None).height(), 5);
        assert_eq!(outcome.preview(Some(2)).height(), 2);
        assert_eq!(outcome.preview(Some(50)).height(), 8);
    }

    #[test]
    fn test_merge_and_serialize_propagates_invalid_options() {
        let options = SpecMergeOptions {
            col_source_file: String::new(),
            ..Default::default()
        };
        let res = merge_and_serialize(&build_files(), &options, &SpecXlsxWriteOptions::default());
        assert!(matches!(res, Err(MergeError::InvalidOptions(_))));
    }
}
