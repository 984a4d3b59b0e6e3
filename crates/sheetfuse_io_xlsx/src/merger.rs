//! Multi-file, multi-sheet merge orchestration.

use log::{info, warn};

use crate::reader::read_workbook_tables;
use crate::report::{ReportMerge, ReportMergeBuilder};
use crate::spec::{
    EnumCellValue, MergeError, SpecInputFile, SpecMergeOptions, SpecSheetTable, SpecTable,
    SpecUnionedTable,
};
use crate::util::SpecColumnUnion;

/// Output of [`merge_files`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpecMergeResult {
    /// Unioned rows of every successfully read sheet.
    pub table: SpecUnionedTable,
    /// Counters and per-file diagnostics.
    pub report: ReportMerge,
}

impl SpecMergeResult {
    /// Whether nothing was merged.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[derive(Debug)]
struct SpecMergeSource {
    file_name: String,
    sheets: Vec<SpecSheetTable>,
}

/// Merge every sheet of every file into one table with provenance columns.
///
/// Files are read in order; each file is all-or-nothing. A file that cannot be
/// opened, or holds one sheet that cannot be parsed, contributes no rows and
/// is recorded in [`ReportMerge::errors`]; the remaining files still merge.
///
/// Columns are unioned by exact name in first-seen order, and the provenance
/// columns always trail. A sheet column sharing a provenance column's name is
/// replaced by the provenance value.
///
/// Returns [`MergeError::InvalidOptions`] only when `options` is unusable.
pub fn merge_files(
    files: &[SpecInputFile],
    options: &SpecMergeOptions,
) -> Result<SpecMergeResult, MergeError> {
    validate_merge_options(options)?;

    let mut builder_report = ReportMergeBuilder::default();
    let mut union_columns = SpecColumnUnion::default();
    let mut l_sources = Vec::with_capacity(files.len());

    for file in files {
        builder_report.add_file();
        let l_sheets = match read_workbook_tables(file, options.if_skip_blank_rows) {
            Ok(l_sheets) => l_sheets,
            Err(err) => {
                warn!("skipping {:?}: {err}", file.name);
                builder_report.add_error(file.name.clone(), err.to_string());
                continue;
            }
        };

        for sheet in &l_sheets {
            for c_col in &sheet.table.columns {
                if is_provenance_column(c_col, options) {
                    let c_msg = format!(
                        "{}/{}: column {c_col:?} replaced by provenance value.",
                        file.name, sheet.sheet_name
                    );
                    warn!("{c_msg}");
                    builder_report.add_warning(c_msg);
                    continue;
                }
                union_columns.insert(c_col);
            }
        }

        builder_report.add_merged_file(l_sheets.len() as u64);
        l_sources.push(SpecMergeSource {
            file_name: file.name.clone(),
            sheets: l_sheets,
        });
    }

    let table = assemble_unioned_table(union_columns, l_sources, options);
    builder_report.add_rows(table.height() as u64);

    let report = builder_report.build();
    info!("{report}");
    Ok(SpecMergeResult { table, report })
}

fn validate_merge_options(options: &SpecMergeOptions) -> Result<(), MergeError> {
    if options.col_source_file.is_empty() || options.col_sheet_name.is_empty() {
        return Err(MergeError::InvalidOptions(
            "Provenance column names must be non-empty.".to_string(),
        ));
    }
    if options.col_source_file == options.col_sheet_name {
        return Err(MergeError::InvalidOptions(format!(
            "Provenance column names must differ, got {:?} twice.",
            options.col_source_file
        )));
    }
    Ok(())
}

fn is_provenance_column(name: &str, options: &SpecMergeOptions) -> bool {
    name == options.col_source_file || name == options.col_sheet_name
}

/// Second pass: allocate every output row once against the final union.
fn assemble_unioned_table(
    union_columns: SpecColumnUnion,
    l_sources: Vec<SpecMergeSource>,
    options: &SpecMergeOptions,
) -> SpecUnionedTable {
    if l_sources.is_empty() {
        return SpecUnionedTable::new(
            SpecTable::default(),
            &options.col_source_file,
            &options.col_sheet_name,
        );
    }

    let n_width_data = union_columns.len();
    let n_width = n_width_data + 2;
    let n_rows_total = l_sources
        .iter()
        .flat_map(|source| source.sheets.iter())
        .map(|sheet| sheet.table.height())
        .sum();

    let mut rows = Vec::with_capacity(n_rows_total);
    for source in l_sources {
        for sheet in source.sheets {
            let l_pos_by_col: Vec<Option<usize>> = sheet
                .table
                .columns
                .iter()
                .map(|c_col| {
                    if is_provenance_column(c_col, options) {
                        None
                    } else {
                        union_columns.position(c_col)
                    }
                })
                .collect();

            for row_src in sheet.table.rows {
                let mut row = vec![EnumCellValue::None; n_width];
                for (value, n_pos) in row_src.into_iter().zip(&l_pos_by_col) {
                    if let Some(n_pos) = n_pos {
                        row[*n_pos] = value;
                    }
                }
                row[n_width_data] = EnumCellValue::String(source.file_name.clone());
                row[n_width_data + 1] = EnumCellValue::String(sheet.sheet_name.clone());
                rows.push(row);
            }
        }
    }

    let mut columns = union_columns.into_columns();
    columns.push(options.col_source_file.clone());
    columns.push(options.col_sheet_name.clone());

    SpecUnionedTable::new(
        SpecTable::new(columns, rows),
        &options.col_source_file,
        &options.col_sheet_name,
    )
}
