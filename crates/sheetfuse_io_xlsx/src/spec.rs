//! Shared merge/XLSX specification models and error types.

use std::fmt;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::conf::{
    C_COL_SHEET_NAME, C_COL_SOURCE_FILE, C_SHEET_NAME_MERGED, EnumFmtKey,
    derive_default_xlsx_formats,
};
use crate::util::{format_excel_serial_datetime, format_excel_serial_duration, format_number};

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Normalized cell value shared by reader, merger and writer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Floating point value.
    Number(f64),
    /// Integer value.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
    /// Date-time as Excel serial (1900 date system).
    DateTime(f64),
    /// Duration as Excel serial days.
    Duration(f64),
}

impl EnumCellValue {
    /// Whether this is the missing value.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Short type label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::DateTime(_) => "datetime",
            Self::Duration(_) => "duration",
        }
    }
}

impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::String(val) => write!(f, "{val}"),
            Self::Number(val) => write!(f, "{}", format_number(*val)),
            Self::Integer(val) => write!(f, "{val}"),
            Self::Boolean(val) => write!(f, "{}", if *val { "True" } else { "False" }),
            Self::DateTime(val) => match format_excel_serial_datetime(*val) {
                Some(txt) => write!(f, "{txt}"),
                None => write!(f, "{}", format_number(*val)),
            },
            Self::Duration(val) => write!(f, "{}", format_excel_serial_duration(*val)),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; `None` fields inherit on merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableModels

/// Ordered columns plus rows aligned to them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecTable {
    /// Column names, unique within the table.
    pub columns: Vec<String>,
    /// Rows; each has exactly `columns.len()` cells.
    pub rows: Vec<Vec<EnumCellValue>>,
}

impl SpecTable {
    /// Create a table from columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<EnumCellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` among the columns.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c_name| c_name == name)
    }

    /// Cell at `(row_idx, column name)`.
    pub fn get(&self, row_idx: usize, column: &str) -> Option<&EnumCellValue> {
        let n_idx_col = self.column_index(column)?;
        self.rows.get(row_idx)?.get(n_idx_col)
    }

    /// All cells of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Option<Vec<&EnumCellValue>> {
        let n_idx_col = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(n_idx_col).unwrap_or(&EnumCellValue::None))
                .collect(),
        )
    }

    /// Copy of the first `n` rows.
    pub fn head(&self, n: usize) -> SpecTable {
        SpecTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// One parsed sheet of one workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheetTable {
    /// Sheet name as stored in the workbook.
    pub sheet_name: String,
    /// Parsed header + body.
    pub table: SpecTable,
}

/// Merge result table: unioned data columns followed by two provenance columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecUnionedTable {
    table: SpecTable,
    col_source_file: String,
    col_sheet_name: String,
}

impl SpecUnionedTable {
    /// Wrap a table whose trailing columns are the given provenance columns.
    ///
    /// A table with no columns (nothing contributed) is accepted as-is.
    pub(crate) fn new(table: SpecTable, col_source_file: &str, col_sheet_name: &str) -> Self {
        debug_assert!(
            table.columns.is_empty()
                || (table.width() >= 2
                    && table.columns[table.width() - 2..] == [col_source_file, col_sheet_name]),
            "provenance columns must trail"
        );
        Self {
            table,
            col_source_file: col_source_file.to_string(),
            col_sheet_name: col_sheet_name.to_string(),
        }
    }

    /// Underlying table.
    pub fn as_table(&self) -> &SpecTable {
        &self.table
    }

    /// Consume into the underlying table.
    pub fn into_table(self) -> SpecTable {
        self.table
    }

    /// Column names including provenance.
    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }

    /// Data column names, provenance excluded.
    pub fn data_columns(&self) -> &[String] {
        let n_width = self.table.width();
        &self.table.columns[..n_width.saturating_sub(2)]
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.table.height()
    }

    /// Whether the merge produced no rows.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// `(file name, sheet name)` recorded for one row.
    pub fn provenance(&self, row_idx: usize) -> Option<(&str, &str)> {
        let [.., value_file, value_sheet] = self.table.rows.get(row_idx)?.as_slice() else {
            return None;
        };
        match (value_file, value_sheet) {
            (EnumCellValue::String(file_name), EnumCellValue::String(sheet_name)) => {
                Some((file_name.as_str(), sheet_name.as_str()))
            }
            _ => None,
        }
    }

    /// Name of the file provenance column.
    pub fn col_source_file(&self) -> &str {
        &self.col_source_file
    }

    /// Name of the sheet provenance column.
    pub fn col_sheet_name(&self) -> &str {
        &self.col_sheet_name
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region InputAndOptions

/// One uploaded file: display name + complete binary content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecInputFile {
    /// Display name used for provenance and diagnostics.
    pub name: String,
    /// Raw container bytes.
    pub content: Vec<u8>,
}

impl SpecInputFile {
    /// Create from name and bytes.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Load from disk; the display name is the file's basename.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|val| val.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self { name, content })
    }
}

/// Options for [`crate::merger::merge_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMergeOptions {
    /// Name of the file provenance column.
    pub col_source_file: String,
    /// Name of the sheet provenance column.
    pub col_sheet_name: String,
    /// Drop data rows whose cells are all empty.
    pub if_skip_blank_rows: bool,
}

impl Default for SpecMergeOptions {
    fn default() -> Self {
        Self {
            col_source_file: C_COL_SOURCE_FILE.to_string(),
            col_sheet_name: C_COL_SHEET_NAME.to_string(),
            if_skip_blank_rows: true,
        }
    }
}

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only (default).
    #[default]
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells.
    All,
}

/// Autofit policy for the merged sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::Header,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Options for [`crate::writer::serialize_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    /// Target sheet name; sanitized before use.
    pub sheet_name: String,
    /// Header row format.
    pub fmt_header: SpecCellFormat,
    /// Format applied to date-time cells.
    pub fmt_datetime: SpecCellFormat,
    /// Format applied to duration cells.
    pub fmt_duration: SpecCellFormat,
    /// Freeze the header row.
    pub if_freeze_header: bool,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        let dict_fmt = derive_default_xlsx_formats();
        let derive_fmt = |key: EnumFmtKey| dict_fmt.get(key.as_str()).cloned().unwrap_or_default();
        Self {
            sheet_name: C_SHEET_NAME_MERGED.to_string(),
            fmt_header: derive_fmt(EnumFmtKey::Header),
            fmt_datetime: derive_fmt(EnumFmtKey::DateTime),
            fmt_duration: derive_fmt(EnumFmtKey::Duration),
            if_freeze_header: false,
            policy_autofit: SpecAutofitCellsPolicy::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failure to read one workbook. Scoped to a single input file.
#[derive(Debug, Error)]
pub enum SheetReadError {
    /// Content is not a recognized/parsable spreadsheet container.
    #[error("cannot open spreadsheet: {0}")]
    FileOpen(String),
    /// A sheet inside an otherwise openable workbook could not be parsed.
    #[error("cannot parse sheet {sheet_name:?}: {message}")]
    SheetParse {
        /// Failing sheet.
        sheet_name: String,
        /// Parser error text.
        message: String,
    },
}

/// Failure to serialize a table. Fatal for the whole request.
#[derive(Debug, Error)]
pub enum XlsxWriteError {
    /// Invalid write option values.
    #[error("invalid write options: {0}")]
    InvalidOptions(String),
    /// Table shape does not fit one Excel worksheet.
    #[error("table of {n_rows} rows x {n_cols} columns exceeds one Excel sheet")]
    ExcelLimitExceeded {
        /// Rows including header.
        n_rows: usize,
        /// Columns.
        n_cols: usize,
    },
    /// Column names collide.
    #[error("{0}")]
    DuplicateColumns(String),
    /// Row length disagrees with the column count.
    #[error("row {row_idx} has {n_cells} cells, expected {n_cols}")]
    RaggedRow {
        /// Zero-based body row.
        row_idx: usize,
        /// Cells found.
        n_cells: usize,
        /// Columns declared.
        n_cols: usize,
    },
    /// A value the container cannot represent.
    #[error("unsupported {kind} value at row {row_idx}, column {column:?}: {message}")]
    UnsupportedValue {
        /// Zero-based body row.
        row_idx: usize,
        /// Column name.
        column: String,
        /// Value kind.
        kind: &'static str,
        /// Detail.
        message: String,
    },
    /// Any error raised by the workbook writer.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// "Top-level call failed" errors for merge/pipeline calls.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Invalid option values.
    #[error("invalid merge options: {0}")]
    InvalidOptions(String),
    /// Serializing the merged table failed.
    #[error("failed to serialize merged table: {0}")]
    Serialize(#[from] XlsxWriteError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
