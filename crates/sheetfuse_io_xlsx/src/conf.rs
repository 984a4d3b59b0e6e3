//! Merge/XLSX constants and default format presets.

use std::collections::BTreeMap;

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Provenance column holding the originating file name.
pub const C_COL_SOURCE_FILE: &str = "Source_File";
/// Provenance column holding the originating sheet name.
pub const C_COL_SHEET_NAME: &str = "Sheet_Name";
/// Prefix used for header cells left empty in the source sheet.
pub const C_COL_UNNAMED_PREFIX: &str = "Unnamed: ";

/// Sheet name of the merged workbook.
pub const C_SHEET_NAME_MERGED: &str = "Merged_Data";
/// Suggested download file name of the merged workbook.
pub const C_FILE_NAME_MERGED: &str = "merged_file.xlsx";
/// MIME type of the merged workbook.
pub const C_MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// Upload extensions a host should offer. The kernel itself sniffs content.
pub const TUP_EXTENSIONS_ACCEPTED: [&str; 2] = [".xlsx", ".xls"];

/// Rows shown by [`crate::pipeline::SpecMergeOutcome::preview`] when no count is given.
pub const N_NROWS_PREVIEW_DEFAULT: usize = 5;

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFmtKey {
    /// Header cell format.
    Header,
    /// Date-time body cell format.
    DateTime,
    /// Duration body cell format.
    Duration,
}

impl EnumFmtKey {
    /// Key used in [`derive_default_xlsx_formats`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::DateTime => "datetime",
            Self::Duration => "duration",
        }
    }
}

/// Build default named format presets used by [`crate::writer::serialize_table`].
///
/// The header preset mirrors what spreadsheet exports conventionally emit:
/// bold, thin border, centered.
pub fn derive_default_xlsx_formats() -> BTreeMap<String, SpecCellFormat> {
    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(
        EnumFmtKey::Header.as_str().to_string(),
        SpecCellFormat {
            bold: Some(true),
            border: Some(1),
            align: Some("center".to_string()),
            valign: Some("top".to_string()),
            ..Default::default()
        },
    );
    dict_fmt.insert(
        EnumFmtKey::DateTime.as_str().to_string(),
        SpecCellFormat {
            num_format: Some("yyyy-mm-dd hh:mm:ss".to_string()),
            ..Default::default()
        },
    );
    dict_fmt.insert(
        EnumFmtKey::Duration.as_str().to_string(),
        SpecCellFormat {
            num_format: Some("[h]:mm:ss".to_string()),
            ..Default::default()
        },
    );
    dict_fmt
}
