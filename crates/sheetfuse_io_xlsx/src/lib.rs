//! `sheetfuse_io_xlsx` v1:
//! Rust-side spreadsheet merge kernel.
//!
//! Architecture:
//! - `conf`     : constants and default presets
//! - `spec`     : specs/models/options/errors
//! - `util`     : pure helper functions
//! - `reader`   : workbook bytes -> per-sheet tables
//! - `merger`   : multi-file union with provenance columns
//! - `report`   : merge counters and per-file diagnostics
//! - `writer`   : table -> single-sheet `.xlsx` bytes
//! - `frame`    : Polars `DataFrame`/IPC interop
//! - `pipeline` : merge-then-serialize download artifact
pub mod conf;
pub mod frame;
pub mod merger;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod spec;
pub mod util;
pub mod writer;

#[cfg(test)]
mod fixture;

pub use conf::{
    C_COL_SHEET_NAME, C_COL_SOURCE_FILE, C_FILE_NAME_MERGED, C_MIME_XLSX, C_SHEET_NAME_MERGED,
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_NROWS_PREVIEW_DEFAULT,
    TUP_EXCEL_ILLEGAL, TUP_EXTENSIONS_ACCEPTED,
};
pub use merger::{SpecMergeResult, merge_files};
pub use pipeline::{SpecDownloadArtifact, SpecMergeOutcome, merge_and_serialize};
pub use reader::{read_workbook_bytes, read_workbook_tables};
pub use report::{ReportMerge, ReportMergeBuilder, SpecMergeError};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, MergeError, SheetReadError, SpecAutofitCellsPolicy,
    SpecCellFormat, SpecInputFile, SpecMergeOptions, SpecSheetTable, SpecTable,
    SpecUnionedTable, SpecXlsxWriteOptions, XlsxWriteError,
};
pub use util::{normalize_header_names, sanitize_sheet_name};
pub use writer::serialize_table;
