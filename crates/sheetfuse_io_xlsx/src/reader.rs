//! Workbook reader: one spreadsheet container -> one table per sheet.
//!
//! The container kind (`.xls`, `.xlsx`/`.xlsm`, `.xlsb`, `.ods`) is detected
//! from content, never from the file name.

use std::io::Cursor;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use log::debug;

use crate::spec::{EnumCellValue, SheetReadError, SpecInputFile, SpecSheetTable, SpecTable};
use crate::util::{
    format_excel_serial_datetime, format_number, is_blank_row, normalize_header_names,
};

/// Read every sheet of `file`, in workbook order.
///
/// Any failure (container or single sheet) fails the whole file.
pub fn read_workbook_tables(
    file: &SpecInputFile,
    if_skip_blank_rows: bool,
) -> Result<Vec<SpecSheetTable>, SheetReadError> {
    read_workbook_bytes(&file.content, if_skip_blank_rows)
}

/// Read every sheet of an in-memory container, in workbook order.
pub fn read_workbook_bytes(
    content: &[u8],
    if_skip_blank_rows: bool,
) -> Result<Vec<SpecSheetTable>, SheetReadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content))
        .map_err(|err| SheetReadError::FileOpen(err.to_string()))?;

    let l_sheet_names: Vec<String> = workbook.sheet_names().to_owned();
    let mut l_sheet_tables = Vec::with_capacity(l_sheet_names.len());
    for sheet_name in l_sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|err| SheetReadError::SheetParse {
                sheet_name: sheet_name.clone(),
                message: err.to_string(),
            })?;
        let table = parse_sheet_range(&range, if_skip_blank_rows);
        debug!(
            "parsed sheet {sheet_name:?}: {} rows x {} columns",
            table.height(),
            table.width()
        );
        l_sheet_tables.push(SpecSheetTable { sheet_name, table });
    }

    Ok(l_sheet_tables)
}

/// Parse a used range: first row is the header, the rest is data.
///
/// Columns are anchored at column A: blank leading columns before the used
/// range are kept as `Unnamed: {i}` columns with missing values.
/// An empty range yields a table with no columns and no rows.
pub fn parse_sheet_range(range: &Range<Data>, if_skip_blank_rows: bool) -> SpecTable {
    let mut iter_rows = range.rows();
    let Some(row_header) = iter_rows.next() else {
        return SpecTable::default();
    };
    let n_col_start = range.start().map_or(0, |(_, n_col)| n_col as usize);

    let l_header_raw: Vec<String> = std::iter::repeat_n(String::new(), n_col_start)
        .chain(row_header.iter().map(derive_header_text))
        .collect();
    let columns = normalize_header_names(&l_header_raw);

    let mut rows = Vec::with_capacity(range.height().saturating_sub(1));
    for row_raw in iter_rows {
        let row: Vec<EnumCellValue> = std::iter::repeat_n(EnumCellValue::None, n_col_start)
            .chain(row_raw.iter().map(convert_data_to_cell_value))
            .collect();
        if if_skip_blank_rows && is_blank_row(&row) {
            continue;
        }
        rows.push(row);
    }

    SpecTable::new(columns, rows)
}

/// Map a parser cell onto [`EnumCellValue`] without coercion.
///
/// Error cells become their literal text (`#DIV/0!`, `#N/A`, ...).
pub fn convert_data_to_cell_value(data: &Data) -> EnumCellValue {
    match data {
        Data::Empty => EnumCellValue::None,
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Int(val) => EnumCellValue::Integer(*val),
        Data::Bool(val) => EnumCellValue::Boolean(*val),
        Data::DateTime(val) => {
            if val.is_duration() {
                EnumCellValue::Duration(val.as_f64())
            } else {
                EnumCellValue::DateTime(val.as_f64())
            }
        }
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::String(val.clone()),
        Data::Error(err) => EnumCellValue::String(err.to_string()),
    }
}

fn derive_header_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::Float(val) => format_number(*val),
        Data::DateTime(val) => format_excel_serial_datetime(val.as_f64())
            .unwrap_or_else(|| format_number(val.as_f64())),
        _ => convert_data_to_cell_value(data).to_string(),
    }
}
