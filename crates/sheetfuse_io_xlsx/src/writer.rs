//! XLSX writer kernel that encodes one table as a single-sheet workbook in memory.

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat, SpecTable,
    SpecXlsxWriteOptions, XlsxWriteError,
};
use crate::util::{
    cast_col_num, cast_row_num, estimate_unicode_string_width, estimate_width_len,
    sanitize_sheet_name, validate_sheet_extent, validate_unique_columns,
};

/// Encode `table` as an `.xlsx` workbook with one sheet and return its bytes.
///
/// The header row holds the column names in order; each table row follows in
/// order with its values written as-is. A table without columns produces an
/// empty sheet. Nothing is returned on failure.
pub fn serialize_table(
    table: &SpecTable,
    options: &SpecXlsxWriteOptions,
) -> Result<Vec<u8>, XlsxWriteError> {
    validate_policy_autofit(&options.policy_autofit)?;
    validate_unique_columns(&table.columns).map_err(XlsxWriteError::DuplicateColumns)?;
    validate_sheet_extent(table.height(), table.width())?;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sanitize_sheet_name(&options.sheet_name, "_"))?;
    write_sheet(worksheet, table, options)?;

    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(
    worksheet: &mut Worksheet,
    table: &SpecTable,
    options: &SpecXlsxWriteOptions,
) -> Result<(), XlsxWriteError> {
    let n_width = table.width();
    let fmt_header = derive_rust_xlsx_format(&options.fmt_header);
    let fmt_datetime = derive_rust_xlsx_format(&options.fmt_datetime);
    let fmt_duration = derive_rust_xlsx_format(&options.fmt_duration);

    write_header(worksheet, &table.columns, &fmt_header)?;
    if options.if_freeze_header && n_width > 0 {
        worksheet.set_freeze_panes(1, 0)?;
    }

    let policy_autofit = &options.policy_autofit;
    let if_autofit_body = matches!(
        policy_autofit.rule_columns,
        EnumAutofitColumnsRule::Body | EnumAutofitColumnsRule::All
    );
    let n_rows_autofit_max = policy_autofit
        .height_body_inferred_max
        .unwrap_or(usize::MAX);
    let mut l_width_by_col_body = vec![0usize; n_width];

    for (n_idx_row, row) in table.rows.iter().enumerate() {
        if row.len() != n_width {
            return Err(XlsxWriteError::RaggedRow {
                row_idx: n_idx_row,
                n_cells: row.len(),
                n_cols: n_width,
            });
        }

        for (n_idx_col, value) in row.iter().enumerate() {
            write_cell(
                worksheet,
                1 + n_idx_row,
                n_idx_col,
                value,
                &fmt_datetime,
                &fmt_duration,
            )
            .map_err(|err| match err {
                XlsxWriteError::UnsupportedValue { kind, message, .. } => {
                    XlsxWriteError::UnsupportedValue {
                        row_idx: n_idx_row,
                        column: table.columns[n_idx_col].clone(),
                        kind,
                        message,
                    }
                }
                other => other,
            })?;

            if if_autofit_body && n_idx_row < n_rows_autofit_max {
                l_width_by_col_body[n_idx_col] =
                    usize::max(l_width_by_col_body[n_idx_col], estimate_width_len(value));
            }
        }
    }

    apply_autofit(worksheet, &table.columns, &l_width_by_col_body, policy_autofit)
}

fn write_header(
    worksheet: &mut Worksheet,
    columns: &[String],
    fmt_header: &Format,
) -> Result<(), XlsxWriteError> {
    for (n_idx_col, c_name) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, cast_col_num(n_idx_col)?, c_name, fmt_header)?;
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    fmt_datetime: &Format,
    fmt_duration: &Format,
) -> Result<(), XlsxWriteError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {}
        EnumCellValue::String(val) => {
            worksheet.write_string(n_row, n_col, val)?;
        }
        EnumCellValue::Number(val) => {
            validate_finite(*val, value)?;
            worksheet.write_number(n_row, n_col, *val)?;
        }
        EnumCellValue::Integer(val) => {
            worksheet.write_number(n_row, n_col, *val as f64)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean(n_row, n_col, *val)?;
        }
        EnumCellValue::DateTime(val) => {
            validate_finite(*val, value)?;
            worksheet.write_number_with_format(n_row, n_col, *val, fmt_datetime)?;
        }
        EnumCellValue::Duration(val) => {
            validate_finite(*val, value)?;
            worksheet.write_number_with_format(n_row, n_col, *val, fmt_duration)?;
        }
    }
    Ok(())
}

fn validate_finite(x: f64, value: &EnumCellValue) -> Result<(), XlsxWriteError> {
    if x.is_finite() {
        return Ok(());
    }
    Err(XlsxWriteError::UnsupportedValue {
        row_idx: 0,
        column: String::new(),
        kind: value.kind(),
        message: format!("{x} cannot be stored in a spreadsheet cell"),
    })
}

fn apply_autofit(
    worksheet: &mut Worksheet,
    columns: &[String],
    l_width_by_col_body: &[usize],
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Result<(), XlsxWriteError> {
    if columns.is_empty() || matches!(policy_autofit.rule_columns, EnumAutofitColumnsRule::None)
    {
        return Ok(());
    }

    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    let n_pad = policy_autofit.width_cell_padding;

    for (n_idx_col, c_name) in columns.iter().enumerate() {
        let n_width_header = estimate_unicode_string_width(c_name);
        let n_width_recorded = match policy_autofit.rule_columns {
            EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => n_width_header,
            EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
            EnumAutofitColumnsRule::All => {
                usize::max(n_width_header, l_width_by_col_body[n_idx_col])
            }
        };
        let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
        worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
    }
    Ok(())
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), XlsxWriteError> {
    let c_msg = if policy_autofit.width_cell_min == 0 {
        "policy_autofit.width_cell_min must be >= 1."
    } else if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min."
    } else {
        return Ok(());
    };
    Err(XlsxWriteError::InvalidOptions(c_msg.to_string()))
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(align) = spec.align.as_deref().and_then(derive_format_align) {
        format = format.set_align(align);
    }
    if let Some(align) = spec.valign.as_deref().and_then(derive_format_align) {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{number, text};
    use crate::reader::read_workbook_bytes;

    fn columns(values: &[&str]) -> Vec<String> {
        values.iter().map(|val| val.to_string()).collect()
    }

    #[test]
    fn serialize_table_roundtrips_values() {
        let table = SpecTable::new(
            columns(&["name", "score", "ok", "seen", "note"]),
            vec![
                vec![
                    text("Ann"),
                    number(1.5),
                    EnumCellValue::Boolean(true),
                    EnumCellValue::DateTime(45_292.25),
                    EnumCellValue::None,
                ],
                vec![
                    text("Bob"),
                    number(-2.0),
                    EnumCellValue::Boolean(false),
                    EnumCellValue::None,
                    text("late"),
                ],
            ],
        );

        let v_bytes = serialize_table(&table, &SpecXlsxWriteOptions::default()).expect("write");
        let l_sheets = read_workbook_bytes(&v_bytes, false).expect("read back");
        assert_eq!(l_sheets.len(), 1);
        assert_eq!(l_sheets[0].sheet_name, "Merged_Data");
        assert_eq!(l_sheets[0].table, table);
    }

    #[test]
    fn serialize_table_zero_rows_writes_header_only() {
        let table = SpecTable::new(columns(&["a", "b"]), vec![]);
        let v_bytes = serialize_table(&table, &SpecXlsxWriteOptions::default()).expect("write");
        let l_sheets = read_workbook_bytes(&v_bytes, false).expect("read back");
        assert_eq!(l_sheets[0].table.columns, columns(&["a", "b"]));
        assert_eq!(l_sheets[0].table.height(), 0);
    }

    #[test]
    fn serialize_table_without_columns_writes_empty_sheet() {
        let v_bytes =
            serialize_table(&SpecTable::default(), &SpecXlsxWriteOptions::default()).expect("write");
        let l_sheets = read_workbook_bytes(&v_bytes, false).expect("read back");
        assert_eq!(l_sheets.len(), 1);
        assert_eq!(l_sheets[0].table, SpecTable::default());
    }

    #[test]
    fn serialize_table_integer_cells_read_back_as_numbers() {
        let table = SpecTable::new(columns(&["n"]), vec![vec![EnumCellValue::Integer(42)]]);
        let v_bytes = serialize_table(&table, &SpecXlsxWriteOptions::default()).expect("write");
        let l_sheets = read_workbook_bytes(&v_bytes, false).expect("read back");
        assert_eq!(l_sheets[0].table.rows, vec![vec![number(42.0)]]);
    }

    #[test]
    fn serialize_table_uses_sanitized_custom_sheet_name() {
        let options = SpecXlsxWriteOptions {
            sheet_name: "Q1/Q2 [draft]".to_string(),
            if_freeze_header: true,
            ..Default::default()
        };
        let table = SpecTable::new(columns(&["a"]), vec![vec![number(1.0)]]);
        let v_bytes = serialize_table(&table, &options).expect("write");
        let l_sheets = read_workbook_bytes(&v_bytes, false).expect("read back");
        assert_eq!(l_sheets[0].sheet_name, "Q1_Q2 _draft_");
    }

    #[test]
    fn serialize_table_rejects_non_finite_number() {
        let table = SpecTable::new(
            columns(&["a", "b"]),
            vec![vec![number(1.0), number(2.0)], vec![number(3.0), number(f64::NAN)]],
        );
        let err = serialize_table(&table, &SpecXlsxWriteOptions::default()).unwrap_err();
        match err {
            XlsxWriteError::UnsupportedValue {
                row_idx,
                column,
                kind,
                ..
            } => {
                assert_eq!(row_idx, 1);
                assert_eq!(column, "b");
                assert_eq!(kind, "number");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serialize_table_rejects_oversized_string() {
        let table = SpecTable::new(columns(&["a"]), vec![vec![text(&"x".repeat(40_000))]]);
        let err = serialize_table(&table, &SpecXlsxWriteOptions::default()).unwrap_err();
        assert!(matches!(err, XlsxWriteError::Xlsx(_)));
    }

    #[test]
    fn serialize_table_rejects_duplicate_and_ragged_input() {
        let table_dup = SpecTable::new(columns(&["a", "a"]), vec![]);
        assert!(matches!(
            serialize_table(&table_dup, &SpecXlsxWriteOptions::default()),
            Err(XlsxWriteError::DuplicateColumns(_))
        ));

        let table_ragged = SpecTable::new(columns(&["a", "b"]), vec![vec![number(1.0)]]);
        assert!(matches!(
            serialize_table(&table_ragged, &SpecXlsxWriteOptions::default()),
            Err(XlsxWriteError::RaggedRow { row_idx: 0, .. })
        ));
    }

    #[test]
    fn serialize_table_body_autofit_is_accepted() {
        let options = SpecXlsxWriteOptions {
            policy_autofit: SpecAutofitCellsPolicy {
                rule_columns: EnumAutofitColumnsRule::All,
                ..Default::default()
            },
            ..Default::default()
        };
        let table = SpecTable::new(columns(&["a"]), vec![vec![text("a long body value")]]);
        assert!(serialize_table(&table, &options).is_ok());

        let options_bad = SpecXlsxWriteOptions {
            policy_autofit: SpecAutofitCellsPolicy {
                width_cell_min: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            serialize_table(&table, &options_bad),
            Err(XlsxWriteError::InvalidOptions(_))
        ));
    }
}
