//! Stateless helper utilities used by the reader, merger and writer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{NaiveDate, TimeDelta};

use crate::conf::{
    C_COL_UNNAMED_PREFIX, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, XlsxWriteError};

////////////////////////////////////////////////////////////////////////////////
// #region ValueText

/// Render a float the way a spreadsheet shows a general-format number.
pub fn format_number(x: f64) -> String {
    x.to_string()
}

/// Render an Excel serial (1900 system) as `YYYY-MM-DD HH:MM:SS`.
///
/// Returns `None` when the serial falls outside the representable range.
pub fn format_excel_serial_datetime(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let dt_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let n_ms = (serial * 86_400_000.0).round();
    if n_ms.abs() > i64::MAX as f64 {
        return None;
    }
    let dt = dt_epoch.checked_add_signed(TimeDelta::try_milliseconds(n_ms as i64)?)?;
    Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Render an Excel duration serial (days) as `[h]:mm:ss`.
pub fn format_excel_serial_duration(serial: f64) -> String {
    if !serial.is_finite() {
        return format_number(serial);
    }
    let n_secs_total = (serial * 86_400.0).round() as i64;
    let c_sign = if n_secs_total < 0 { "-" } else { "" };
    let n_secs_abs = n_secs_total.unsigned_abs();
    format!(
        "{c_sign}{}:{:02}:{:02}",
        n_secs_abs / 3_600,
        (n_secs_abs % 3_600) / 60,
        n_secs_abs % 60
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderNormalization

/// Normalize raw header texts into unique column names.
///
/// Empty headers become `Unnamed: {idx}`; repeats become `name.1`, `name.2`, ...
pub fn normalize_header_names(raw_names: &[String]) -> Vec<String> {
    let mut l_names = Vec::with_capacity(raw_names.len());
    let mut set_seen: BTreeSet<String> = BTreeSet::new();
    let mut dict_next_suffix: HashMap<String, usize> = HashMap::new();

    for (n_idx, c_raw) in raw_names.iter().enumerate() {
        let c_base = if c_raw.is_empty() {
            format!("{C_COL_UNNAMED_PREFIX}{n_idx}")
        } else {
            c_raw.clone()
        };

        let mut c_name = c_base.clone();
        if set_seen.contains(&c_name) {
            let n_suffix = dict_next_suffix.entry(c_base.clone()).or_insert(1);
            loop {
                c_name = format!("{c_base}.{n_suffix}");
                *n_suffix += 1;
                if !set_seen.contains(&c_name) {
                    break;
                }
            }
        }

        set_seen.insert(c_name.clone());
        l_names.push(c_name);
    }

    l_names
}

/// Whether every cell in a row is missing.
pub fn is_blank_row(row: &[EnumCellValue]) -> bool {
    row.iter().all(EnumCellValue::is_none)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnUnion

/// Ordered set of column names keeping first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SpecColumnUnion {
    columns: Vec<String>,
    dict_pos: HashMap<String, usize>,
}

impl SpecColumnUnion {
    /// Insert `name` if unseen; return its position either way.
    pub fn insert(&mut self, name: &str) -> usize {
        if let Some(n_idx) = self.dict_pos.get(name) {
            return *n_idx;
        }
        let n_idx = self.columns.len();
        self.columns.push(name.to_string());
        self.dict_pos.insert(name.to_string(), n_idx);
        n_idx
    }

    /// Position of `name`, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.dict_pos.get(name).copied()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether no column was inserted.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Consume into the ordered names.
    pub fn into_columns(self) -> Vec<String> {
        self.columns
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameLikeUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(format!("Duplicate column names detected: {c_msg}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Check that a header row plus `height_body` rows and `width` columns fit one sheet.
pub fn validate_sheet_extent(height_body: usize, width: usize) -> Result<(), XlsxWriteError> {
    let n_rows_total = height_body.saturating_add(1);
    if n_rows_total > N_NROWS_EXCEL_MAX || width > N_NCOLS_EXCEL_MAX {
        return Err(XlsxWriteError::ExcelLimitExceeded {
            n_rows: n_rows_total,
            n_cols: width,
        });
    }
    Ok(())
}

pub(crate) fn cast_row_num(value: usize) -> Result<u32, XlsxWriteError> {
    u32::try_from(value).map_err(|_| XlsxWriteError::ExcelLimitExceeded {
        n_rows: value,
        n_cols: 0,
    })
}

pub(crate) fn cast_col_num(value: usize) -> Result<u16, XlsxWriteError> {
    u16::try_from(value).map_err(|_| XlsxWriteError::ExcelLimitExceeded {
        n_rows: 0,
        n_cols: value,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Estimate displayed width units for one cell value.
///
/// Used by autofit inference logic.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => format_number(*n).len(),
        EnumCellValue::Integer(n) => n.to_string().len(),
        EnumCellValue::Boolean(_) => 5,
        EnumCellValue::DateTime(_) => 19,
        EnumCellValue::Duration(n) => format_excel_serial_duration(*n).len(),
    }
}

/// Width heuristic: non-ASCII glyphs count ~1.6 units.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|val| val.to_string()).collect()
    }

    #[test]
    fn test_normalize_header_names_fills_blanks_and_mangles_repeats() {
        assert_eq!(
            normalize_header_names(&names(&["id", "", "id", "id", " ", "id.1", ""])),
            names(&["id", "Unnamed: 1", "id.1", "id.2", " ", "id.1.1", "Unnamed: 6"])
        );
    }

    #[test]
    fn test_column_union_keeps_first_seen_order() {
        let mut union = SpecColumnUnion::default();
        assert!(union.is_empty());
        assert_eq!(union.insert("X"), 0);
        assert_eq!(union.insert("Y"), 1);
        assert_eq!(union.insert("Y"), 1);
        assert_eq!(union.insert("Z"), 2);
        assert_eq!(union.position("Z"), Some(2));
        assert_eq!(union.len(), 3);
        assert!(!union.is_empty());
        assert_eq!(union.into_columns(), names(&["X", "Y", "Z"]));
    }

    #[test]
    fn test_validate_unique_columns_lists_positions() {
        assert!(validate_unique_columns(&names(&["a", "b"])).is_ok());
        let err = validate_unique_columns(&names(&["a", "b", "a"])).unwrap_err();
        assert_eq!(err, "Duplicate column names detected: \"a\" x2 at indices [0, 2]");
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
    }

    #[test]
    fn test_validate_sheet_extent_counts_header_row() {
        assert!(validate_sheet_extent(N_NROWS_EXCEL_MAX - 1, 3).is_ok());
        assert!(matches!(
            validate_sheet_extent(N_NROWS_EXCEL_MAX, 3),
            Err(XlsxWriteError::ExcelLimitExceeded { .. })
        ));
        assert!(validate_sheet_extent(0, N_NCOLS_EXCEL_MAX + 1).is_err());
    }

    #[test]
    fn test_format_excel_serials() {
        assert_eq!(
            format_excel_serial_datetime(1.0).as_deref(),
            Some("1899-12-31 00:00:00")
        );
        assert_eq!(format_excel_serial_datetime(f64::NAN), None);
        assert_eq!(format_excel_serial_duration(0.0625), "1:30:00");
        assert_eq!(format_excel_serial_duration(-0.5), "-12:00:00");
    }

    #[test]
    fn test_estimate_width_len() {
        assert_eq!(estimate_width_len(&EnumCellValue::None), 0);
        assert_eq!(estimate_width_len(&EnumCellValue::String("abc".into())), 3);
        assert_eq!(estimate_width_len(&EnumCellValue::String("数据".into())), 3);
        assert_eq!(estimate_width_len(&EnumCellValue::Integer(12345)), 5);
    }
}
