//! Polars interop: table <-> `DataFrame` and IPC payloads.
//!
//! Hosts use the IPC form to ship a preview to a dataframe library, and to
//! hand any frame back for serialization through the same writer.

use std::io::Cursor;

use polars::prelude::{
    AnyValue, Column, DataFrame, IpcReader, IpcWriter, NamedFrom, PlSmallStr, SerReader,
    SerWriter, Series,
};

use crate::spec::{EnumCellValue, SpecTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumFrameDtype {
    Null,
    Integer,
    Float,
    Boolean,
    Text,
}

impl EnumFrameDtype {
    fn absorb(self, value: &EnumCellValue) -> Self {
        let dtype_value = match value {
            EnumCellValue::None => return self,
            EnumCellValue::Integer(_) => Self::Integer,
            EnumCellValue::Number(_) => Self::Float,
            EnumCellValue::Boolean(_) => Self::Boolean,
            _ => Self::Text,
        };
        match (self, dtype_value) {
            (Self::Null, other) => other,
            (current, other) if current == other => current,
            (Self::Integer, Self::Float) | (Self::Float, Self::Integer) => Self::Float,
            _ => Self::Text,
        }
    }
}

impl SpecTable {
    /// Convert into a `DataFrame`, one typed column per table column.
    ///
    /// A column is Int64 when every present value is an integer, Float64 when
    /// every present value is numeric, Boolean when every present value is a
    /// boolean, and String (display text) otherwise.
    pub fn to_dataframe(&self) -> Result<DataFrame, String> {
        let l_columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(n_idx_col, c_name)| {
                derive_column_from_cells(
                    c_name,
                    self.rows
                        .iter()
                        .map(move |row| row.get(n_idx_col).unwrap_or(&EnumCellValue::None)),
                )
            })
            .collect::<Vec<_>>();
        DataFrame::new(l_columns).map_err(|err| format!("Failed to build DataFrame: {err}"))
    }

    /// Serialize into Polars IPC bytes.
    pub fn to_ipc_bytes(&self) -> Result<Vec<u8>, String> {
        let mut df = self.to_dataframe()?;
        let mut v_buf = Vec::new();
        IpcWriter::new(&mut v_buf)
            .finish(&mut df)
            .map_err(|err| format!("Failed to write IPC DataFrame bytes: {err}"))?;
        Ok(v_buf)
    }

    /// Build a table from any `DataFrame`.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self, String> {
        let columns: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let l_cols = df.get_columns();

        let mut rows = Vec::with_capacity(df.height());
        for n_idx_row in 0..df.height() {
            let mut row = Vec::with_capacity(l_cols.len());
            for col in l_cols {
                let value = col
                    .get(n_idx_row)
                    .map_err(|err| format!("Failed to access cell value: {err}"))?;
                row.push(derive_cell_value_from_any_value(value));
            }
            rows.push(row);
        }

        Ok(SpecTable::new(columns, rows))
    }

    /// Build a table from Polars IPC bytes.
    pub fn from_ipc_bytes(v_ipc_df: &[u8]) -> Result<Self, String> {
        let df = IpcReader::new(Cursor::new(v_ipc_df))
            .finish()
            .map_err(|err| format!("Failed to read IPC DataFrame bytes: {err}"))?;
        Self::from_dataframe(&df)
    }
}

fn derive_column_from_cells<'a>(
    name: &str,
    cells: impl Iterator<Item = &'a EnumCellValue> + Clone,
) -> Column {
    let c_name = PlSmallStr::from(name);
    let dtype = cells
        .clone()
        .fold(EnumFrameDtype::Null, |dtype, value| dtype.absorb(value));

    let series = match dtype {
        EnumFrameDtype::Integer => {
            let l_values: Vec<Option<i64>> = cells
                .map(|value| match value {
                    EnumCellValue::Integer(val) => Some(*val),
                    _ => None,
                })
                .collect();
            Series::new(c_name, l_values)
        }
        EnumFrameDtype::Float => {
            let l_values: Vec<Option<f64>> = cells
                .map(|value| match value {
                    EnumCellValue::Number(val) => Some(*val),
                    EnumCellValue::Integer(val) => Some(*val as f64),
                    _ => None,
                })
                .collect();
            Series::new(c_name, l_values)
        }
        EnumFrameDtype::Boolean => {
            let l_values: Vec<Option<bool>> = cells
                .map(|value| match value {
                    EnumCellValue::Boolean(val) => Some(*val),
                    _ => None,
                })
                .collect();
            Series::new(c_name, l_values)
        }
        EnumFrameDtype::Null | EnumFrameDtype::Text => {
            let l_values: Vec<Option<String>> = cells
                .map(|value| (!value.is_none()).then(|| value.to_string()))
                .collect();
            Series::new(c_name, l_values)
        }
    };

    Column::from(series)
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::UInt8(val) => EnumCellValue::Integer(val as i64),
        AnyValue::UInt16(val) => EnumCellValue::Integer(val as i64),
        AnyValue::UInt32(val) => EnumCellValue::Integer(val as i64),
        AnyValue::UInt64(val) => match i64::try_from(val) {
            Ok(val) => EnumCellValue::Integer(val),
            Err(_) => EnumCellValue::Number(val as f64),
        },
        AnyValue::Int8(val) => EnumCellValue::Integer(val as i64),
        AnyValue::Int16(val) => EnumCellValue::Integer(val as i64),
        AnyValue::Int32(val) => EnumCellValue::Integer(val as i64),
        AnyValue::Int64(val) => EnumCellValue::Integer(val),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::DataType;

    use super::*;

    fn build_table() -> SpecTable {
        SpecTable::new(
            vec![
                "id".to_string(),
                "score".to_string(),
                "flag".to_string(),
                "mixed".to_string(),
                "blank".to_string(),
            ],
            vec![
                vec![
                    EnumCellValue::Integer(1),
                    EnumCellValue::Number(0.5),
                    EnumCellValue::Boolean(true),
                    EnumCellValue::String("a".to_string()),
                    EnumCellValue::None,
                ],
                vec![
                    EnumCellValue::None,
                    EnumCellValue::Integer(2),
                    EnumCellValue::None,
                    EnumCellValue::Number(3.0),
                    EnumCellValue::None,
                ],
            ],
        )
    }

    #[test]
    fn test_to_dataframe_infers_column_dtypes() {
        let df = build_table().to_dataframe().expect("dataframe");
        assert_eq!(df.height(), 2);
        let l_dtypes: Vec<DataType> = df
            .get_columns()
            .iter()
            .map(|col| col.dtype().clone())
            .collect();
        assert_eq!(
            l_dtypes,
            vec![
                DataType::Int64,
                DataType::Float64,
                DataType::Boolean,
                DataType::String,
                DataType::String,
            ]
        );
    }

    #[test]
    fn test_ipc_bytes_preserve_values() {
        let v_ipc = build_table().to_ipc_bytes().expect("ipc");
        let table = SpecTable::from_ipc_bytes(&v_ipc).expect("table");
        assert_eq!(table.columns, build_table().columns);
        assert_eq!(table.get(0, "id"), Some(&EnumCellValue::Integer(1)));
        assert_eq!(table.get(1, "id"), Some(&EnumCellValue::None));
        assert_eq!(table.get(1, "score"), Some(&EnumCellValue::Number(2.0)));
        assert_eq!(table.get(0, "flag"), Some(&EnumCellValue::Boolean(true)));
        assert_eq!(
            table.get(1, "mixed"),
            Some(&EnumCellValue::String("3".to_string()))
        );
        assert_eq!(table.get(0, "blank"), Some(&EnumCellValue::None));
    }

    #[test]
    fn test_to_dataframe_treats_short_rows_as_missing() {
        let table = SpecTable {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![
                vec![EnumCellValue::Integer(1)],
                vec![EnumCellValue::Integer(2), EnumCellValue::Integer(5)],
            ],
        };
        let df = table.to_dataframe().expect("dataframe");
        assert_eq!(df.height(), 2);

        let table_back = SpecTable::from_dataframe(&df).expect("table");
        assert_eq!(table_back.get(0, "b"), Some(&EnumCellValue::None));
        assert_eq!(table_back.get(1, "b"), Some(&EnumCellValue::Integer(5)));
    }

    #[test]
    fn test_empty_table_converts() {
        let df = SpecTable::default().to_dataframe().expect("dataframe");
        assert_eq!(df.width(), 0);
        assert_eq!(df.height(), 0);
    }
}
