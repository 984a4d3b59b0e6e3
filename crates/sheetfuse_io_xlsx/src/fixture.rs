//! In-memory workbook fixtures for unit tests.

use std::io::{Cursor, Read, Write};

use rust_xlsxwriter::{Format, Workbook};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::spec::EnumCellValue;

pub(crate) fn text(value: &str) -> EnumCellValue {
    EnumCellValue::String(value.to_string())
}

pub(crate) fn number(value: f64) -> EnumCellValue {
    EnumCellValue::Number(value)
}

/// Build an `.xlsx` with one sheet per `(name, header, rows)` entry.
pub(crate) fn build_xlsx_bytes(sheets: &[(&str, &[&str], Vec<Vec<EnumCellValue>>)]) -> Vec<u8> {
    let fmt_datetime = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let mut workbook = Workbook::new();

    for (sheet_name, header, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*sheet_name).expect("sheet name");
        for (n_col, c_name) in header.iter().enumerate() {
            worksheet
                .write_string(0, n_col as u16, *c_name)
                .expect("header cell");
        }
        for (n_row, row) in rows.iter().enumerate() {
            let n_row = n_row as u32 + 1;
            for (n_col, value) in row.iter().enumerate() {
                let n_col = n_col as u16;
                match value {
                    EnumCellValue::None => {}
                    EnumCellValue::String(val) => {
                        worksheet.write_string(n_row, n_col, val).expect("string");
                    }
                    EnumCellValue::Number(val) | EnumCellValue::Duration(val) => {
                        worksheet.write_number(n_row, n_col, *val).expect("number");
                    }
                    EnumCellValue::Integer(val) => {
                        worksheet
                            .write_number(n_row, n_col, *val as f64)
                            .expect("integer");
                    }
                    EnumCellValue::Boolean(val) => {
                        worksheet.write_boolean(n_row, n_col, *val).expect("boolean");
                    }
                    EnumCellValue::DateTime(val) => {
                        worksheet
                            .write_number_with_format(n_row, n_col, *val, &fmt_datetime)
                            .expect("datetime");
                    }
                }
            }
        }
    }

    workbook.save_to_buffer().expect("save workbook")
}

/// Copy an `.xlsx` package, swapping the bytes of the part named `part_name`.
pub(crate) fn replace_xlsx_part(v_xlsx: &[u8], part_name: &str, content: &[u8]) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(v_xlsx)).expect("open package");
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);

    for n_idx in 0..archive.len() {
        let mut file = archive.by_index(n_idx).expect("read part");
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut v_buf = Vec::new();
        file.read_to_end(&mut v_buf).expect("read part bytes");
        if name == part_name {
            v_buf = content.to_vec();
        }
        writer.start_file(name, options).expect("start part");
        writer.write_all(&v_buf).expect("write part");
    }

    writer.finish().expect("finish package").into_inner()
}
