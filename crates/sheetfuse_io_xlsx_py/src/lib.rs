use std::collections::BTreeMap;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;
use sheetfuse_io_xlsx::{
    MergeError, ReportMerge, SpecInputFile, SpecMergeError, SpecMergeOptions, SpecMergeOutcome,
    SpecTable, SpecXlsxWriteOptions, XlsxWriteError, merge_and_serialize, serialize_table,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "sheetfuse.xlsx.merge.v1";
const C_BRIDGE_TRANSPORT: &str = "polars_ipc";

#[pyclass(name = "SpecMergeError")]
#[derive(Debug, Clone)]
struct PySpecMergeError {
    #[pyo3(get)]
    file_name: String,
    #[pyo3(get)]
    exception: String,
}

impl From<SpecMergeError> for PySpecMergeError {
    fn from(spec_error: SpecMergeError) -> Self {
        Self {
            file_name: spec_error.file_name,
            exception: spec_error.exception,
        }
    }
}

#[pymethods]
impl PySpecMergeError {
    fn __str__(&self) -> String {
        format!("Error processing {}: {}", self.file_name, self.exception)
    }
}

#[pyclass(name = "ReportMerge")]
#[derive(Debug, Clone)]
struct PyReportMerge {
    #[pyo3(get)]
    cnt_files_total: u64,
    #[pyo3(get)]
    cnt_files_merged: u64,
    #[pyo3(get)]
    cnt_files_failed: u64,
    #[pyo3(get)]
    cnt_sheets_merged: u64,
    #[pyo3(get)]
    cnt_rows_merged: u64,
    #[pyo3(get)]
    warnings: Vec<String>,
    #[pyo3(get)]
    errors: Vec<PySpecMergeError>,
    inner: ReportMerge,
}

impl From<ReportMerge> for PyReportMerge {
    fn from(report_merge: ReportMerge) -> Self {
        Self {
            cnt_files_total: report_merge.cnt_files_total,
            cnt_files_merged: report_merge.cnt_files_merged,
            cnt_files_failed: report_merge.cnt_files_failed,
            cnt_sheets_merged: report_merge.cnt_sheets_merged,
            cnt_rows_merged: report_merge.cnt_rows_merged,
            warnings: report_merge.warnings.clone(),
            errors: report_merge
                .errors
                .iter()
                .cloned()
                .map(PySpecMergeError::from)
                .collect(),
            inner: report_merge,
        }
    }
}

#[pymethods]
impl PyReportMerge {
    #[getter]
    fn error_count(&self) -> usize {
        self.inner.error_count()
    }

    #[getter]
    fn warning_count(&self) -> usize {
        self.inner.warning_count()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.inner.to_dict()
    }

    #[pyo3(signature = (prefix = "[MERGE]"))]
    fn format(&self, prefix: &str) -> String {
        self.inner.format(prefix)
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

#[pyclass(name = "MergeOutcome")]
struct PyMergeOutcome {
    #[pyo3(get)]
    report: PyReportMerge,
    #[pyo3(get)]
    n_rows: usize,
    #[pyo3(get)]
    columns: Vec<String>,
    #[pyo3(get)]
    file_name: Option<String>,
    #[pyo3(get)]
    mime: Option<String>,
    content: Option<Vec<u8>>,
    preview_ipc: Vec<u8>,
}

impl PyMergeOutcome {
    fn try_from_outcome(outcome: SpecMergeOutcome, n_rows_preview: usize) -> PyResult<Self> {
        let preview_ipc = outcome
            .preview(Some(n_rows_preview))
            .to_ipc_bytes()
            .map_err(PyRuntimeError::new_err)?;
        let n_rows = outcome.table.height();
        let columns = outcome.table.columns().to_vec();
        let (content, file_name, mime) = match outcome.artifact {
            Some(artifact) => (
                Some(artifact.content),
                Some(artifact.file_name),
                Some(artifact.mime),
            ),
            None => (None, None, None),
        };

        Ok(Self {
            report: PyReportMerge::from(outcome.report),
            n_rows,
            columns,
            file_name,
            mime,
            content,
            preview_ipc,
        })
    }
}

#[pymethods]
impl PyMergeOutcome {
    #[getter]
    fn is_empty(&self) -> bool {
        self.content.is_none()
    }

    #[getter]
    fn content<'py>(&self, py: Python<'py>) -> Option<Bound<'py, PyBytes>> {
        self.content
            .as_deref()
            .map(|v_content| PyBytes::new(py, v_content))
    }

    #[getter]
    fn preview_ipc<'py>(&self, py: Python<'py>) -> Bound<'py, PyBytes> {
        PyBytes::new(py, &self.preview_ipc)
    }
}

fn map_merge_error(exception: MergeError) -> PyErr {
    match exception {
        MergeError::InvalidOptions(message) => PyValueError::new_err(message),
        MergeError::Serialize(err) => map_xlsx_write_error(err),
    }
}

fn map_xlsx_write_error(exception: XlsxWriteError) -> PyErr {
    match exception {
        XlsxWriteError::InvalidOptions(message) => PyValueError::new_err(message),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

#[pyfunction(name = "merge_files")]
#[pyo3(signature = (
    files,
    sheet_name = "Merged_Data",
    col_source_file = "Source_File",
    col_sheet_name = "Sheet_Name",
    if_skip_blank_rows = true,
    n_rows_preview = 5
))]
fn merge_files_py(
    py: Python<'_>,
    files: Vec<(String, Bound<'_, PyBytes>)>,
    sheet_name: &str,
    col_source_file: &str,
    col_sheet_name: &str,
    if_skip_blank_rows: bool,
    n_rows_preview: usize,
) -> PyResult<PyMergeOutcome> {
    let l_files: Vec<SpecInputFile> = files
        .into_iter()
        .map(|(name, content)| SpecInputFile::new(name, content.as_bytes().to_vec()))
        .collect();
    let spec_merge_options = SpecMergeOptions {
        col_source_file: col_source_file.to_string(),
        col_sheet_name: col_sheet_name.to_string(),
        if_skip_blank_rows,
    };
    let spec_write_options = SpecXlsxWriteOptions {
        sheet_name: sheet_name.to_string(),
        ..Default::default()
    };

    let outcome = py
        .allow_threads(|| {
            merge_and_serialize(&l_files, &spec_merge_options, &spec_write_options)
        })
        .map_err(map_merge_error)?;
    PyMergeOutcome::try_from_outcome(outcome, n_rows_preview)
}

#[pyfunction(name = "serialize_ipc")]
#[pyo3(signature = (v_ipc_df, sheet_name = "Merged_Data"))]
fn serialize_ipc_py<'py>(
    py: Python<'py>,
    v_ipc_df: &[u8],
    sheet_name: &str,
) -> PyResult<Bound<'py, PyBytes>> {
    let table = SpecTable::from_ipc_bytes(v_ipc_df).map_err(PyValueError::new_err)?;
    let spec_write_options = SpecXlsxWriteOptions {
        sheet_name: sheet_name.to_string(),
        ..Default::default()
    };

    let v_content = py
        .allow_threads(|| serialize_table(&table, &spec_write_options))
        .map_err(map_xlsx_write_error)?;
    Ok(PyBytes::new(py, &v_content))
}

#[pymodule]
fn _sheetfuse_io_xlsx_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySpecMergeError>()?;
    module.add_class::<PyReportMerge>()?;
    module.add_class::<PyMergeOutcome>()?;
    module.add_function(wrap_pyfunction!(merge_files_py, module)?)?;
    module.add_function(wrap_pyfunction!(serialize_ipc_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
