//! CSV loading.
//!
//! A file is read twice: once with every column as text, which keeps the
//! values exactly as written, and once with inferred dtypes.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use super::{DataProfiler, Dataset};
use crate::error::{Result, ResultExt};

/// Rows polars looks at when inferring dtypes.
const INFER_SCHEMA_ROWS: usize = 100;

/// Read `path` and profile it.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    info!("Loading dataset from: {}", path.display());
    let raw = read_csv(path, Some(0)).context("Failed to read CSV as text")?;
    let typed = read_csv(path, Some(INFER_SCHEMA_ROWS))
        .context("Failed to read CSV with inferred types")?;
    info!("Dataset loaded: {} rows, {} columns", raw.height(), raw.width());
    DataProfiler::profile_frames(&raw, &typed)
}

/// Read with standard quote handling, falling back to polars defaults.
fn read_csv(path: &Path, infer_schema_length: Option<usize>) -> PolarsResult<DataFrame> {
    let quoted = CsvReadOptions::default()
        .with_infer_schema_length(infer_schema_length)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish();
    match quoted {
        Ok(df) => Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
            CsvReadOptions::default()
                .with_infer_schema_length(infer_schema_length)
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
                .finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::TypedValues;

    #[test]
    fn test_load_csv_keeps_raw_text_and_types() {
        let dir = std::env::temp_dir().join("data_auditor_loader_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("small.csv");
        std::fs::write(&path, "code,amount\n007,1.50\n010,2\n,3\n").unwrap();

        let dataset = load_csv(&path).unwrap();
        assert_eq!(dataset.row_count(), 3);

        let code = dataset.column("code").unwrap();
        assert_eq!(code.raw()[0], "007");
        assert_eq!(code.raw()[2], "");

        let amount = dataset.column("amount").unwrap();
        assert_eq!(amount.raw()[0], "1.50");
        assert!(matches!(amount.typed(), TypedValues::Numeric(_)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(load_csv("/definitely/not/here.csv").is_err());
    }
}
