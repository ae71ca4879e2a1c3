// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Flat Tables
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Flat numeric tables.
//!
//! Vectors are whitespace- or newline-separated numbers read until the
//! declared length is reached. Matrices hold one row per non-empty line,
//! values separated by whitespace; surplus columns are ignored.

use crate::error::{BasinError, BasinResult};
use ndarray::Array2;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

fn table_error(origin: &str, message: String) -> BasinError {
    BasinError::Table {
        path: origin.to_string(),
        message,
    }
}

fn parse_number(token: &str, origin: &str) -> BasinResult<f64> {
    let value = token
        .parse::<f64>()
        .map_err(|e| table_error(origin, format!("invalid number '{token}': {e}")))?;
    if !value.is_finite() {
        return Err(table_error(origin, format!("non-finite value '{token}'")));
    }
    Ok(value)
}

/// Parse the first `len` numbers of `text`, in reading order.
pub fn parse_vector(text: &str, len: usize, origin: &str) -> BasinResult<Vec<f64>> {
    let mut out = Vec::with_capacity(len);
    for token in text.split_whitespace().take(len) {
        out.push(parse_number(token, origin)?);
    }
    if out.len() < len {
        return Err(table_error(
            origin,
            format!("expected {len} values, found {}", out.len()),
        ));
    }
    Ok(out)
}

/// Parse `len` non-negative integer counts, one per line.
///
/// Values written as floats (`31.0`) are truncated toward zero.
pub fn parse_int_vector(text: &str, len: usize, origin: &str) -> BasinResult<Vec<u32>> {
    let mut out = Vec::with_capacity(len);
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()).take(len) {
        let value = parse_number(line, origin)?;
        if value < 0.0 || value > u32::MAX as f64 {
            return Err(table_error(origin, format!("count out of range: {value}")));
        }
        out.push(value.trunc() as u32);
    }
    if out.len() < len {
        return Err(table_error(
            origin,
            format!("expected {len} counts, found {}", out.len()),
        ));
    }
    Ok(out)
}

/// Parse a `rows × cols` matrix, one row per non-empty line.
pub fn parse_matrix(text: &str, rows: usize, cols: usize, origin: &str) -> BasinResult<Array2<f64>> {
    let mut out = Array2::zeros((rows, cols));
    let mut filled = 0;
    for (i, line) in text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(rows)
        .enumerate()
    {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < cols {
            return Err(table_error(
                origin,
                format!("row {i} has {} columns, expected {cols}", tokens.len()),
            ));
        }
        for (j, token) in tokens.iter().take(cols).enumerate() {
            out[[i, j]] = parse_number(token, origin)?;
        }
        filled += 1;
    }
    if filled < rows {
        return Err(table_error(
            origin,
            format!("expected {rows} rows, found {filled}"),
        ));
    }
    Ok(out)
}

fn read_table(path: &Path) -> BasinResult<String> {
    fs::read_to_string(path).map_err(|e| table_error(&path.display().to_string(), e.to_string()))
}

pub fn load_vector(path: &Path, len: usize) -> BasinResult<Vec<f64>> {
    parse_vector(&read_table(path)?, len, &path.display().to_string())
}

pub fn load_int_vector(path: &Path, len: usize) -> BasinResult<Vec<u32>> {
    parse_int_vector(&read_table(path)?, len, &path.display().to_string())
}

pub fn load_matrix(path: &Path, rows: usize, cols: usize) -> BasinResult<Array2<f64>> {
    parse_matrix(&read_table(path)?, rows, cols, &path.display().to_string())
}

/// Write rows of numbers, space separated, one row per line.
pub fn write_rows<R: AsRef<[f64]>>(path: &Path, rows: &[R]) -> BasinResult<()> {
    let mut text = String::new();
    for row in rows {
        let mut first = true;
        for v in row.as_ref() {
            if !first {
                text.push(' ');
            }
            // Writing into a String cannot fail.
            let _ = write!(text, "{v}");
            first = false;
        }
        text.push('\n');
    }
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_across_lines() {
        let v = parse_vector("1 2\n3\n4 5 6", 4, "mem").unwrap();
        assert_eq!(v, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_parse_vector_too_short() {
        let err = parse_vector("1 2", 3, "short.txt").unwrap_err();
        match err {
            BasinError::Table { path, message } => {
                assert_eq!(path, "short.txt");
                assert!(message.contains("expected 3"), "{message}");
            }
            other => panic!("Unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_vector_rejects_garbage() {
        assert!(parse_vector("1 x 3", 3, "mem").is_err());
        assert!(parse_vector("1 NaN 3", 3, "mem").is_err());
    }

    #[test]
    fn test_parse_int_vector_truncates() {
        let v = parse_int_vector("31\n28.0\n\n31\n", 3, "mem").unwrap();
        assert_eq!(v, vec![31, 28, 31]);
        assert!(parse_int_vector("-1\n", 1, "mem").is_err());
    }

    #[test]
    fn test_parse_matrix_rows_and_surplus_columns() {
        let m = parse_matrix("1 2 3 99\n\n4 5 6\n", 2, 3, "mem").unwrap();
        assert_eq!(m.shape(), &[2, 3]);
        assert_eq!(m[[0, 2]], 3.0);
        assert_eq!(m[[1, 0]], 4.0);
    }

    #[test]
    fn test_parse_matrix_missing_row() {
        assert!(parse_matrix("1 2 3\n", 2, 3, "mem").is_err());
        assert!(parse_matrix("1 2\n3 4\n", 2, 3, "mem").is_err());
    }

    #[test]
    fn test_write_then_load_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.txt");
        write_rows(&path, &[vec![1.5, 2.0], vec![-3.0, 4.25]]).unwrap();
        let m = load_matrix(&path, 2, 2).unwrap();
        assert_eq!(m[[0, 0]], 1.5);
        assert_eq!(m[[1, 1]], 4.25);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = load_vector(Path::new("/nonexistent/evap.txt"), 12).unwrap_err();
        assert!(err.to_string().contains("evap.txt"), "{err}");
    }
}
