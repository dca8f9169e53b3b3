//! CSV matrix I/O
//!
//! Supports loading dense point sets from CSV files where:
//! - Each row is one point and every column is a feature
//! - First row can be headers (automatically detected)
//! - Blank lines and lines starting with `#` are skipped
//!
//! Loaded matrices are D×N: one column per point.

use crate::core::{Result, TreeError};
use ndarray::Array2;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Dense point set loaded from CSV
#[derive(Debug, Clone)]
pub struct CsvDataset {
    points: Array2<f64>,
}

impl CsvDataset {
    /// Load a dataset from a CSV file
    ///
    /// Headers are automatically detected if present.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(TreeError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader, detecting a header line
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, true)
    }

    /// Load a dataset from a reader with explicit header option
    pub fn from_reader_with_options<R: BufRead>(
        reader: R,
        auto_detect_header: bool,
    ) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut first = true;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(TreeError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if first {
                first = false;
                if auto_detect_header && Self::is_header_line(line) {
                    continue;
                }
            }

            let row = Self::parse_data_line(line, line_no + 1)?;
            if let Some(previous) = rows.first() {
                if previous.len() != row.len() {
                    return Err(TreeError::ParseError(format!(
                        "Line {} has {} fields, expected {}",
                        line_no + 1,
                        row.len(),
                        previous.len()
                    )));
                }
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(TreeError::EmptyDataset);
        }

        let dims = rows[0].len();
        let points = Array2::from_shape_fn((dims, rows.len()), |(d, j)| rows[j][d]);
        Ok(CsvDataset { points })
    }

    /// Check if a line appears to be a header
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();

        // Most fields non-numeric means a header
        let non_numeric_count = fields
            .iter()
            .filter(|field| field.trim().parse::<f64>().is_err())
            .count();

        non_numeric_count * 2 > fields.len()
    }

    /// Parse a CSV data line into feature values
    fn parse_data_line(line: &str, line_no: usize) -> Result<Vec<f64>> {
        line.split(',')
            .map(|f| f.trim())
            .enumerate()
            .map(|(col, field)| {
                field.parse::<f64>().map_err(|_| {
                    TreeError::ParseError(format!(
                        "Invalid value at line {}, column {}: {}",
                        line_no,
                        col + 1,
                        field
                    ))
                })
            })
            .collect()
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.points.ncols() == 0
    }

    /// Number of features per point
    pub fn dim(&self) -> usize {
        self.points.nrows()
    }

    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    pub fn into_points(self) -> Array2<f64> {
        self.points
    }
}

/// Load a D×N matrix (one point per CSV row)
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    Ok(CsvDataset::from_file(path)?.into_points())
}

/// Load integer class labels, one or more per line
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    let file = File::open(path).map_err(TreeError::IoError)?;
    let mut labels = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(TreeError::IoError)?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for field in line.split(',') {
            let field = field.trim();
            let label = field.parse::<usize>().map_err(|_| {
                TreeError::ParseError(format!("Invalid label at line {}: {}", line_no + 1, field))
            })?;
            labels.push(label);
        }
    }
    Ok(labels)
}

/// Write a matrix with one CSV row per column (per point or per query)
pub fn save_columns<T: Display, P: AsRef<Path>>(path: P, matrix: &Array2<T>) -> Result<()> {
    let file = File::create(path).map_err(TreeError::IoError)?;
    let mut writer = BufWriter::new(file);
    for column in matrix.columns() {
        let fields: Vec<String> = column.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", fields.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_csv_basic() {
        let data = "1.0,2.0\n3.0,4.0\n5.0,6.0\n";
        let dataset = CsvDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.dim(), 2);
        assert_eq!(dataset.points(), &array![[1.0, 3.0, 5.0], [2.0, 4.0, 6.0]]);
    }

    #[test]
    fn test_csv_with_headers() {
        let data = "x,y\n1.0,2.0\n3.0,4.0\n";
        let dataset = CsvDataset::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_csv_empty_lines_and_comments() {
        let data = "# Comment\n1.0,2.0\n\n3.0,4.0\n";
        let dataset = CsvDataset::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_csv_invalid_format() {
        let result = CsvDataset::from_reader(Cursor::new("1.0,abc\n"));
        assert!(matches!(result, Err(TreeError::ParseError(_))));

        let ragged = CsvDataset::from_reader(Cursor::new("1.0,2.0\n3.0\n"));
        assert!(matches!(ragged, Err(TreeError::ParseError(_))));

        let empty = CsvDataset::from_reader(Cursor::new("# nothing\n"));
        assert!(matches!(empty, Err(TreeError::EmptyDataset)));
    }

    #[test]
    fn test_csv_manual_header_control() {
        let data = "x,y\n1.0,2.0\n";
        let result = CsvDataset::from_reader_with_options(Cursor::new(data), false);
        assert!(result.is_err());
    }

    #[test]
    fn test_is_header_line() {
        assert!(CsvDataset::is_header_line("feature1,feature2,label"));
        assert!(CsvDataset::is_header_line("x"));
        assert!(!CsvDataset::is_header_line("1.0,2.0,3.0"));
        assert!(!CsvDataset::is_header_line("1.0,b,3.0"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.csv");
        let matrix = array![[1.5, -2.0], [0.25, 4.0], [3.0, 0.0]];

        save_columns(&path, &matrix).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "1.5,0.25,3\n-2,4,0\n");
        assert_eq!(load_matrix(&path).unwrap(), matrix);
    }

    #[test]
    fn test_load_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        std::fs::write(&path, "0\n1\n# skipped\n2\n").unwrap();
        assert_eq!(load_labels(&path).unwrap(), vec![0, 1, 2]);

        std::fs::write(&path, "0\n-1\n").unwrap();
        assert!(load_labels(&path).is_err());
    }
}
