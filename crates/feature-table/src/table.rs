//! Feature Table TSV Reader/Writer
//!
//! Reads and writes the classic BIOM text layout:
//!
//! ```text
//! # Constructed from biom file
//! #OTU ID	sample1	sample2
//! otu_a	0.25	0.0
//! otu_b	0.75	1.0
//! ```
//!
//! Features are rows and samples are columns unless
//! [`Orientation::SamplesAsRows`] is requested.

use crate::error::TableError;
use feature_align::FeatureMatrix;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

const BIOM_COMMENT: &str = "# Constructed from biom file";
const FEATURE_CORNER: &str = "#OTU ID";
const SAMPLE_CORNER: &str = "#SampleID";

/// Which axis the rows of a TSV table hold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// One row per feature, one column per sample (BIOM layout)
    #[default]
    FeaturesAsRows,
    /// One row per sample, one column per feature
    SamplesAsRows,
}

/// Read a feature table from a TSV file
pub fn read_feature_table(
    path: impl AsRef<Path>,
    orientation: Orientation,
) -> Result<FeatureMatrix, TableError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| TableError::io(path, e))?;
    let matrix = parse_feature_table(BufReader::new(file), orientation)?;

    info!(
        "Loaded feature table {}: {} samples x {} features",
        path.display(),
        matrix.n_samples(),
        matrix.n_features()
    );
    Ok(matrix)
}

/// Parse a feature table from any TSV source
pub fn parse_feature_table<R: Read>(
    reader: R,
    orientation: Orientation,
) -> Result<FeatureMatrix, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);
    let mut records = reader.records();

    // Leading "# ..." lines are comments; the first other line is the header.
    let columns: Vec<String> = loop {
        let record = records
            .next()
            .ok_or_else(|| TableError::InvalidFormat("missing header line".to_string()))??;
        let first = record.get(0).unwrap_or("");
        if first == "#" || first.starts_with("# ") {
            continue;
        }
        break record.iter().skip(1).map(str::to_string).collect();
    };

    let mut row_ids = Vec::new();
    let mut flat = Vec::new();
    for result in records {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != columns.len() + 1 {
            return Err(TableError::InvalidFormat(format!(
                "line {} has {} fields, header declares {}",
                line,
                record.len(),
                columns.len() + 1
            )));
        }

        let mut fields = record.iter();
        row_ids.push(fields.next().unwrap_or("").to_string());
        for (column, cell) in columns.iter().zip(fields) {
            flat.push(parse_cell(cell, line, column)?);
        }
    }

    debug!("Parsed {} rows x {} columns", row_ids.len(), columns.len());

    let grid = Array2::from_shape_vec((row_ids.len(), columns.len()), flat)
        .map_err(|e| TableError::InvalidFormat(e.to_string()))?;

    let matrix = match orientation {
        Orientation::SamplesAsRows => FeatureMatrix::new(row_ids, columns, grid)?,
        Orientation::FeaturesAsRows => {
            let by_sample = grid.reversed_axes().as_standard_layout().into_owned();
            FeatureMatrix::new(columns, row_ids, by_sample)?
        }
    };
    Ok(matrix)
}

fn parse_cell(cell: &str, line: u64, column: &str) -> Result<f64, TableError> {
    let trimmed = cell.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TableError::InvalidValue {
            value: trimmed.to_string(),
            line,
            column: column.to_string(),
        })
}

/// Write a feature table to a TSV file
pub fn write_feature_table(
    matrix: &FeatureMatrix,
    path: impl AsRef<Path>,
    orientation: Orientation,
) -> Result<(), TableError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| TableError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    format_feature_table(matrix, &mut writer, orientation)?;
    writer.flush().map_err(|e| TableError::io(path, e))?;

    info!(
        "Wrote feature table {}: {} samples x {} features",
        path.display(),
        matrix.n_samples(),
        matrix.n_features()
    );
    Ok(())
}

/// Serialize a feature table as TSV into any sink
pub fn format_feature_table<W: Write>(
    matrix: &FeatureMatrix,
    sink: W,
    orientation: Orientation,
) -> Result<(), TableError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(sink);

    let values = matrix.values();
    match orientation {
        Orientation::FeaturesAsRows => {
            writer.write_record([BIOM_COMMENT])?;
            writer.write_record(
                std::iter::once(FEATURE_CORNER).chain(matrix.sample_ids().iter().map(String::as_str)),
            )?;
            for (col, feature) in matrix.feature_ids().iter().enumerate() {
                let cells = values.column(col).iter().map(|v| v.to_string()).collect::<Vec<_>>();
                writer.write_record(std::iter::once(feature.clone()).chain(cells))?;
            }
        }
        Orientation::SamplesAsRows => {
            writer.write_record(
                std::iter::once(SAMPLE_CORNER).chain(matrix.feature_ids().iter().map(String::as_str)),
            )?;
            for (row, sample) in matrix.sample_ids().iter().enumerate() {
                let cells = values.row(row).iter().map(|v| v.to_string()).collect::<Vec<_>>();
                writer.write_record(std::iter::once(sample.clone()).chain(cells))?;
            }
        }
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIOM_TSV: &str = "# Constructed from biom file\n\
        #OTU ID\ts1\ts2\n\
        otu_a\t1\t0.5\n\
        otu_b\t2\t0\n\
        otu_c\t0\t3\n";

    #[test]
    fn test_parse_biom_layout() {
        let m = parse_feature_table(BIOM_TSV.as_bytes(), Orientation::FeaturesAsRows).unwrap();

        assert_eq!(m.sample_ids(), &["s1".to_string(), "s2".to_string()][..]);
        assert_eq!(m.n_features(), 3);
        assert_eq!(m.get("s1", "otu_b"), Some(2.0));
        assert_eq!(m.get("s2", "otu_a"), Some(0.5));
        assert_eq!(m.get("s2", "otu_c"), Some(3.0));
    }

    #[test]
    fn test_parse_samples_as_rows() {
        let tsv = "id\tA\tB\ns1\t1\t2\ns2\t3\t4\n";
        let m = parse_feature_table(tsv.as_bytes(), Orientation::SamplesAsRows).unwrap();

        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.get("s2", "A"), Some(3.0));
    }

    #[test]
    fn test_header_only_table_has_no_features() {
        let tsv = "#OTU ID\ts1\ts2\n";
        let m = parse_feature_table(tsv.as_bytes(), Orientation::FeaturesAsRows).unwrap();
        assert_eq!(m.shape(), (2, 0));
    }

    #[test]
    fn test_non_numeric_cell_reports_location() {
        let tsv = "#OTU ID\ts1\notu_a\tabc\n";
        let err = parse_feature_table(tsv.as_bytes(), Orientation::FeaturesAsRows).unwrap_err();

        match err {
            TableError::InvalidValue { value, line, column } => {
                assert_eq!(value, "abc");
                assert_eq!(line, 2);
                assert_eq!(column, "s1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_row_rejected() {
        let tsv = "#OTU ID\ts1\ts2\notu_a\t1\n";
        let err = parse_feature_table(tsv.as_bytes(), Orientation::FeaturesAsRows).unwrap_err();
        assert!(matches!(err, TableError::InvalidFormat(_)));
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let tsv = "#OTU ID\ts1\notu_a\t1\notu_a\t2\n";
        let err = parse_feature_table(tsv.as_bytes(), Orientation::FeaturesAsRows).unwrap_err();
        assert!(matches!(err, TableError::Matrix(_)));
    }

    #[test]
    fn test_missing_header_rejected() {
        let tsv = "# Constructed from biom file\n";
        let err = parse_feature_table(tsv.as_bytes(), Orientation::FeaturesAsRows).unwrap_err();
        assert!(matches!(err, TableError::InvalidFormat(_)));
    }

    #[test]
    fn test_written_table_reads_back() {
        let m = parse_feature_table(BIOM_TSV.as_bytes(), Orientation::FeaturesAsRows).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tsv");

        write_feature_table(&m, &path, Orientation::FeaturesAsRows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Constructed from biom file\n#OTU ID\ts1\ts2\n"));

        let back = read_feature_table(&path, Orientation::FeaturesAsRows).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_missing_file() {
        let err = read_feature_table("/nonexistent/table.tsv", Orientation::FeaturesAsRows)
            .unwrap_err();
        assert!(matches!(err, TableError::Io { .. }));
    }
}
