//! Sample Metadata
//!
//! Tab-separated sample metadata keyed by the first column. `#q2:` directive
//! lines and `#` comment lines after the header are skipped; every other cell
//! is kept as text until a column is requested as numeric.

use crate::error::TableError;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Cell spellings treated as a missing value
const MISSING_TOKENS: [&str; 4] = ["", "na", "nan", "n/a"];

fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    MISSING_TOKENS.iter().any(|t| cell.eq_ignore_ascii_case(t))
}

/// Sample metadata table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleMetadata {
    id_header: String,
    columns: Vec<String>,
    sample_ids: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SampleMetadata {
    /// Create metadata from a header, column names and one row per sample
    pub fn new(
        id_header: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<(String, Vec<String>)>,
    ) -> Result<Self, TableError> {
        let mut seen_columns = HashSet::new();
        for column in &columns {
            if !seen_columns.insert(column.as_str()) {
                return Err(TableError::InvalidFormat(format!(
                    "duplicate metadata column '{}'",
                    column
                )));
            }
        }

        let mut seen_ids = HashSet::new();
        let mut sample_ids = Vec::with_capacity(rows.len());
        let mut cells = Vec::with_capacity(rows.len());
        for (id, mut row) in rows {
            if !seen_ids.insert(id.clone()) {
                return Err(TableError::InvalidFormat(format!(
                    "duplicate sample id '{}'",
                    id
                )));
            }
            if row.len() > columns.len() {
                return Err(TableError::InvalidFormat(format!(
                    "sample '{}' has {} cells, header declares {}",
                    id,
                    row.len(),
                    columns.len()
                )));
            }
            // Editors often trim trailing empty cells
            row.resize(columns.len(), String::new());
            sample_ids.push(id);
            cells.push(row);
        }

        Ok(Self {
            id_header: id_header.into(),
            columns,
            sample_ids,
            rows: cells,
        })
    }

    pub fn id_header(&self) -> &str {
        &self.id_header
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    /// Raw cell text for (sample, column)
    pub fn get(&self, sample: &str, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        let row = self.sample_ids.iter().position(|s| s == sample)?;
        Some(self.rows[row][col].as_str())
    }

    /// Interpret a column as numbers; missing cells become `None`
    pub fn numeric_column(&self, name: &str) -> Result<NumericColumn, TableError> {
        let col = self.column_index(name)?;

        let mut entries = Vec::with_capacity(self.sample_ids.len());
        for (id, row) in self.sample_ids.iter().zip(&self.rows) {
            let cell = row[col].trim();
            let value = if is_missing(cell) {
                None
            } else {
                let parsed = cell.parse::<f64>().map_err(|_| TableError::InvalidValue {
                    value: cell.to_string(),
                    line: 0,
                    column: name.to_string(),
                })?;
                Some(parsed).filter(|v| v.is_finite())
            };
            entries.push((id.clone(), value));
        }

        Ok(NumericColumn::new(name, entries))
    }

    /// Keep only samples whose id is in `ids`, preserving metadata order
    pub fn filter_ids<S: AsRef<str>>(&self, ids: &[S]) -> Self {
        let keep: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        let (sample_ids, rows): (Vec<String>, Vec<Vec<String>>) = self
            .sample_ids
            .iter()
            .zip(&self.rows)
            .filter(|(id, _)| keep.contains(id.as_str()))
            .map(|(id, row)| (id.clone(), row.clone()))
            .unzip();

        Self {
            id_header: self.id_header.clone(),
            columns: self.columns.clone(),
            sample_ids,
            rows,
        }
    }

    /// Append (or overwrite) a numeric column, joining on sample id.
    ///
    /// Samples missing a value get an empty cell; samples only present in
    /// `column` are appended as new rows with every other cell empty.
    pub fn with_column(&self, column: &NumericColumn) -> Self {
        let mut out = self.clone();

        let col = match out.columns.iter().position(|c| c == column.name()) {
            Some(existing) => existing,
            None => {
                out.columns.push(column.name().to_string());
                for row in &mut out.rows {
                    row.push(String::new());
                }
                out.columns.len() - 1
            }
        };

        let known: HashSet<String> = out.sample_ids.iter().cloned().collect();
        for id in column.ids() {
            if !known.contains(&id) {
                out.sample_ids.push(id);
                out.rows.push(vec![String::new(); out.columns.len()]);
            }
        }

        let values: HashMap<&str, f64> = column.observed().collect();
        for (id, row) in out.sample_ids.iter().zip(&mut out.rows) {
            row[col] = values
                .get(id.as_str())
                .map(|v| v.to_string())
                .unwrap_or_default();
        }
        out
    }

    /// Write metadata to a TSV file
    pub fn write_tsv(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| TableError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.format_tsv(&mut writer)?;
        writer.flush().map_err(|e| TableError::io(path, e))?;
        info!("Wrote metadata {} ({} samples)", path.display(), self.len());
        Ok(())
    }

    /// Serialize metadata as TSV into any sink
    pub fn format_tsv<W: Write>(&self, sink: W) -> Result<(), TableError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(sink);

        writer.write_record(
            std::iter::once(self.id_header.as_str()).chain(self.columns.iter().map(String::as_str)),
        )?;
        for (id, row) in self.sample_ids.iter().zip(&self.rows) {
            writer.write_record(
                std::iter::once(id.as_str()).chain(row.iter().map(String::as_str)),
            )?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Read sample metadata from a TSV file
pub fn read_metadata(path: impl AsRef<Path>) -> Result<SampleMetadata, TableError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| TableError::io(path, e))?;
    let metadata = parse_metadata(BufReader::new(file))?;
    info!(
        "Loaded metadata {}: {} samples, {} columns",
        path.display(),
        metadata.len(),
        metadata.columns().len()
    );
    Ok(metadata)
}

/// Parse sample metadata from any TSV source
pub fn parse_metadata<R: Read>(reader: R) -> Result<SampleMetadata, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut header: Option<(String, Vec<String>)> = None;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let first = record.get(0).unwrap_or("").trim();
        // Directives anywhere; plain comments once the header is known
        if first.starts_with("#q2:") || (header.is_some() && first.starts_with('#')) {
            continue;
        }

        let mut fields = record.iter().map(|f| f.trim().to_string());
        let id = fields.next().unwrap_or_default();
        let cells: Vec<String> = fields.collect();
        if header.is_none() {
            header = Some((id, cells));
        } else {
            rows.push((id, cells));
        }
    }

    let (id_header, columns) =
        header.ok_or_else(|| TableError::InvalidFormat("missing metadata header".to_string()))?;
    debug!("Parsed metadata with {} rows", rows.len());
    SampleMetadata::new(id_header, columns, rows)
}

/// One numeric metadata column, keyed by sample id
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    name: String,
    entries: Vec<(String, Option<f64>)>,
}

impl NumericColumn {
    /// Create a column from (sample id, value) pairs
    pub fn new(name: impl Into<String>, entries: Vec<(String, Option<f64>)>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sample ids, in column order
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Value for a sample; `None` if absent or missing
    pub fn get(&self, sample: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(id, _)| id == sample)
            .and_then(|(_, v)| *v)
    }

    /// Present (non-missing) values
    pub fn observed(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .filter_map(|(id, v)| v.map(|v| (id.as_str(), v)))
    }

    pub fn missing_count(&self) -> usize {
        self.entries.iter().filter(|(_, v)| v.is_none()).count()
    }

    /// Keep only samples whose id is in `ids`, preserving column order
    pub fn filter_ids<S: AsRef<str>>(&self, ids: &[S]) -> Self {
        let keep: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        Self {
            name: self.name.clone(),
            entries: self
                .entries
                .iter()
                .filter(|(id, _)| keep.contains(id.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Drop samples whose value is missing
    pub fn drop_missing_values(&self) -> Self {
        Self {
            name: self.name.clone(),
            entries: self.entries.iter().filter(|(_, v)| v.is_some()).cloned().collect(),
        }
    }
}
