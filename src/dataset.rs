use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A single scalar value read from a workbook cell
///
/// Cells are coerced once, when the workbook is parsed. Consumers never
/// re-derive the type of a value from its text.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Numeric cell (integers, floats and date serials)
    Number(f64),

    /// Anything else, kept as the text the workbook shows
    Text(String),
}

impl Cell {
    /// Returns the numeric value of the cell
    ///
    /// Text cells are parsed strictly after trimming; thousands separators
    /// are not accepted here.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Converts a JSON scalar into a cell. `null` maps to no cell at all.
    pub fn from_json(value: &Value) -> Option<Cell> {
        match value {
            Value::Null => None,
            Value::Number(n) => n.as_f64().map(Cell::Number),
            Value::String(s) => Some(Cell::Text(s.clone())),
            Value::Bool(b) => Some(Cell::Text(b.to_string())),
            other => Some(Cell::Text(other.to_string())),
        }
    }

    fn is_integral(n: f64) -> bool {
        n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) if Cell::is_integral(*n) => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(n) if Cell::is_integral(*n) => serializer.serialize_i64(*n as i64),
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// One record of a dataset, stored positionally against the header list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<Option<Cell>>,
}

impl Row {
    pub fn new(cells: Vec<Option<Cell>>) -> Self {
        Self { cells }
    }

    /// Cell at a column position, `None` when missing or empty
    pub fn get(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column).and_then(Option::as_ref)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    fn fit_to(mut self, width: usize) -> Self {
        self.cells.resize(width, None);
        self
    }
}

/// Parsed tabular data: ordered headers, ordered rows and the source file name
///
/// A dataset is never mutated after construction. Every row carries exactly
/// one slot per header, so no row can introduce a field the headers lack.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    file_name: String,
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(file_name: impl Into<String>, headers: Vec<String>, rows: Vec<Row>) -> Self {
        let width = headers.len();
        Self {
            file_name: file_name.into(),
            rows: rows.into_iter().map(|row| row.fit_to(width)).collect(),
            headers,
        }
    }

    /// Builds a dataset from JSON row objects. Keys outside `headers` are dropped.
    pub fn from_objects(
        file_name: impl Into<String>,
        headers: Vec<String>,
        objects: &[Map<String, Value>],
    ) -> Self {
        let rows = objects
            .iter()
            .map(|object| {
                Row::new(
                    headers
                        .iter()
                        .map(|header| object.get(header).and_then(Cell::from_json))
                        .collect(),
                )
            })
            .collect();
        Self::new(file_name, headers, rows)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header, if the dataset has it
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Value of `header` in `row`
    pub fn value<'a>(&self, row: &'a Row, header: &str) -> Option<&'a Cell> {
        self.column(header).and_then(|column| row.get(column))
    }

    /// Serializable view of `rows` as JSON objects keyed by header
    pub fn objects<'a>(&'a self, rows: &'a [Row]) -> RowObjects<'a> {
        RowObjects {
            headers: &self.headers,
            rows,
        }
    }

    /// The first `limit` rows as JSON objects
    pub fn sample_objects(&self, limit: usize) -> Vec<Value> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| Value::Object(self.object(row)))
            .collect()
    }

    fn object(&self, row: &Row) -> Map<String, Value> {
        self.headers
            .iter()
            .zip(&row.cells)
            .filter_map(|(header, cell)| {
                let cell = cell.as_ref()?;
                Some((header.clone(), serde_json::to_value(cell).ok()?))
            })
            .collect()
    }
}

/// Rows serialized as a sequence of `{header: value}` objects, in header order
pub struct RowObjects<'a> {
    headers: &'a [String],
    rows: &'a [Row],
}

impl Serialize for RowObjects<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows {
            seq.serialize_element(&RowObject {
                headers: self.headers,
                row,
            })?;
        }
        seq.end()
    }
}

struct RowObject<'a> {
    headers: &'a [String],
    row: &'a Row,
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (header, cell) in self.headers.iter().zip(&self.row.cells) {
            if let Some(cell) = cell {
                map.serialize_entry(header, cell)?;
            }
        }
        map.end()
    }
}

/// A dataset after it has been persisted
///
/// Serializes to `{_id, fileName, headers, data, createdAt}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RecordDocument")]
pub struct StoredDataset {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub dataset: Dataset,
}

impl Serialize for StoredDataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let dataset = &self.dataset;
        let mut record = serializer.serialize_struct("StoredDataset", 5)?;
        record.serialize_field("_id", &self.id)?;
        record.serialize_field("fileName", dataset.file_name())?;
        record.serialize_field("headers", dataset.headers())?;
        record.serialize_field("data", &dataset.objects(dataset.rows()))?;
        record.serialize_field("createdAt", &self.created_at)?;
        record.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordDocument {
    #[serde(rename = "_id")]
    id: String,
    file_name: String,
    headers: Vec<String>,
    #[serde(default)]
    data: Vec<Map<String, Value>>,
    created_at: DateTime<Utc>,
}

impl From<RecordDocument> for StoredDataset {
    fn from(doc: RecordDocument) -> Self {
        Self {
            id: doc.id,
            created_at: doc.created_at,
            dataset: Dataset::from_objects(doc.file_name, doc.headers, &doc.data),
        }
    }
}
