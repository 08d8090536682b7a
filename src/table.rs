use crate::types::{Cell, CANONICAL_KEY, KEY_VARIANTS};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Field values read as missing cells.
const NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Int,
    Float,
    Bool,
    Text,
}

/// A single parsed source file. `None` marks a missing cell.
#[derive(Debug, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Cell>>>,
}

impl Frame {
    pub fn parse_csv(data: &[u8]) -> Result<Frame, failure::Error> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data);
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(format_err!("No columns to parse from file"));
        }
        let columns = dedupe_columns(&headers);
        let width = columns.len();

        let mut raw: Vec<Vec<Option<String>>> = vec![];
        for record in reader.records() {
            let record = record?;
            if record.len() > width {
                let line = record.position().map_or(0, |p| p.line());
                return Err(format_err!(
                    "Expected {} fields in line {}, saw {}",
                    width,
                    line,
                    record.len()
                ));
            }
            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|field| {
                    if NA_VALUES.contains(&field) {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect();
            row.resize(width, None);
            raw.push(row);
        }

        let kinds: Vec<Kind> = (0..width)
            .map(|c| {
                let column: Vec<Option<&str>> = raw.iter().map(|r| r[c].as_deref()).collect();
                infer_kind(&column)
            })
            .collect();
        let rows = raw
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&kinds)
                    .map(|(field, kind)| field.map(|f| to_cell(*kind, f)))
                    .collect()
            })
            .collect();

        Ok(Frame { columns, rows })
    }

    /// Renames the first registration number variant present to the canonical key.
    pub fn normalize_key(&mut self) {
        let found = KEY_VARIANTS
            .iter()
            .find_map(|variant| self.columns.iter().position(|c| c == variant));
        if let Some(pos) = found {
            self.columns[pos] = CANONICAL_KEY.to_string();
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

fn dedupe_columns(headers: &csv::StringRecord) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::with_capacity(headers.len());
    for (i, name) in headers.iter().enumerate() {
        let mut column = if name.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name.to_string()
        };
        let mut count = counts.get(&column).copied().unwrap_or(0);
        while count > 0 {
            counts.insert(column.clone(), count + 1);
            column = format!("{}.{}", column, count);
            count = counts.get(&column).copied().unwrap_or(0);
        }
        counts.insert(column.clone(), count + 1);
        columns.push(column);
    }
    columns
}

fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

fn infer_kind(column: &[Option<&str>]) -> Kind {
    let present: Vec<&str> = column.iter().flatten().copied().collect();
    if present.is_empty() {
        return Kind::Text;
    }
    let has_missing = present.len() < column.len();
    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        // Integers cannot hold a gap, so the column widens to float.
        return if has_missing { Kind::Float } else { Kind::Int };
    }
    if present.iter().all(|v| parse_float(v).is_some()) {
        return Kind::Float;
    }
    if present.iter().all(|v| parse_bool(v).is_some()) {
        return Kind::Bool;
    }
    Kind::Text
}

fn to_cell(kind: Kind, field: String) -> Cell {
    match kind {
        Kind::Int => field.parse().map(Cell::Int).unwrap_or(Cell::Text(field)),
        Kind::Float => parse_float(&field).map(Cell::Float).unwrap_or(Cell::Text(field)),
        Kind::Bool => parse_bool(&field).map(Cell::Bool).unwrap_or(Cell::Text(field)),
        Kind::Text => Cell::Text(field),
    }
}

/// The combined, read-only vehicle table.
#[derive(Debug, Default)]
pub struct VehicleTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    key: Option<usize>,
}

impl VehicleTable {
    pub fn empty() -> VehicleTable {
        VehicleTable::default()
    }

    /// Stacks frames in the given order. Columns are the union in order of first
    /// appearance, and every gap is filled with the sentinel.
    pub fn concat(frames: Vec<Frame>) -> VehicleTable {
        let mut columns: Vec<String> = vec![];
        for frame in &frames {
            for column in &frame.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut combined: Vec<Vec<Option<Cell>>> = vec![];
        for frame in frames {
            let index: Vec<Option<usize>> = columns
                .iter()
                .map(|c| frame.columns.iter().position(|fc| fc == c))
                .collect();
            for mut row in frame.rows {
                combined.push(
                    index
                        .iter()
                        .map(|slot| slot.and_then(|i| row.get_mut(i).and_then(Option::take)))
                        .collect(),
                );
            }
        }

        for c in 0..columns.len() {
            promote_numeric_column(&mut combined, c);
        }

        let key = columns.iter().position(|c| c == CANONICAL_KEY);
        let rows = combined
            .into_iter()
            .map(|row| {
                let mut row: Vec<Cell> = row
                    .into_iter()
                    .map(|cell| cell.unwrap_or_else(Cell::sentinel))
                    .collect();
                if let Some(k) = key {
                    if !matches!(row[k], Cell::Text(_)) {
                        row[k] = Cell::Text(row[k].to_string());
                    }
                }
                row
            })
            .collect();

        VehicleTable { columns, rows, key }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_key_column(&self) -> bool {
        self.key.is_some()
    }

    /// Full scan for the first row whose key equals `query`, ignoring case.
    pub fn lookup(&self, query: &str) -> Option<Record<'_>> {
        let key = self.key?;
        if query.is_empty() {
            return None;
        }
        let wanted = query.to_uppercase();
        self.rows
            .iter()
            .find(|row| match &row[key] {
                Cell::Text(s) => s.to_uppercase() == wanted,
                _ => false,
            })
            .map(|values| Record {
                columns: &self.columns,
                values,
                key,
            })
    }
}

/// A numeric column with gaps, or mixing ints and floats, holds floats throughout.
fn promote_numeric_column(rows: &mut [Vec<Option<Cell>>], c: usize) {
    let mut has_gap = false;
    let mut has_float = false;
    for row in rows.iter() {
        match &row[c] {
            None => has_gap = true,
            Some(Cell::Float(_)) => has_float = true,
            Some(Cell::Int(_)) => {}
            Some(_) => return,
        }
    }
    if !has_gap && !has_float {
        return;
    }
    for row in rows.iter_mut() {
        if let Some(Cell::Int(i)) = row[c] {
            row[c] = Some(Cell::Float(i as f64));
        }
    }
}

/// One row of the table, borrowed.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Cell],
    key: usize,
}

impl<'a> Record<'a> {
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a Cell)> + 'a {
        let columns: &'a [String] = self.columns;
        let values: &'a [Cell] = self.values;
        columns.iter().map(String::as_str).zip(values.iter())
    }

    pub fn regno(&self) -> String {
        self.values[self.key].to_string()
    }

    /// Object keys come out sorted.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields()
            .map(|(column, cell)| (column.to_string(), cell.to_json()))
            .collect();
        Value::Object(map)
    }
}
