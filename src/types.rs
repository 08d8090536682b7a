use serde_json::{Number, Value};
use std::fmt;

/// Column every source's registration number ends up under.
pub const CANONICAL_KEY: &str = "regno";

/// Source spellings of the registration number column, in the order they are tried.
pub const KEY_VARIANTS: [&str; 2] = ["Registration No.", "Reg No"];

/// Filled into every cell the source files did not provide.
pub const SENTINEL: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    pub fn sentinel() -> Cell {
        Cell::Text(SENTINEL.to_string())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(SENTINEL.to_string())),
            Cell::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{}", i),
            // serde_json keeps the trailing ".0" on whole floats.
            Cell::Float(x) => match Number::from_f64(*x) {
                Some(n) => write!(f, "{}", n),
                None => f.write_str(SENTINEL),
            },
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
        }
    }
}
