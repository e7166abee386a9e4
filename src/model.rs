//! Leaf value types shared across the crate: composite colors, scalar cell
//! values, typed column storage and the thematic/athematic table tag.

use std::fmt;

use crate::fields::FieldType;

/// Display name of the derived, never-persisted color column.
pub const RAT_COLOR_HEADER_NAME: &str = "RAT Color";

/// Composite RGBA color synthesized from the per-channel columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build from 0-1 channel fractions, as stored by legacy real-typed
    /// color columns.
    pub fn from_fractions(r: f64, g: f64, b: f64, a: f64) -> Self {
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: q(r),
            g: q(g),
            b: q(b),
            a: q(a),
        }
    }
}

/// One scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            CellValue::Integer(_) => FieldType::Integer,
            CellValue::Real(_) => FieldType::Real,
            CellValue::Text(_) => FieldType::String,
        }
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Real(v) => Some(*v),
            CellValue::Text(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Real(v) => write!(f, "{}", v),
            CellValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Typed storage for one persisted column. All columns of a table hold the
/// same number of rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<i64>),
    Real(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn empty(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Integer => ColumnData::Integer(Vec::new()),
            FieldType::Real => ColumnData::Real(Vec::new()),
            FieldType::String => ColumnData::Text(Vec::new()),
        }
    }

    /// A column of `len` default cells: `fill` for numeric types, empty
    /// strings for text.
    pub fn filled(field_type: FieldType, len: usize, fill: f64) -> Self {
        match field_type {
            FieldType::Integer => ColumnData::Integer(vec![fill as i64; len]),
            FieldType::Real => ColumnData::Real(vec![fill; len]),
            FieldType::String => ColumnData::Text(vec![String::new(); len]),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            ColumnData::Integer(_) => FieldType::Integer,
            ColumnData::Real(_) => FieldType::Real,
            ColumnData::Text(_) => FieldType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Real(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize) -> Option<CellValue> {
        match self {
            ColumnData::Integer(v) => v.get(row).map(|x| CellValue::Integer(*x)),
            ColumnData::Real(v) => v.get(row).map(|x| CellValue::Real(*x)),
            ColumnData::Text(v) => v.get(row).map(|x| CellValue::Text(x.clone())),
        }
    }

    /// Set a cell, coercing integers into real columns and anything into
    /// text columns. Returns false on row out of range or an
    /// incompatible value.
    pub fn set(&mut self, row: usize, value: CellValue) -> bool {
        if row >= self.len() {
            return false;
        }
        match (self, value) {
            (ColumnData::Integer(v), CellValue::Integer(x)) => v[row] = x,
            (ColumnData::Real(v), CellValue::Real(x)) => v[row] = x,
            (ColumnData::Real(v), CellValue::Integer(x)) => v[row] = x as f64,
            (ColumnData::Text(v), value) => v[row] = value.to_string(),
            _ => return false,
        }
        true
    }

    pub fn as_f64(&self, row: usize) -> Option<f64> {
        self.get(row).and_then(|v| v.as_f64())
    }

    /// Append a cell, with the same coercions as [`ColumnData::set`].
    pub fn push(&mut self, value: CellValue) -> bool {
        match (self, value) {
            (ColumnData::Integer(v), CellValue::Integer(x)) => v.push(x),
            (ColumnData::Real(v), CellValue::Real(x)) => v.push(x),
            (ColumnData::Real(v), CellValue::Integer(x)) => v.push(x as f64),
            (ColumnData::Text(v), value) => v.push(value.to_string()),
            _ => return false,
        }
        true
    }

    /// Insert a default cell at `row` (numeric `fill`, empty text).
    pub fn insert_default(&mut self, row: usize, fill: f64) {
        match self {
            ColumnData::Integer(v) => v.insert(row, fill as i64),
            ColumnData::Real(v) => v.insert(row, fill),
            ColumnData::Text(v) => v.insert(row, String::new()),
        }
    }

    pub fn remove(&mut self, row: usize) {
        match self {
            ColumnData::Integer(v) => {
                v.remove(row);
            }
            ColumnData::Real(v) => {
                v.remove(row);
            }
            ColumnData::Text(v) => {
                v.remove(row);
            }
        }
    }
}

/// Classification shape of a table: discrete per-value classes or
/// continuous min/max ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    Thematic,
    Athematic,
}

impl TableType {
    pub fn as_str(self) -> &'static str {
        match self {
            TableType::Thematic => "thematic",
            TableType::Athematic => "athematic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "thematic" => Some(TableType::Thematic),
            "athematic" => Some(TableType::Athematic),
            _ => None,
        }
    }
}
