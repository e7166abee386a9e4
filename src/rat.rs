//! The RAT aggregate: ordered typed columns plus their field descriptors,
//! a derived color column, and every in-place mutation operation.
//!
//! The table is the single owned, mutable value of this crate. The loader
//! builds one, the writer persists one, the classification engine reads
//! one; everything else goes through the operations below. Rejected
//! mutations leave the table untouched.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{RatError, Result};
use crate::fields::{FieldType, FieldUsage, RatField};
use crate::model::{CellValue, Color, ColumnData, TableType, RAT_COLOR_HEADER_NAME};
use crate::raster::ClassData;

#[derive(Debug, Clone, PartialEq)]
pub struct Rat {
    fields: Vec<RatField>,
    columns: Vec<ColumnData>,
    /// Derived color column, present only when Red+Green+Blue fields
    /// exist. Never persisted, always displayed first.
    colors: Option<Vec<Color>>,
    /// True when backed by a `.vat.dbf` sidecar, false for embedded
    /// `aux.xml` metadata.
    pub is_sidecar: bool,
    /// Path of the backing file (`.vat.dbf` or `.aux.xml`).
    pub path: PathBuf,
}

impl Rat {
    /// Build a table from parallel descriptors and columns.
    pub fn new(
        fields: Vec<RatField>,
        columns: Vec<ColumnData>,
        is_sidecar: bool,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        if fields.len() != columns.len() {
            return Err(RatError::DataInconsistency(format!(
                "{} fields but {} columns",
                fields.len(),
                columns.len()
            )));
        }
        let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
        for (field, column) in fields.iter().zip(&columns) {
            if column.len() != row_count {
                return Err(RatError::DataInconsistency(format!(
                    "column {} has {} rows, expected {}",
                    field.name,
                    column.len(),
                    row_count
                )));
            }
            if column.field_type() != field.field_type {
                return Err(RatError::DataInconsistency(format!(
                    "column {} data does not match its declared type",
                    field.name
                )));
            }
        }
        let mut rat = Self {
            fields,
            columns,
            colors: None,
            is_sidecar,
            path: path.into(),
        };
        rat.rebuild_colors();
        Ok(rat)
    }

    /// An empty table; `is_valid` is false until value columns appear.
    pub fn empty(path: impl Into<PathBuf>, is_sidecar: bool) -> Self {
        Self {
            fields: Vec::new(),
            columns: Vec::new(),
            colors: None,
            is_sidecar,
            path: path.into(),
        }
    }

    /// Synthesize a fresh thematic table from a raster's current class
    /// data: Value, Count, Class label and a full RGBA group.
    pub fn from_classes(
        classes: &[ClassData],
        value_type: FieldType,
        is_sidecar: bool,
        path: impl Into<PathBuf>,
    ) -> Self {
        let fields = vec![
            RatField::new("Value", FieldUsage::Value, value_type),
            RatField::new("Count", FieldUsage::PixelCount, FieldType::Integer),
            RatField::new("Class", FieldUsage::Name, FieldType::String),
            RatField::new("Red", FieldUsage::Red, FieldType::Integer),
            RatField::new("Green", FieldUsage::Green, FieldType::Integer),
            RatField::new("Blue", FieldUsage::Blue, FieldType::Integer),
            RatField::new("Alpha", FieldUsage::Alpha, FieldType::Integer),
        ];
        let values = match value_type {
            FieldType::Real => ColumnData::Real(classes.iter().map(|c| c.value).collect()),
            _ => ColumnData::Integer(classes.iter().map(|c| c.value as i64).collect()),
        };
        let columns = vec![
            values,
            ColumnData::Integer(vec![0; classes.len()]),
            ColumnData::Text(classes.iter().map(|c| c.label.clone()).collect()),
            ColumnData::Integer(classes.iter().map(|c| c.color.r as i64).collect()),
            ColumnData::Integer(classes.iter().map(|c| c.color.g as i64).collect()),
            ColumnData::Integer(classes.iter().map(|c| c.color.b as i64).collect()),
            ColumnData::Integer(classes.iter().map(|c| c.color.a as i64).collect()),
        ];
        let mut rat = Self {
            fields,
            columns,
            colors: None,
            is_sidecar,
            path: path.into(),
        };
        rat.rebuild_colors();
        rat
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Persisted columns only; the virtual color column is not counted.
    pub fn column_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[RatField] {
        &self.fields
    }

    pub fn columns(&self) -> &[ColumnData] {
        &self.columns
    }

    pub fn field(&self, name: &str) -> Option<&RatField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_by_usage(&self, usage: FieldUsage) -> Option<usize> {
        self.fields.iter().position(|f| f.usage == usage)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.field_index(name).map(|i| &self.columns[i])
    }

    pub fn column_by_usage(&self, usage: FieldUsage) -> Option<&ColumnData> {
        self.field_by_usage(usage).map(|i| &self.columns[i])
    }

    pub fn usages(&self) -> HashSet<FieldUsage> {
        self.fields.iter().map(|f| f.usage).collect()
    }

    pub fn has_color(&self) -> bool {
        self.colors.is_some()
    }

    /// Display headers: the virtual color column first when present, then
    /// the persisted field names in order.
    pub fn headers(&self) -> Vec<&str> {
        let mut headers = Vec::with_capacity(self.fields.len() + 1);
        if self.has_color() {
            headers.push(RAT_COLOR_HEADER_NAME);
        }
        headers.extend(self.fields.iter().map(|f| f.name.as_str()));
        headers
    }

    /// Exactly one of: a Value field (thematic), or both ValueMin and
    /// ValueMax (athematic). An invalid table means "no RAT available".
    pub fn is_valid(&self) -> bool {
        self.table_type().is_some()
    }

    pub fn table_type(&self) -> Option<TableType> {
        let usages = self.usages();
        let thematic = usages.contains(&FieldUsage::Value);
        let athematic =
            usages.contains(&FieldUsage::ValueMin) && usages.contains(&FieldUsage::ValueMax);
        match (thematic, athematic) {
            (true, false) => Some(TableType::Thematic),
            (false, true) => Some(TableType::Athematic),
            _ => None,
        }
    }

    pub fn get_value(&self, row: usize, column_name: &str) -> Option<CellValue> {
        self.column(column_name).and_then(|c| c.get(row))
    }

    /// Edit one cell, coercing compatible types. Color channel edits are
    /// reflected into the virtual color column.
    pub fn set_value(&mut self, row: usize, column_name: &str, value: CellValue) -> Result<()> {
        let index = self
            .field_index(column_name)
            .ok_or_else(|| RatError::Validation(format!("Column {} does not exist.", column_name)))?;
        if !self.columns[index].set(row, value) {
            return Err(RatError::Validation(format!(
                "Cannot set row {} of column {}: row out of range or incompatible value.",
                row, column_name
            )));
        }
        if self.fields[index].usage.is_color() {
            self.refresh_color_row(row);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Column operations

    /// Insert a column at display position `index`.
    pub fn insert_column(&mut self, index: usize, field: RatField) -> Result<()> {
        let display_len = self.fields.len() + usize::from(self.has_color());
        if index >= display_len {
            return Err(RatError::Validation(
                "Insertion point is out of range.".to_string(),
            ));
        }
        if field.name == RAT_COLOR_HEADER_NAME || self.field(&field.name).is_some() {
            return Err(RatError::Validation(format!(
                "Column {} already exists.",
                field.name
            )));
        }
        if !field.usage.is_supported() {
            return Err(RatError::Validation(format!(
                "Column {} has an unsupported usage ({}).",
                field.name,
                field.usage.label()
            )));
        }
        if field.usage.is_color() {
            return Err(RatError::Validation(format!(
                "Column {} is a color channel: color columns are added as a group.",
                field.name
            )));
        }
        if field.usage.is_unique() && self.usages().contains(&field.usage) {
            return Err(RatError::Validation(format!(
                "Column {} usage already exists and must be unique.",
                field.name
            )));
        }
        if !field.usage.allowed_types().contains(&field.field_type) {
            return Err(RatError::Validation(format!(
                "Column {} type is not allowed for usage {}.",
                field.name,
                field.usage.label()
            )));
        }
        let field_index = if self.has_color() {
            match index.checked_sub(1) {
                Some(i) => i,
                None => {
                    return Err(RatError::Validation(
                        "Cannot insert a column before the color column.".to_string(),
                    ))
                }
            }
        } else {
            index
        };
        if self.fields[field_index].usage.is_structural() {
            return Err(RatError::Validation(format!(
                "Column {} cannot be inserted before a \"Value\" or \"Count\" column.",
                field.name
            )));
        }
        let column = ColumnData::filled(field.field_type, self.row_count(), 0.0);
        self.columns.insert(field_index, column);
        self.fields.insert(field_index, field);
        Ok(())
    }

    /// Remove the column named `name`. Structural and color-channel
    /// columns are protected.
    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        if name == RAT_COLOR_HEADER_NAME {
            return Err(RatError::Validation(
                "The color column is removed through remove_color_fields.".to_string(),
            ));
        }
        let index = self
            .field_index(name)
            .ok_or_else(|| RatError::Validation(format!("Column {} does not exist.", name)))?;
        let usage = self.fields[index].usage;
        if usage.is_structural() {
            return Err(RatError::Validation(
                "Removal of a \"Value\" or \"Count\" column is not allowed.".to_string(),
            ));
        }
        if usage.is_color() {
            return Err(RatError::Validation(format!(
                "Column {} is a color channel: color columns are removed as a group.",
                name
            )));
        }
        self.fields.remove(index);
        self.columns.remove(index);
        Ok(())
    }

    /// Atomically add the four RGBA channel columns at field position
    /// `index` and expose the virtual color column, defaulted to opaque
    /// black.
    pub fn insert_color_fields(&mut self, index: usize) -> Result<()> {
        if self.fields.iter().any(|f| f.usage.is_color()) {
            return Err(RatError::Validation(
                "Color columns are already present.".to_string(),
            ));
        }
        if index > self.fields.len() {
            return Err(RatError::Validation(
                "Insertion point is out of range.".to_string(),
            ));
        }
        if let Some(next) = self.fields.get(index) {
            if next.usage.is_structural() {
                return Err(RatError::Validation(
                    "Color columns cannot be inserted before a \"Value\" or \"Count\" column."
                        .to_string(),
                ));
            }
        }
        for name in ["Red", "Green", "Blue", "Alpha"] {
            if self.field(name).is_some() {
                return Err(RatError::Validation(format!(
                    "Column {} already exists.",
                    name
                )));
            }
        }
        let rows = self.row_count();
        // Inserted back to front so Red ends up first.
        for (name, usage, fill) in [
            ("Alpha", FieldUsage::Alpha, 255.0),
            ("Blue", FieldUsage::Blue, 0.0),
            ("Green", FieldUsage::Green, 0.0),
            ("Red", FieldUsage::Red, 0.0),
        ] {
            self.fields
                .insert(index, RatField::new(name, usage, FieldType::Integer));
            self.columns
                .insert(index, ColumnData::filled(FieldType::Integer, rows, fill));
        }
        self.colors = Some(vec![Color::rgba(0, 0, 0, 255); rows]);
        Ok(())
    }

    /// Remove the virtual color column and all four channel columns.
    /// No-op returning false when no color is present.
    pub fn remove_color_fields(&mut self) -> bool {
        let indexes: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.usage.is_color())
            .map(|(i, _)| i)
            .collect();
        if indexes.is_empty() && self.colors.is_none() {
            return false;
        }
        for i in indexes.into_iter().rev() {
            self.fields.remove(i);
            self.columns.remove(i);
        }
        self.colors = None;
        true
    }

    pub fn get_color(&self, row: usize) -> Option<Color> {
        self.colors.as_ref().and_then(|c| c.get(row)).copied()
    }

    /// Write a composite color for `row`, propagating the channels into
    /// the underlying columns. Out-of-range rows are reported, not fatal.
    pub fn set_color(&mut self, row: usize, color: Color) -> bool {
        match self.colors.as_mut() {
            Some(colors) if row < colors.len() => {
                colors[row] = color;
            }
            Some(colors) => {
                warn!(row, rows = colors.len(), "set_color: row out of range");
                return false;
            }
            None => {
                warn!(row, "set_color: table has no color columns");
                return false;
            }
        }
        self.write_channels(row, color);
        true
    }

    // ------------------------------------------------------------------
    // Row operations

    /// Insert a defaulted row at `index` (`index == row_count` appends).
    pub fn insert_row(&mut self, index: usize) -> Result<()> {
        if index > self.row_count() {
            return Err(RatError::Validation(format!(
                "Row insertion point {} is out of range (0..={}).",
                index,
                self.row_count()
            )));
        }
        for (field, column) in self.fields.iter().zip(self.columns.iter_mut()) {
            // New rows default white for color channels, zero elsewhere.
            let fill = if field.usage.is_color() {
                if field.field_type == FieldType::Real {
                    1.0
                } else {
                    255.0
                }
            } else {
                0.0
            };
            column.insert_default(index, fill);
        }
        if let Some(colors) = self.colors.as_mut() {
            colors.insert(index, Color::WHITE);
        }
        Ok(())
    }

    pub fn remove_row(&mut self, index: usize) -> Result<()> {
        if index >= self.row_count() {
            return Err(RatError::Validation(format!(
                "Row {} is out of range (0..{}).",
                index,
                self.row_count()
            )));
        }
        for column in self.columns.iter_mut() {
            column.remove(index);
        }
        if let Some(colors) = self.colors.as_mut() {
            colors.remove(index);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Renderer synchronisation

    /// Copy renderer class colors back into matching table rows: exact
    /// value match for thematic tables, upper-bound match for athematic
    /// ones. Unmatched class values are logged and skipped. Returns the
    /// number of rows updated.
    pub fn update_colors_from_raster(&mut self, classes: &[ClassData]) -> usize {
        let match_usage = match self.table_type() {
            Some(TableType::Thematic) => FieldUsage::Value,
            Some(TableType::Athematic) => FieldUsage::ValueMax,
            None => return 0,
        };
        let Some(value_index) = self.field_by_usage(match_usage) else {
            return 0;
        };
        let mut updated = 0;
        for class in classes {
            let Some(row) = self.find_value_row(value_index, class.value) else {
                debug!(value = class.value, "class value not found in RAT, skipped");
                continue;
            };
            if self.set_color(row, class.color) {
                updated += 1;
            }
        }
        updated
    }

    /// Row whose cell in column `value_index` represents `value`.
    pub(crate) fn find_value_row(&self, value_index: usize, value: f64) -> Option<usize> {
        match &self.columns[value_index] {
            ColumnData::Integer(v) => v.iter().position(|x| *x == value as i64),
            ColumnData::Real(v) => v.iter().position(|x| *x == value),
            ColumnData::Text(_) => None,
        }
    }

    /// Content equality ignoring provenance: same descriptors, same data.
    pub fn same_content(&self, other: &Rat) -> bool {
        self.fields == other.fields && self.columns == other.columns
    }

    /// Loader-only repair hook for malformed metadata.
    pub(crate) fn set_field_usage(&mut self, index: usize, usage: FieldUsage) {
        if let Some(field) = self.fields.get_mut(index) {
            field.usage = usage;
        }
    }

    // ------------------------------------------------------------------
    // Virtual color plumbing

    fn channel_indexes(&self) -> Option<(usize, usize, usize, Option<usize>)> {
        Some((
            self.field_by_usage(FieldUsage::Red)?,
            self.field_by_usage(FieldUsage::Green)?,
            self.field_by_usage(FieldUsage::Blue)?,
            self.field_by_usage(FieldUsage::Alpha),
        ))
    }

    /// Rebuild the whole virtual color column from the channel columns.
    pub(crate) fn rebuild_colors(&mut self) {
        let Some((r, g, b, a)) = self.channel_indexes() else {
            self.colors = None;
            return;
        };
        let is_integer = self.fields[r].field_type == FieldType::Integer;
        let mut colors = Vec::with_capacity(self.row_count());
        for row in 0..self.row_count() {
            colors.push(self.compose_color(row, r, g, b, a, is_integer));
        }
        self.colors = Some(colors);
    }

    fn refresh_color_row(&mut self, row: usize) {
        let Some((r, g, b, a)) = self.channel_indexes() else {
            return;
        };
        let is_integer = self.fields[r].field_type == FieldType::Integer;
        let color = self.compose_color(row, r, g, b, a, is_integer);
        if let Some(colors) = self.colors.as_mut() {
            if let Some(slot) = colors.get_mut(row) {
                *slot = color;
            }
        }
    }

    fn compose_color(
        &self,
        row: usize,
        r: usize,
        g: usize,
        b: usize,
        a: Option<usize>,
        is_integer: bool,
    ) -> Color {
        let channel = |i: usize| self.columns[i].as_f64(row).unwrap_or(0.0);
        if is_integer {
            Color::rgba(
                channel(r).clamp(0.0, 255.0) as u8,
                channel(g).clamp(0.0, 255.0) as u8,
                channel(b).clamp(0.0, 255.0) as u8,
                a.map(|i| channel(i).clamp(0.0, 255.0) as u8).unwrap_or(255),
            )
        } else {
            Color::from_fractions(
                channel(r),
                channel(g),
                channel(b),
                a.map(channel).unwrap_or(1.0),
            )
        }
    }

    fn write_channels(&mut self, row: usize, color: Color) {
        let Some((r, g, b, a)) = self.channel_indexes() else {
            return;
        };
        let mut write = |index: usize, component: u8| {
            let value = match self.columns[index].field_type() {
                FieldType::Real => CellValue::Real(component as f64 / 255.0),
                _ => CellValue::Integer(component as i64),
            };
            self.columns[index].set(row, value);
        };
        write(r, color.r);
        write(g, color.g);
        write(b, color.b);
        if let Some(a) = a {
            write(a, color.a);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A thematic fixture shaped like a typical embedded RAT:
    /// Value | Count | Class | ...generic...
    fn thematic_rat() -> Rat {
        Rat::new(
            vec![
                RatField::new("Value", FieldUsage::Value, FieldType::Integer),
                RatField::new("Count", FieldUsage::PixelCount, FieldType::Integer),
                RatField::new("Class", FieldUsage::Name, FieldType::String),
                RatField::new("Notes", FieldUsage::Generic, FieldType::String),
            ],
            vec![
                ColumnData::Integer(vec![0, 2, 4]),
                ColumnData::Integer(vec![10, 20, 30]),
                ColumnData::Text(vec!["zero".into(), "one".into(), "two".into()]),
                ColumnData::Text(vec!["".into(), "".into(), "".into()]),
            ],
            false,
            "raster.tif.aux.xml",
        )
        .unwrap()
    }

    fn athematic_rat() -> Rat {
        Rat::new(
            vec![
                RatField::new("Value Min", FieldUsage::ValueMin, FieldType::Real),
                RatField::new("Value Max", FieldUsage::ValueMax, FieldType::Real),
                RatField::new("Class2", FieldUsage::Name, FieldType::String),
            ],
            vec![
                ColumnData::Real(vec![-1e25, 3e12]),
                ColumnData::Real(vec![3e12, 1e20]),
                ColumnData::Text(vec!["zero2".into(), "zero2".into()]),
            ],
            true,
            "ranges.tif.vat.dbf",
        )
        .unwrap()
    }

    #[test]
    fn shape_invariant() {
        assert_eq!(thematic_rat().table_type(), Some(TableType::Thematic));
        assert_eq!(athematic_rat().table_type(), Some(TableType::Athematic));

        // Neither shape: invalid.
        let rat = Rat::new(
            vec![RatField::new("Notes", FieldUsage::Generic, FieldType::String)],
            vec![ColumnData::Text(vec!["x".into()])],
            false,
            "r.aux.xml",
        )
        .unwrap();
        assert!(!rat.is_valid());

        // Both shapes at once: invalid too.
        let rat = Rat::new(
            vec![
                RatField::new("Value", FieldUsage::Value, FieldType::Integer),
                RatField::new("Min", FieldUsage::ValueMin, FieldType::Real),
                RatField::new("Max", FieldUsage::ValueMax, FieldType::Real),
            ],
            vec![
                ColumnData::Integer(vec![1]),
                ColumnData::Real(vec![0.0]),
                ColumnData::Real(vec![1.0]),
            ],
            false,
            "r.aux.xml",
        )
        .unwrap();
        assert!(!rat.is_valid());
    }

    #[test]
    fn mismatched_column_lengths_are_rejected() {
        let err = Rat::new(
            vec![
                RatField::new("Value", FieldUsage::Value, FieldType::Integer),
                RatField::new("Class", FieldUsage::Name, FieldType::String),
            ],
            vec![
                ColumnData::Integer(vec![1, 2]),
                ColumnData::Text(vec!["a".into()]),
            ],
            false,
            "r.aux.xml",
        )
        .unwrap_err();
        assert!(matches!(err, RatError::DataInconsistency(_)));
    }

    #[test]
    fn insert_column_validations() {
        let mut rat = thematic_rat();

        // Duplicate unique usage.
        let field = RatField::new("v2", FieldUsage::Value, FieldType::Real);
        assert!(rat.insert_column(3, field).is_err());

        // Before a structural column.
        let field = RatField::new("f1", FieldUsage::Generic, FieldType::Real);
        assert!(rat.insert_column(0, field.clone()).is_err());
        assert!(rat.insert_column(1, field.clone()).is_err());

        // Out of range.
        assert!(rat.insert_column(100, field.clone()).is_err());

        // Duplicate name.
        let dup = RatField::new("Class", FieldUsage::Generic, FieldType::String);
        assert!(rat.insert_column(3, dup).is_err());

        // Unsupported usage.
        let reserved = RatField::new("rmin", FieldUsage::RedMin, FieldType::Integer);
        assert!(rat.insert_column(3, reserved).is_err());

        // Valid insertion after the structural block.
        assert!(rat.insert_column(2, field).is_ok());
        assert_eq!(rat.fields()[2].name, "f1");
        assert_eq!(rat.column("f1").unwrap().len(), 3);
        assert_eq!(rat.get_value(0, "f1"), Some(CellValue::Real(0.0)));
    }

    #[test]
    fn structural_columns_cannot_be_removed() {
        let mut rat = thematic_rat();
        assert!(rat.remove_column("Value").is_err());
        assert!(rat.remove_column("Count").is_err());
        assert!(rat.remove_column("Missing").is_err());
        assert!(rat.remove_column("Notes").is_ok());
        assert_eq!(rat.column_count(), 3);

        let mut rat = athematic_rat();
        assert!(rat.remove_column("Value Min").is_err());
        assert!(rat.remove_column("Value Max").is_err());
    }

    #[test]
    fn color_group_atomicity() {
        let mut rat = thematic_rat();
        assert!(!rat.has_color());
        rat.insert_color_fields(3).unwrap();

        assert!(rat.has_color());
        assert_eq!(rat.column_count(), 8);
        assert_eq!(
            rat.fields()[3..7]
                .iter()
                .map(|f| f.usage)
                .collect::<Vec<_>>(),
            vec![
                FieldUsage::Red,
                FieldUsage::Green,
                FieldUsage::Blue,
                FieldUsage::Alpha
            ]
        );
        assert_eq!(rat.headers()[0], RAT_COLOR_HEADER_NAME);
        assert_eq!(rat.get_color(0), Some(Color::rgba(0, 0, 0, 255)));
        assert_eq!(rat.get_value(0, "Alpha"), Some(CellValue::Integer(255)));

        // Individual channel removal must fail.
        assert!(rat.remove_column("Red").is_err());
        assert!(rat.remove_column(RAT_COLOR_HEADER_NAME).is_err());

        // Re-adding the group must fail while present.
        assert!(rat.insert_color_fields(3).is_err());

        assert!(rat.remove_color_fields());
        assert!(!rat.has_color());
        assert_eq!(rat.column_count(), 4);
        assert!(!rat.remove_color_fields());
    }

    #[test]
    fn set_color_propagates_to_channels() {
        let mut rat = thematic_rat();
        rat.insert_color_fields(3).unwrap();
        assert!(rat.set_color(1, Color::rgba(10, 20, 30, 40)));
        assert_eq!(rat.get_value(1, "Red"), Some(CellValue::Integer(10)));
        assert_eq!(rat.get_value(1, "Alpha"), Some(CellValue::Integer(40)));
        assert_eq!(rat.get_color(1), Some(Color::rgba(10, 20, 30, 40)));
        // Out of range is reported, not fatal.
        assert!(!rat.set_color(17, Color::WHITE));
    }

    #[test]
    fn channel_edit_refreshes_virtual_color() {
        let mut rat = thematic_rat();
        rat.insert_color_fields(3).unwrap();
        rat.set_value(0, "Red", CellValue::Integer(200)).unwrap();
        assert_eq!(rat.get_color(0), Some(Color::rgba(200, 0, 0, 255)));
    }

    #[test]
    fn row_bounds() {
        let mut rat = thematic_rat();
        assert_eq!(rat.row_count(), 3);
        assert!(rat.insert_row(3).is_ok()); // append
        assert!(rat.insert_row(5).is_err());
        assert_eq!(rat.row_count(), 4);
        assert_eq!(rat.get_value(3, "Value"), Some(CellValue::Integer(0)));
        assert_eq!(rat.get_value(3, "Class"), Some(CellValue::Text(String::new())));

        assert!(rat.remove_row(4).is_err());
        assert!(rat.remove_row(3).is_ok());
        assert_eq!(rat.row_count(), 3);
    }

    #[test]
    fn new_rows_default_white_in_color_tables() {
        let mut rat = thematic_rat();
        rat.insert_color_fields(3).unwrap();
        rat.insert_row(0).unwrap();
        assert_eq!(rat.get_color(0), Some(Color::WHITE));
        assert_eq!(rat.get_value(0, "Green"), Some(CellValue::Integer(255)));
    }

    #[test]
    fn update_colors_from_raster_matches_and_skips() {
        let mut rat = thematic_rat();
        rat.insert_color_fields(3).unwrap();
        let classes = vec![
            ClassData::new(2.0, "one", Color::rgb(1, 2, 3)),
            ClassData::new(9.0, "ghost", Color::rgb(9, 9, 9)), // not in table
        ];
        assert_eq!(rat.update_colors_from_raster(&classes), 1);
        assert_eq!(rat.get_color(1), Some(Color::rgb(1, 2, 3)));
    }

    #[test]
    fn update_colors_matches_upper_bound_for_ranges() {
        let mut rat = athematic_rat();
        rat.insert_color_fields(3).unwrap();
        let classes = vec![ClassData::new(1e20, "hi", Color::rgb(5, 6, 7))];
        assert_eq!(rat.update_colors_from_raster(&classes), 1);
        assert_eq!(rat.get_color(1), Some(Color::rgb(5, 6, 7)));
    }

    #[test]
    fn virtual_colors_built_from_real_channels() {
        let rat = Rat::new(
            vec![
                RatField::new("Value", FieldUsage::Value, FieldType::Integer),
                RatField::new("R", FieldUsage::Red, FieldType::Real),
                RatField::new("G", FieldUsage::Green, FieldType::Real),
                RatField::new("B", FieldUsage::Blue, FieldType::Real),
            ],
            vec![
                ColumnData::Integer(vec![1]),
                ColumnData::Real(vec![1.0]),
                ColumnData::Real(vec![0.0]),
                ColumnData::Real(vec![0.5]),
            ],
            true,
            "r.vat.dbf",
        )
        .unwrap();
        assert_eq!(rat.get_color(0), Some(Color::rgba(255, 0, 128, 255)));
    }
}
