//! Field descriptors: the typed, role-tagged column headers of a RAT.
//!
//! Roles (`FieldUsage`) and primitive types (`FieldType`) mirror the GDAL
//! `GFU_*` / `GFT_*` numbering so that tables round-trip bit-compatibly
//! through the embedded `aux.xml` encoding.

use crate::error::{RatError, Result};

/// Primitive type of a RAT column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Real,
    String,
}

impl FieldType {
    /// Decode a raw GDAL `GFT_*` code.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(FieldType::Integer),
            1 => Ok(FieldType::Real),
            2 => Ok(FieldType::String),
            other => Err(RatError::UnhandledType(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FieldType::Integer => 0,
            FieldType::Real => 1,
            FieldType::String => 2,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, FieldType::String)
    }
}

/// Semantic role of a RAT column.
///
/// `Value` is the discrete class value of a thematic table; `ValueMin` and
/// `ValueMax` are the range bounds of an athematic one. The per-channel
/// min/max roles and `MaxCount` are recognized on load but rejected for
/// every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldUsage {
    Generic,
    PixelCount,
    Name,
    ValueMin,
    ValueMax,
    Value,
    Red,
    Green,
    Blue,
    Alpha,
    RedMin,
    GreenMin,
    BlueMin,
    AlphaMin,
    RedMax,
    GreenMax,
    BlueMax,
    AlphaMax,
    MaxCount,
}

impl FieldUsage {
    /// Decode a raw GDAL `GFU_*` code.
    pub fn from_code(code: u8) -> Result<Self> {
        use FieldUsage::*;
        Ok(match code {
            0 => Generic,
            1 => PixelCount,
            2 => Name,
            3 => ValueMin,
            4 => ValueMax,
            5 => Value,
            6 => Red,
            7 => Green,
            8 => Blue,
            9 => Alpha,
            10 => RedMin,
            11 => GreenMin,
            12 => BlueMin,
            13 => AlphaMin,
            14 => RedMax,
            15 => GreenMax,
            16 => BlueMax,
            17 => AlphaMax,
            18 => MaxCount,
            other => return Err(RatError::UnhandledType(other)),
        })
    }

    pub fn code(self) -> u8 {
        use FieldUsage::*;
        match self {
            Generic => 0,
            PixelCount => 1,
            Name => 2,
            ValueMin => 3,
            ValueMax => 4,
            Value => 5,
            Red => 6,
            Green => 7,
            Blue => 8,
            Alpha => 9,
            RedMin => 10,
            GreenMin => 11,
            BlueMin => 12,
            AlphaMin => 13,
            RedMax => 14,
            GreenMax => 15,
            BlueMax => 16,
            AlphaMax => 17,
            MaxCount => 18,
        }
    }

    /// At most one column per table may carry this role.
    pub fn is_unique(self) -> bool {
        use FieldUsage::*;
        !matches!(self, Generic | Name | MaxCount)
    }

    /// A valid table must carry this role somewhere.
    pub fn is_required(self) -> bool {
        matches!(self, FieldUsage::PixelCount | FieldUsage::Name)
    }

    /// One of the four RGBA channel roles.
    pub fn is_color(self) -> bool {
        use FieldUsage::*;
        matches!(self, Red | Green | Blue | Alpha)
    }

    /// Structural columns: frozen in position, never removable, and no
    /// column may be inserted directly before one.
    pub fn is_structural(self) -> bool {
        use FieldUsage::*;
        matches!(self, PixelCount | Value | ValueMin | ValueMax)
    }

    /// Reserved roles are recognized when decoding but rejected for
    /// mutation.
    pub fn is_supported(self) -> bool {
        use FieldUsage::*;
        !matches!(
            self,
            RedMin
                | GreenMin
                | BlueMin
                | AlphaMin
                | RedMax
                | GreenMax
                | BlueMax
                | AlphaMax
                | MaxCount
        )
    }

    /// Primitive types a column with this role may have.
    ///
    /// Color channels are canonically integer (0-255) but legacy sidecar
    /// tables store them as 0-1 reals, so both are accepted.
    pub fn allowed_types(self) -> &'static [FieldType] {
        use FieldUsage::*;
        match self {
            PixelCount | MaxCount => &[FieldType::Integer],
            Name => &[FieldType::String],
            Value | ValueMin | ValueMax => &[FieldType::Integer, FieldType::Real],
            Red | Green | Blue | Alpha => &[FieldType::Integer, FieldType::Real],
            RedMin | GreenMin | BlueMin | AlphaMin | RedMax | GreenMax | BlueMax | AlphaMax => {
                &[FieldType::Integer, FieldType::Real]
            }
            Generic => &[FieldType::Integer, FieldType::Real, FieldType::String],
        }
    }

    /// Human-readable role name for error messages.
    pub fn label(self) -> &'static str {
        use FieldUsage::*;
        match self {
            Generic => "Generic",
            PixelCount => "Count",
            Name => "Name",
            ValueMin => "Value Min",
            ValueMax => "Value Max",
            Value => "Value",
            Red => "Red",
            Green => "Green",
            Blue => "Blue",
            Alpha => "Alpha",
            RedMin => "Red Min",
            GreenMin => "Green Min",
            BlueMin => "Blue Min",
            AlphaMin => "Alpha Min",
            RedMax => "Red Max",
            GreenMax => "Green Max",
            BlueMax => "Blue Max",
            AlphaMax => "Alpha Max",
            MaxCount => "Max Count",
        }
    }
}

/// One RAT column header: name, role and primitive type.
///
/// Immutable once stored in a table, except for role reassignment when the
/// loader repairs malformed metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RatField {
    pub name: String,
    pub usage: FieldUsage,
    pub field_type: FieldType,
}

impl RatField {
    pub fn new(name: impl Into<String>, usage: FieldUsage, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            usage,
            field_type,
        }
    }
}
