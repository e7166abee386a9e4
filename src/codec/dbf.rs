//! dBASE III reader/writer for `.vat.dbf` sidecar tables.
//!
//! The sidecar is attribute-only: one record per class/range, one field
//! per RAT column, no geometry. Numeric fields are plain decimal text
//! (`N`), character fields are space-padded UTF-8 bytes. String cells are
//! stored unescaped on this path.

use std::fs;
use std::path::Path;

use chrono::{Datelike, Local};

use crate::error::{RatError, Result};
use crate::fields::{FieldType, RatField};
use crate::model::{CellValue, ColumnData};

const DBF_VERSION: u8 = 0x03;
const HEADER_TERMINATOR: u8 = 0x0D;
const FILE_TERMINATOR: u8 = 0x1A;
const RECORD_ACTIVE: u8 = b' ';
const RECORD_DELETED: u8 = b'*';

const INTEGER_WIDTH: usize = 18;
const REAL_WIDTH: usize = 32;
const REAL_DECIMALS: u8 = 15;
const MAX_TEXT_WIDTH: usize = 254;

/// One decoded sidecar column. Role inference happens in the loader, not
/// here; the codec only knows names and primitive types.
#[derive(Debug, Clone, PartialEq)]
pub struct DbfColumn {
    pub name: String,
    pub data: ColumnData,
}

struct FieldDescriptor {
    name: String,
    kind: u8,
    width: usize,
    decimals: u8,
}

impl FieldDescriptor {
    fn field_type(&self) -> FieldType {
        match self.kind {
            b'N' if self.decimals == 0 => FieldType::Integer,
            b'N' | b'F' => FieldType::Real,
            _ => FieldType::String,
        }
    }
}

/// Read a sidecar table. Deleted records are skipped.
pub fn read(path: &Path) -> Result<Vec<DbfColumn>> {
    let bytes = fs::read(path)?;
    if bytes.len() < 33 {
        return Err(RatError::Codec(format!(
            "{}: too short for a DBF header",
            path.display()
        )));
    }
    let record_count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let header_size = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let record_size = u16::from_le_bytes([bytes[10], bytes[11]]) as usize;

    let mut descriptors = Vec::new();
    let mut offset = 32;
    while offset + 32 <= bytes.len() && bytes[offset] != HEADER_TERMINATOR {
        let raw = &bytes[offset..offset + 32];
        let name_end = raw[..11].iter().position(|b| *b == 0).unwrap_or(11);
        descriptors.push(FieldDescriptor {
            name: String::from_utf8_lossy(&raw[..name_end]).trim().to_string(),
            kind: raw[11],
            width: raw[16] as usize,
            decimals: raw[17],
        });
        offset += 32;
    }
    if descriptors.is_empty() {
        return Err(RatError::Codec(format!(
            "{}: no field descriptors",
            path.display()
        )));
    }
    let expected_record_size = 1 + descriptors.iter().map(|d| d.width).sum::<usize>();
    if record_size != expected_record_size {
        return Err(RatError::Codec(format!(
            "{}: record size {} does not match field widths ({})",
            path.display(),
            record_size,
            expected_record_size
        )));
    }

    let mut columns: Vec<DbfColumn> = descriptors
        .iter()
        .map(|d| DbfColumn {
            name: d.name.clone(),
            data: ColumnData::empty(d.field_type()),
        })
        .collect();

    let mut offset = header_size;
    for _ in 0..record_count {
        if offset + record_size > bytes.len() {
            break;
        }
        let record = &bytes[offset..offset + record_size];
        offset += record_size;
        if record[0] == RECORD_DELETED {
            continue;
        }
        let mut pos = 1;
        for (descriptor, column) in descriptors.iter().zip(columns.iter_mut()) {
            let raw = &record[pos..pos + descriptor.width];
            pos += descriptor.width;
            let text = String::from_utf8_lossy(raw);
            let cell = match column.data.field_type() {
                FieldType::Integer => CellValue::Integer(parse_integer(text.trim())),
                FieldType::Real => CellValue::Real(text.trim().parse().unwrap_or(0.0)),
                FieldType::String => CellValue::Text(text.trim_end_matches(' ').to_string()),
            };
            column.data.push(cell);
        }
    }
    Ok(columns)
}

fn parse_integer(text: &str) -> i64 {
    text.parse()
        .unwrap_or_else(|_| text.parse::<f64>().map(|v| v as i64).unwrap_or(0))
}

/// Write (overwrite) a sidecar table.
pub fn write(path: &Path, fields: &[RatField], columns: &[ColumnData]) -> Result<()> {
    if fields.len() != columns.len() {
        return Err(RatError::DataInconsistency(format!(
            "{} fields but {} columns",
            fields.len(),
            columns.len()
        )));
    }
    let row_count = columns.first().map(|c| c.len()).unwrap_or(0);

    let widths: Vec<usize> = fields
        .iter()
        .zip(columns)
        .map(|(field, column)| match field.field_type {
            FieldType::Integer => INTEGER_WIDTH,
            FieldType::Real => REAL_WIDTH,
            FieldType::String => text_width(column),
        })
        .collect();
    let record_size = 1 + widths.iter().sum::<usize>();
    let header_size = 32 + 32 * fields.len() + 1;

    let mut out = Vec::with_capacity(header_size + row_count * record_size + 1);
    out.push(DBF_VERSION);
    let (yy, mm, dd) = today_ymd();
    out.extend_from_slice(&[yy, mm, dd]);
    out.extend_from_slice(&(row_count as u32).to_le_bytes());
    out.extend_from_slice(&(header_size as u16).to_le_bytes());
    out.extend_from_slice(&(record_size as u16).to_le_bytes());
    out.extend_from_slice(&[0u8; 20]);

    for (field, width) in fields.iter().zip(&widths) {
        let mut name = [0u8; 11];
        let trimmed = truncate_bytes(&field.name, 10);
        name[..trimmed.len()].copy_from_slice(trimmed.as_bytes());
        out.extend_from_slice(&name);
        let (kind, decimals) = match field.field_type {
            FieldType::Integer => (b'N', 0),
            FieldType::Real => (b'N', REAL_DECIMALS),
            FieldType::String => (b'C', 0),
        };
        out.push(kind);
        out.extend_from_slice(&[0u8; 4]);
        out.push(*width as u8);
        out.push(decimals);
        out.extend_from_slice(&[0u8; 14]);
    }
    out.push(HEADER_TERMINATOR);

    for row in 0..row_count {
        out.push(RECORD_ACTIVE);
        for (column, width) in columns.iter().zip(&widths) {
            match column.get(row) {
                Some(CellValue::Integer(v)) => push_numeric(&mut out, &v.to_string(), *width)?,
                Some(CellValue::Real(v)) => {
                    let mut text = v.to_string();
                    if text.len() > *width {
                        text = format!("{:e}", v);
                    }
                    push_numeric(&mut out, &text, *width)?;
                }
                Some(CellValue::Text(v)) => {
                    let cell = truncate_bytes(&v, *width);
                    out.extend_from_slice(cell.as_bytes());
                    out.resize(out.len() + (*width - cell.len()), b' ');
                }
                None => {
                    return Err(RatError::DataInconsistency(format!(
                        "missing cell at row {}",
                        row
                    )))
                }
            }
        }
    }
    out.push(FILE_TERMINATOR);
    fs::write(path, out)?;
    Ok(())
}

fn text_width(column: &ColumnData) -> usize {
    let longest = match column {
        ColumnData::Text(v) => v.iter().map(|s| s.len()).max().unwrap_or(0),
        _ => 0,
    };
    longest.clamp(1, MAX_TEXT_WIDTH)
}

/// Right-justified, space-padded numeric cell.
fn push_numeric(out: &mut Vec<u8>, text: &str, width: usize) -> Result<()> {
    if text.len() > width {
        return Err(RatError::Codec(format!(
            "numeric value {} does not fit in a {}-byte field",
            text, width
        )));
    }
    out.resize(out.len() + (width - text.len()), b' ');
    out.extend_from_slice(text.as_bytes());
    Ok(())
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a
/// character.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Header date bytes: years since 1900, month, day.
fn today_ymd() -> (u8, u8, u8) {
    let today = Local::now().date_naive();
    (
        (today.year() - 1900).clamp(0, 255) as u8,
        today.month() as u8,
        today.day() as u8,
    )
}
