//! PAM-style `<raster>.aux.xml` reader/writer for embedded RATs.
//!
//! Layout mirrors GDAL's persistent auxiliary metadata:
//!
//! ```xml
//! <PAMDataset>
//!   <PAMRasterBand band="1">
//!     <GDALRasterAttributeTable tableType="thematic">
//!       <FieldDefn index="0"><Name>Value</Name><Type>0</Type><Usage>5</Usage></FieldDefn>
//!       <Row index="0"><F>0</F></Row>
//!     </GDALRasterAttributeTable>
//!   </PAMRasterBand>
//! </PAMDataset>
//! ```
//!
//! String cells are entity-escaped on this path; reading unescapes them.
//! Writing a band preserves the RATs of every other band already in the
//! file (non-RAT PAM metadata is not carried).

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::warn;

use crate::error::{RatError, Result};
use crate::fields::{FieldType, FieldUsage, RatField};
use crate::model::{CellValue, ColumnData, TableType};

/// One band's decoded attribute table.
#[derive(Debug, Clone, PartialEq)]
pub struct BandRat {
    pub band: usize,
    pub table_type: Option<TableType>,
    pub fields: Vec<RatField>,
    pub columns: Vec<ColumnData>,
}

#[derive(Default)]
struct PendingField {
    index: usize,
    name: String,
    type_code: Option<u8>,
    usage_code: Option<u8>,
}

#[derive(Default)]
struct PendingBand {
    band: usize,
    table_type: Option<TableType>,
    fields: Vec<(usize, RatField)>,
    rows: Vec<Vec<String>>,
}

impl PendingBand {
    fn finish(mut self) -> Result<BandRat> {
        self.fields.sort_by_key(|(index, _)| *index);
        let fields: Vec<RatField> = self.fields.into_iter().map(|(_, f)| f).collect();
        let mut columns: Vec<ColumnData> = fields
            .iter()
            .map(|f| ColumnData::empty(f.field_type))
            .collect();
        for (row_index, row) in self.rows.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(RatError::Codec(format!(
                    "row {} has {} cells, expected {}",
                    row_index,
                    row.len(),
                    fields.len()
                )));
            }
            for (cell, column) in row.iter().zip(columns.iter_mut()) {
                let value = match column.field_type() {
                    FieldType::Integer => CellValue::Integer(
                        cell.trim()
                            .parse()
                            .unwrap_or_else(|_| cell.trim().parse::<f64>().unwrap_or(0.0) as i64),
                    ),
                    FieldType::Real => CellValue::Real(cell.trim().parse().unwrap_or(0.0)),
                    FieldType::String => CellValue::Text(cell.clone()),
                };
                column.push(value);
            }
        }
        Ok(BandRat {
            band: self.band,
            table_type: self.table_type,
            fields,
            columns,
        })
    }
}

fn attribute(start: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// All per-band RATs in the file; empty when the file does not exist.
pub fn read_all(path: &Path) -> Result<Vec<BandRat>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    // Text is NOT trimmed: string cells keep their whitespace verbatim.
    // Numeric element content is trimmed at the parse sites instead.
    let mut reader = Reader::from_str(&content);

    let mut bands = Vec::new();
    let mut current: Option<PendingBand> = None;
    let mut in_rat = false;
    let mut field: Option<PendingField> = None;
    let mut row: Option<Vec<String>> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                text.clear();
                match e.name().as_ref() {
                    b"PAMRasterBand" => {
                        let band = attribute(&e, b"band")?
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(1);
                        current = Some(PendingBand {
                            band,
                            ..Default::default()
                        });
                    }
                    b"GDALRasterAttributeTable" if current.is_some() => {
                        in_rat = true;
                        if let Some(pending) = current.as_mut() {
                            pending.table_type = attribute(&e, b"tableType")?
                                .as_deref()
                                .and_then(TableType::parse);
                        }
                    }
                    b"FieldDefn" if in_rat => {
                        let index = attribute(&e, b"index")?
                            .and_then(|v| v.parse().ok())
                            .unwrap_or_else(|| {
                                current.as_ref().map(|p| p.fields.len()).unwrap_or(0)
                            });
                        field = Some(PendingField {
                            index,
                            ..Default::default()
                        });
                    }
                    b"Row" if in_rat => {
                        row = Some(Vec::new());
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if e.name().as_ref() == b"F" {
                    if let Some(cells) = row.as_mut() {
                        cells.push(String::new());
                    }
                }
            }
            Event::Text(e) => {
                text.push_str(&e.unescape()?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"Name" => {
                    if let Some(pending) = field.as_mut() {
                        pending.name = std::mem::take(&mut text);
                    }
                }
                b"Type" => {
                    if let Some(pending) = field.as_mut() {
                        pending.type_code = text.trim().parse().ok();
                    }
                }
                b"Usage" => {
                    if let Some(pending) = field.as_mut() {
                        pending.usage_code = text.trim().parse().ok();
                    }
                }
                b"F" => {
                    if let Some(cells) = row.as_mut() {
                        cells.push(std::mem::take(&mut text));
                    }
                }
                b"FieldDefn" => {
                    if let (Some(done), Some(pending)) = (field.take(), current.as_mut()) {
                        let field_type = FieldType::from_code(done.type_code.unwrap_or(2))?;
                        let usage = FieldUsage::from_code(done.usage_code.unwrap_or(0))?;
                        pending
                            .fields
                            .push((done.index, RatField::new(done.name, usage, field_type)));
                    }
                }
                b"Row" => {
                    if let (Some(cells), Some(pending)) = (row.take(), current.as_mut()) {
                        pending.rows.push(cells);
                    }
                }
                b"GDALRasterAttributeTable" => {
                    in_rat = false;
                }
                b"PAMRasterBand" => {
                    if let Some(pending) = current.take() {
                        if !pending.fields.is_empty() {
                            bands.push(pending.finish()?);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(bands)
}

/// The RAT of one band, if present.
pub fn read_band(path: &Path, band: usize) -> Result<Option<BandRat>> {
    Ok(read_all(path)?.into_iter().find(|b| b.band == band))
}

/// Write one band's RAT, keeping the other bands' tables already in the
/// file. A malformed existing file is replaced outright.
pub fn write_band(path: &Path, rat: &BandRat) -> Result<()> {
    let mut bands = match read_all(path) {
        Ok(bands) => bands,
        Err(err) => {
            warn!(path = %path.display(), %err, "existing aux.xml unreadable, rewriting");
            Vec::new()
        }
    };
    bands.retain(|b| b.band != rat.band);
    bands.push(rat.clone());
    bands.sort_by_key(|b| b.band);
    write_all(path, &bands)
}

fn write_all(path: &Path, bands: &[BandRat]) -> Result<()> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Start(BytesStart::new("PAMDataset")))?;
    for band_rat in bands {
        let band_attr = band_rat.band.to_string();
        let mut band_el = BytesStart::new("PAMRasterBand");
        band_el.push_attribute(("band", band_attr.as_str()));
        writer.write_event(Event::Start(band_el))?;

        let mut rat_el = BytesStart::new("GDALRasterAttributeTable");
        if let Some(table_type) = band_rat.table_type {
            rat_el.push_attribute(("tableType", table_type.as_str()));
        }
        writer.write_event(Event::Start(rat_el))?;

        for (index, field) in band_rat.fields.iter().enumerate() {
            let index_attr = index.to_string();
            let mut field_el = BytesStart::new("FieldDefn");
            field_el.push_attribute(("index", index_attr.as_str()));
            writer.write_event(Event::Start(field_el))?;
            write_text_element(&mut writer, "Name", &field.name)?;
            write_text_element(&mut writer, "Type", &field.field_type.code().to_string())?;
            write_text_element(&mut writer, "Usage", &field.usage.code().to_string())?;
            writer.write_event(Event::End(BytesEnd::new("FieldDefn")))?;
        }

        let row_count = band_rat.columns.first().map(|c| c.len()).unwrap_or(0);
        for row in 0..row_count {
            let index_attr = row.to_string();
            let mut row_el = BytesStart::new("Row");
            row_el.push_attribute(("index", index_attr.as_str()));
            writer.write_event(Event::Start(row_el))?;
            for column in &band_rat.columns {
                let cell = column
                    .get(row)
                    .ok_or_else(|| {
                        RatError::DataInconsistency(format!("missing cell at row {}", row))
                    })?
                    .to_string();
                write_text_element(&mut writer, "F", &cell)?;
            }
            writer.write_event(Event::End(BytesEnd::new("Row")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("GDALRasterAttributeTable")))?;
        writer.write_event(Event::End(BytesEnd::new("PAMRasterBand")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("PAMDataset")))?;
    let mut out = writer.into_inner();
    out.push(b'\n');
    fs::write(path, out)?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
