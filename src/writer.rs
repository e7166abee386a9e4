//! Table Writer: persists a RAT back to its encoding, dispatching on
//! provenance.
//!
//! The embedded path has a durability quirk in the wrapped native raster
//! stack: a freshly written RAT can fail to stick on the first flush. The
//! writer therefore re-reads what it wrote and flushes a second time only
//! on mismatch (the legacy blind double flush stays available through
//! [`RatConfig::verify_embedded_flush`]). Until a read confirms
//! durability, the in-memory table is parked in a [`PendingWrites`]
//! registry keyed by `(raster path, band)` so the loader can re-serve it
//! instead of trusting a stale handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::codec::{self, aux_xml, dbf};
use crate::config::RatConfig;
use crate::error::{RatError, Result};
use crate::model::ColumnData;
use crate::rat::Rat;

/// Write-ahead registry of tables awaiting a confirmed flush.
#[derive(Debug, Default)]
pub struct PendingWrites {
    entries: HashMap<(PathBuf, usize), Rat>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, raster_path: &Path, band: usize, rat: &Rat) {
        self.entries
            .insert((raster_path.to_path_buf(), band), rat.clone());
    }

    pub fn get(&self, raster_path: &Path, band: usize) -> Option<&Rat> {
        self.entries.get(&(raster_path.to_path_buf(), band))
    }

    /// Drop a confirmed-durable entry. Returns whether one was present.
    pub fn confirm(&mut self, raster_path: &Path, band: usize) -> bool {
        self.entries
            .remove(&(raster_path.to_path_buf(), band))
            .is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Persist `rat` for `band`, dispatching on provenance: sidecar tables
/// are exported as `.vat.dbf`, embedded ones rewritten into the aux.xml.
pub fn save(
    rat: &Rat,
    band: usize,
    config: &RatConfig,
    mut pending: Option<&mut PendingWrites>,
) -> Result<()> {
    let raster_source = codec::raster_source_for(&rat.path).ok_or_else(|| {
        RatError::Codec(format!(
            "RAT path carries no recognized suffix: {}",
            rat.path.display()
        ))
    })?;
    if !raster_source.exists() {
        return Err(RatError::SourceMissing(raster_source));
    }
    if rat.is_sidecar {
        save_sidecar(rat, &raster_source)
    } else {
        save_embedded(rat, band, &raster_source, config, pending.as_deref_mut())
    }
}

fn save_sidecar(rat: &Rat, raster_source: &Path) -> Result<()> {
    let target = codec::sidecar_target(raster_source);
    dbf::write(&target, rat.fields(), rat.columns())?;
    info!(path = %target.display(), "sidecar RAT saved");
    Ok(())
}

fn save_embedded(
    rat: &Rat,
    band: usize,
    raster_source: &Path,
    config: &RatConfig,
    mut pending: Option<&mut PendingWrites>,
) -> Result<()> {
    let table_type = rat.table_type().ok_or_else(|| {
        RatError::Validation("Cannot save a RAT without value columns.".to_string())
    })?;

    // Rebuild the native table cell by cell, then check its shape
    // against the source table before attaching it.
    let mut columns: Vec<ColumnData> = rat
        .fields()
        .iter()
        .map(|f| ColumnData::empty(f.field_type))
        .collect();
    for row in 0..rat.row_count() {
        for (index, field) in rat.fields().iter().enumerate() {
            let cell = rat.get_value(row, &field.name).ok_or_else(|| {
                RatError::DataInconsistency(format!(
                    "missing cell at row {} column {}",
                    row, field.name
                ))
            })?;
            columns[index].push(cell);
        }
    }
    if columns.len() != rat.column_count()
        || columns.iter().any(|c| c.len() != rat.row_count())
    {
        return Err(RatError::DataInconsistency(
            "rebuilt table shape does not match the source table".to_string(),
        ));
    }
    let band_rat = aux_xml::BandRat {
        band,
        table_type: Some(table_type),
        fields: rat.fields().to_vec(),
        columns,
    };

    if let Some(registry) = pending.as_deref_mut() {
        registry.register(raster_source, band, rat);
    }

    aux_xml::write_band(&rat.path, &band_rat)?;
    if config.verify_embedded_flush {
        if !written_matches(&rat.path, &band_rat)? {
            warn!(path = %rat.path.display(), "embedded RAT not durable after first flush, flushing again");
            aux_xml::write_band(&rat.path, &band_rat)?;
            if !written_matches(&rat.path, &band_rat)? {
                return Err(RatError::DataInconsistency(format!(
                    "embedded RAT still differs after second flush: {}",
                    rat.path.display()
                )));
            }
        }
        // Durability confirmed by the read-back.
        if let Some(registry) = pending {
            registry.confirm(raster_source, band);
        }
    } else {
        // Legacy behavior: flush twice, no questions asked. The entry
        // stays pending until a later load confirms it.
        aux_xml::write_band(&rat.path, &band_rat)?;
    }
    info!(path = %rat.path.display(), band, "embedded RAT saved");
    Ok(())
}

fn written_matches(path: &Path, expected: &aux_xml::BandRat) -> Result<bool> {
    Ok(aux_xml::read_band(path, expected.band)?
        .map(|on_disk| on_disk == *expected)
        .unwrap_or(false))
}
