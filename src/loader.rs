//! Table Loader: builds a [`Rat`] from whichever encoding a raster
//! carries.
//!
//! Embedded aux.xml metadata wins; when it is absent or empty the loader
//! walks a fixed list of sidecar candidates and takes the first that
//! exists and parses. Sidecar role inference and the repair of malformed
//! embedded metadata are deliberately limited to a documented, ordered
//! pattern list: this is a best-effort fix-up for legacy tables, not a
//! guessing game.

use std::path::Path;

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::codec::{self, aux_xml, dbf};
use crate::config::RatConfig;
use crate::error::Result;
use crate::fields::{FieldType, FieldUsage, RatField};
use crate::rat::Rat;
use crate::raster::{ColorRamp, RandomColorRamp, RasterLayer};
use crate::writer::PendingWrites;

/// Name patterns used to repair tables that lost their value/count
/// roles, in priority order. Matched against the uppercased column name.
static REPAIR_PATTERNS: Lazy<Vec<(FieldUsage, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (FieldUsage::Value, vec!["VALUE"]),
        (
            FieldUsage::ValueMin,
            vec!["MIN", "VALUE MIN", "VALUE_MIN", "VALUE MINIMUM"],
        ),
        (
            FieldUsage::ValueMax,
            vec!["MAX", "VALUE MAX", "VALUE_MAX", "VALUE MAXIMUM"],
        ),
        (
            FieldUsage::PixelCount,
            vec!["COUNT", "PIXEL COUNT", "PIXEL_COUNT"],
        ),
    ]
});

/// Load the RAT of `band`, consulting the pending-write registry before
/// trusting what is on disk.
///
/// Always returns a table; check [`Rat::is_valid`] before using it — an
/// invalid table means "no RAT available", even when it carries data.
pub fn load_rat(
    raster_path: &Path,
    band: usize,
    config: &RatConfig,
    pending: Option<&mut PendingWrites>,
) -> Result<Rat> {
    let rat = load_from_disk(raster_path, band, config)?;
    if let Some(registry) = pending {
        if let Some(stored) = registry.get(raster_path, band).cloned() {
            if rat.is_valid() && rat.same_content(&stored) {
                debug!(path = %raster_path.display(), band, "pending RAT confirmed durable");
                registry.confirm(raster_path, band);
            } else {
                warn!(
                    path = %raster_path.display(),
                    band,
                    "on-disk RAT is stale, serving the pending in-memory copy"
                );
                return Ok(stored);
            }
        }
    }
    Ok(rat)
}

fn load_from_disk(raster_path: &Path, band: usize, config: &RatConfig) -> Result<Rat> {
    let aux_path = codec::append_suffix(raster_path, codec::AUX_XML_SUFFIX);
    if aux_path.exists() {
        match aux_xml::read_band(&aux_path, band) {
            Ok(Some(band_rat)) if !band_rat.fields.is_empty() => {
                let mut rat = Rat::new(band_rat.fields, band_rat.columns, false, &aux_path)?;
                repair_usages(&mut rat);
                rat.rebuild_colors();
                return Ok(rat);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(path = %aux_path.display(), %err, "unreadable aux.xml, trying sidecars");
            }
        }
    }

    // Sidecar candidates are derived from the raster name; the band is
    // irrelevant on this path.
    for candidate in codec::sidecar_candidates(raster_path) {
        if !candidate.exists() {
            continue;
        }
        match dbf::read(&candidate) {
            Ok(columns) if !columns.is_empty() => {
                let mut rat = rat_from_sidecar(columns, &candidate, config)?;
                repair_usages(&mut rat);
                rat.rebuild_colors();
                return Ok(rat);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(path = %candidate.display(), %err, "unreadable sidecar, trying next candidate");
            }
        }
    }

    Ok(Rat::empty(aux_path, false))
}

/// Heuristic role inference for sidecar columns: `VALUE` and `COUNT` by
/// name, color channels through the configured alias sets, everything
/// else Generic.
fn rat_from_sidecar(columns: Vec<dbf::DbfColumn>, path: &Path, config: &RatConfig) -> Result<Rat> {
    let mut fields = Vec::with_capacity(columns.len());
    let mut data = Vec::with_capacity(columns.len());
    let mut taken: Vec<FieldUsage> = Vec::new();
    for column in columns {
        let field_type = column.data.field_type();
        let upper = column.name.to_uppercase();
        let mut usage = if upper == "VALUE" && field_type.is_numeric() {
            FieldUsage::Value
        } else if upper == "COUNT" && field_type == FieldType::Integer {
            FieldUsage::PixelCount
        } else {
            match config.color_usage(&column.name) {
                Some(color) if field_type.is_numeric() => color,
                _ => FieldUsage::Generic,
            }
        };
        if usage.is_unique() && taken.contains(&usage) {
            debug!(column = %column.name, "duplicate {} column demoted to Generic", usage.label());
            usage = FieldUsage::Generic;
        }
        taken.push(usage);
        fields.push(RatField::new(column.name, usage, field_type));
        data.push(column.data);
    }
    Rat::new(fields, data, true, path)
}

/// Repair malformed metadata that lacks any value/count role by sniffing
/// well-known header spellings. Only Generic, numeric columns are ever
/// reassigned.
fn repair_usages(rat: &mut Rat) {
    let usages = rat.usages();
    let has_value = usages.contains(&FieldUsage::Value);
    let has_range =
        usages.contains(&FieldUsage::ValueMin) && usages.contains(&FieldUsage::ValueMax);
    if has_value || has_range {
        return;
    }
    for (usage, patterns) in REPAIR_PATTERNS.iter() {
        if rat.field_by_usage(*usage).is_some() {
            continue;
        }
        let found = rat.fields().iter().position(|f| {
            f.usage == FieldUsage::Generic
                && f.field_type.is_numeric()
                && patterns.contains(&f.name.to_uppercase().as_str())
        });
        if let Some(index) = found {
            info!(
                column = %rat.fields()[index].name,
                usage = usage.label(),
                "repaired field usage from column name"
            );
            rat.set_field_usage(index, *usage);
        }
    }
}

/// True when `band` has a usable RAT in either encoding, or one parked
/// in the pending-write registry awaiting a confirmed flush.
pub fn has_rat(
    raster_path: &Path,
    band: usize,
    config: &RatConfig,
    pending: Option<&PendingWrites>,
) -> bool {
    if pending.is_some_and(|registry| registry.get(raster_path, band).is_some()) {
        return true;
    }
    load_from_disk(raster_path, band, config)
        .map(|rat| rat.is_valid())
        .unwrap_or(false)
}

/// Synthesize a brand-new thematic RAT from the raster's current class
/// data: the "create from renderer" lifecycle entry point.
pub fn create_rat_from_raster(
    layer: &mut dyn RasterLayer,
    band: usize,
    sidecar: bool,
    ramp: Option<&dyn ColorRamp>,
) -> Result<Rat> {
    let default_ramp = RandomColorRamp::new();
    let classes = layer.class_data(band, ramp.unwrap_or(&default_ramp))?;
    let value_type = if classes.iter().all(|c| c.value.fract() == 0.0) {
        FieldType::Integer
    } else {
        FieldType::Real
    };
    let path = if sidecar {
        codec::sidecar_target(layer.source())
    } else {
        codec::append_suffix(layer.source(), codec::AUX_XML_SUFFIX)
    };
    Ok(Rat::from_classes(&classes, value_type, sidecar, path))
}
