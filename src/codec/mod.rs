//! # Persistent encodings
//!
//! A RAT lives on disk in one of two forms:
//!
//! - embedded per-band metadata beside the raster, `<raster>.aux.xml`
//!   ([`aux_xml`]), string cells entity-escaped;
//! - an external dBASE sidecar, `<raster>.vat.dbf` ([`dbf`]), string
//!   cells unescaped.
//!
//! This module holds the path plumbing shared by both: suffix handling,
//! the ordered sidecar candidate list and the export target rule.

use std::path::{Path, PathBuf};

pub mod aux_xml;
pub mod dbf;

pub const AUX_XML_SUFFIX: &str = ".aux.xml";
pub const VAT_DBF_SUFFIX: &str = ".vat.dbf";

/// `path` + `suffix`, preserving the full original file name
/// (`raster.tif` -> `raster.tif.aux.xml`).
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// The raster a RAT file belongs to, by stripping the `.aux.xml` /
/// `.vat.dbf` suffix. None when the path carries neither.
pub fn raster_source_for(rat_path: &Path) -> Option<PathBuf> {
    let name = rat_path.file_name()?.to_str()?;
    let lower = name.to_ascii_lowercase();
    for suffix in [AUX_XML_SUFFIX, VAT_DBF_SUFFIX] {
        if lower.ends_with(suffix) && name.len() > suffix.len() {
            return Some(rat_path.with_file_name(&name[..name.len() - suffix.len()]));
        }
    }
    None
}

/// Ordered sidecar candidates for a raster, first match wins:
/// `{basename}.dbf`, `{basename}.vat.dbf`, `{filename}.dbf`,
/// `{filename}.vat.dbf`.
pub fn sidecar_candidates(raster_path: &Path) -> Vec<PathBuf> {
    let Some(filename) = raster_path.file_name().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let basename = raster_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let dir = raster_path.parent().unwrap_or_else(|| Path::new(""));
    let mut candidates = Vec::with_capacity(4);
    for name in [
        format!("{}.dbf", basename),
        format!("{}.vat.dbf", basename),
        format!("{}.dbf", filename),
        format!("{}.vat.dbf", filename),
    ] {
        let path = dir.join(name);
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }
    candidates
}

/// Export target for the sidecar writer: `<raster>.vat.dbf`, unless the
/// raster name itself already ends in `.vat`.
pub fn sidecar_target(raster_path: &Path) -> PathBuf {
    let name = raster_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if name.to_ascii_uppercase().ends_with(".VAT") {
        append_suffix(raster_path, ".dbf")
    } else {
        append_suffix(raster_path, VAT_DBF_SUFFIX)
    }
}
