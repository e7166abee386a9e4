//! End-to-end lifecycle tests: create, save, reload and classify tables
//! through the public API only, against real files in a temp directory.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use rattable::classify::{classify, deduplicate_legend_entries};
use rattable::config::RatConfig;
use rattable::fields::{FieldType, FieldUsage, RatField};
use rattable::loader::{create_rat_from_raster, has_rat, load_rat};
use rattable::model::{CellValue, Color, ColumnData, TableType};
use rattable::rat::Rat;
use rattable::raster::memory::{InMemoryLegend, InMemoryRaster};
use rattable::raster::{RasterLayer, RendererSpec};
use rattable::writer::{save, PendingWrites};

fn touch(path: &Path) {
    fs::write(path, b"raster bytes").unwrap();
}

fn landcover_rat(path: impl Into<std::path::PathBuf>, sidecar: bool) -> Rat {
    Rat::new(
        vec![
            RatField::new("Value", FieldUsage::Value, FieldType::Integer),
            RatField::new("Count", FieldUsage::PixelCount, FieldType::Integer),
            RatField::new("Class", FieldUsage::Name, FieldType::String),
            RatField::new("Red", FieldUsage::Red, FieldType::Integer),
            RatField::new("Green", FieldUsage::Green, FieldType::Integer),
            RatField::new("Blue", FieldUsage::Blue, FieldType::Integer),
            RatField::new("Alpha", FieldUsage::Alpha, FieldType::Integer),
        ],
        vec![
            ColumnData::Integer(vec![0, 2, 4]),
            ColumnData::Integer(vec![100, 50, 25]),
            ColumnData::Text(vec!["água & <sal>".into(), "forêt".into(), "urban".into()]),
            ColumnData::Integer(vec![0, 30, 200]),
            ColumnData::Integer(vec![100, 120, 200]),
            ColumnData::Integer(vec![200, 40, 200]),
            ColumnData::Integer(vec![255, 255, 255]),
        ],
        sidecar,
        path,
    )
    .unwrap()
}

#[test]
fn embedded_save_and_reload_preserves_everything() {
    let dir = TempDir::new().unwrap();
    let raster = dir.path().join("landcover.tif");
    touch(&raster);
    let rat = landcover_rat(dir.path().join("landcover.tif.aux.xml"), false);

    let config = RatConfig::default();
    let mut pending = PendingWrites::new();
    save(&rat, 1, &config, Some(&mut pending)).unwrap();
    assert!(pending.is_empty());
    assert!(has_rat(&raster, 1, &config, None));

    let loaded = load_rat(&raster, 1, &config, Some(&mut pending)).unwrap();
    assert!(!loaded.is_sidecar);
    assert!(loaded.same_content(&rat));
    assert_eq!(loaded.table_type(), Some(TableType::Thematic));
    // Escaped characters survive the XML round trip.
    assert_eq!(
        loaded.get_value(0, "Class"),
        Some(CellValue::Text("água & <sal>".into()))
    );
    assert_eq!(loaded.get_color(1), Some(Color::rgb(30, 120, 40)));
}

#[test]
fn sidecar_save_and_reload_preserves_everything() {
    let dir = TempDir::new().unwrap();
    let raster = dir.path().join("landcover.tif");
    touch(&raster);
    let rat = landcover_rat(dir.path().join("landcover.tif.vat.dbf"), true);

    let config = RatConfig::default();
    save(&rat, 1, &config, None).unwrap();
    assert!(dir.path().join("landcover.tif.vat.dbf").exists());

    let loaded = load_rat(&raster, 1, &config, None).unwrap();
    assert!(loaded.is_sidecar);
    assert_eq!(loaded.row_count(), 3);
    // Sidecar strings are stored unescaped.
    assert_eq!(
        loaded.get_value(0, "Class"),
        Some(CellValue::Text("água & <sal>".into()))
    );
    assert_eq!(loaded.field("Value").unwrap().usage, FieldUsage::Value);
    assert_eq!(loaded.field("Count").unwrap().usage, FieldUsage::PixelCount);
    assert!(loaded.has_color());
    assert_eq!(loaded.get_color(2), Some(Color::rgb(200, 200, 200)));
}

#[test]
fn edit_cycle_survives_a_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let raster = dir.path().join("landcover.tif");
    touch(&raster);
    let mut rat = landcover_rat(dir.path().join("landcover.tif.aux.xml"), false);

    rat.insert_row(3).unwrap();
    rat.set_value(3, "Value", CellValue::Integer(6)).unwrap();
    rat.set_value(3, "Class", CellValue::Text("water".into()))
        .unwrap();
    rat.set_color(3, Color::rgb(0, 0, 255));
    rat.insert_column(3, RatField::new("Notes", FieldUsage::Generic, FieldType::String))
        .unwrap();

    let config = RatConfig::default();
    save(&rat, 1, &config, None).unwrap();
    let loaded = load_rat(&raster, 1, &config, None).unwrap();
    assert_eq!(loaded.row_count(), 4);
    assert_eq!(loaded.get_color(3), Some(Color::rgb(0, 0, 255)));
    assert!(loaded.field("Notes").is_some());
    assert!(loaded.same_content(&rat));
}

#[test]
fn create_save_classify_round_trip() {
    let dir = TempDir::new().unwrap();
    let raster_path = dir.path().join("veg.img");
    touch(&raster_path);

    let mut layer = InMemoryRaster::new(&raster_path).with_band(&[0.0, 2.0, 4.0]);
    let rat = create_rat_from_raster(&mut layer, 1, true, None).unwrap();
    assert!(rat.is_valid());

    let config = RatConfig::default();
    save(&rat, 1, &config, None).unwrap();
    let loaded = load_rat(&raster_path, 1, &config, None).unwrap();
    assert!(loaded.is_sidecar);

    let unique = classify(&mut layer, 1, &loaded, "Class", None).unwrap();
    assert_eq!(unique, vec![1, 2, 3]);
    match layer.renderer().unwrap() {
        RendererSpec::Paletted { classes, .. } => {
            assert_eq!(classes.len(), 3);
            // The renderer colors come from the table, not the ramp.
            assert_eq!(Some(classes[0].color), loaded.get_color(0));
        }
        other => panic!("unexpected renderer {:?}", other),
    }

    let mut legend = InMemoryLegend::new(&["header", "0", "2", "4"]);
    deduplicate_legend_entries(&mut legend, "Class", &unique);
    assert_eq!(legend.labels()[0], "Class");
    assert_eq!(legend.order(), &[0, 1, 2, 3]);
}

#[test]
fn pending_entry_is_served_then_confirmed() {
    let dir = TempDir::new().unwrap();
    let raster = dir.path().join("landcover.tif");
    touch(&raster);
    let rat = landcover_rat(dir.path().join("landcover.tif.aux.xml"), false);

    // Legacy mode leaves the entry pending after the save.
    let mut config = RatConfig::default();
    config.verify_embedded_flush = false;
    let mut pending = PendingWrites::new();
    save(&rat, 1, &config, Some(&mut pending)).unwrap();
    assert_eq!(pending.len(), 1);

    // The write actually stuck, so the next load confirms and drops it.
    let loaded = load_rat(&raster, 1, &config, Some(&mut pending)).unwrap();
    assert!(pending.is_empty());
    assert!(loaded.same_content(&rat));

    // Simulate a flush that did not stick: the registry serves its copy.
    pending.register(&raster, 1, &rat);
    fs::remove_file(dir.path().join("landcover.tif.aux.xml")).unwrap();
    let served = load_rat(&raster, 1, &config, Some(&mut pending)).unwrap();
    assert!(served.same_content(&rat));
    assert_eq!(pending.len(), 1);
}

#[test]
fn multi_band_aux_xml_keeps_other_bands_intact() {
    let dir = TempDir::new().unwrap();
    let raster = dir.path().join("stack.tif");
    touch(&raster);
    let aux = dir.path().join("stack.tif.aux.xml");

    let band1 = landcover_rat(&aux, false);
    save(&band1, 1, &RatConfig::default(), None).unwrap();

    let mut band2 = landcover_rat(&aux, false);
    band2
        .set_value(0, "Class", CellValue::Text("band two".into()))
        .unwrap();
    save(&band2, 2, &RatConfig::default(), None).unwrap();

    let loaded1 = load_rat(&raster, 1, &RatConfig::default(), None).unwrap();
    let loaded2 = load_rat(&raster, 2, &RatConfig::default(), None).unwrap();
    assert!(loaded1.same_content(&band1));
    assert!(loaded2.same_content(&band2));
}

#[test]
fn athematic_table_round_trips_and_classifies() {
    let dir = TempDir::new().unwrap();
    let raster = dir.path().join("dem.tif");
    touch(&raster);
    let rat = Rat::new(
        vec![
            RatField::new("Value Min", FieldUsage::ValueMin, FieldType::Real),
            RatField::new("Value Max", FieldUsage::ValueMax, FieldType::Real),
            RatField::new("Class", FieldUsage::Name, FieldType::String),
        ],
        vec![
            ColumnData::Real(vec![0.0, 100.5, 200.25]),
            ColumnData::Real(vec![100.5, 200.25, 300.0]),
            ColumnData::Text(vec!["low".into(), "low".into(), "high".into()]),
        ],
        false,
        dir.path().join("dem.tif.aux.xml"),
    )
    .unwrap();
    assert_eq!(rat.table_type(), Some(TableType::Athematic));

    save(&rat, 1, &RatConfig::default(), None).unwrap();
    let loaded = load_rat(&raster, 1, &RatConfig::default(), None).unwrap();
    assert!(loaded.same_content(&rat));

    let mut layer = InMemoryRaster::new(&raster);
    let unique = classify(&mut layer, 1, &loaded, "Class", None).unwrap();
    assert_eq!(unique, vec![1, 3]);
    match layer.renderer().unwrap() {
        RendererSpec::PseudoColor {
            min, max, items, ..
        } => {
            assert_eq!(*min, 0.0);
            assert_eq!(*max, 300.0);
            assert_eq!(items[0].color, items[1].color);
        }
        other => panic!("unexpected renderer {:?}", other),
    }
}
