//! Classification Engine: turns a RAT plus a chosen criteria column into
//! a renderer on the raster, and keeps the legend in sync.
//!
//! Shared labels collapse onto the color of their first occurrence, so a
//! "forest" class split over many values (or ranges) renders as one
//! visual class. Thematic values missing from the table are treated as
//! no-data rather than silently dropped from the raster.

use std::collections::HashMap;

use tracing::info;

use crate::error::{RatError, Result};
use crate::fields::FieldUsage;
use crate::model::{Color, ColumnData, TableType};
use crate::rat::Rat;
use crate::raster::{
    ClassData, ColorRamp, LegendView, RampShaderItem, RandomColorRamp, RasterLayer, RendererSpec,
};

/// Classify `band` by the values of `criteria`, installing a renderer
/// built from the table.
///
/// Returns the 1-based legend row indexes of the first occurrence of each
/// distinct label; row 0 is reserved for the synthetic header entry that
/// [`deduplicate_legend_entries`] labels with the criteria name.
pub fn classify(
    layer: &mut dyn RasterLayer,
    band: usize,
    rat: &Rat,
    criteria: &str,
    ramp: Option<&dyn ColorRamp>,
) -> Result<Vec<usize>> {
    let table_type = rat.table_type().ok_or_else(|| {
        RatError::Validation("Cannot classify from a RAT without value columns.".to_string())
    })?;
    let labels = rat.column(criteria).ok_or_else(|| {
        RatError::Validation(format!("No column named {} to classify by.", criteria))
    })?;

    let default_ramp = RandomColorRamp::new();
    let ramp = ramp.unwrap_or(&default_ramp);

    let unique = if rat.field_by_usage(FieldUsage::Value).is_some() {
        debug_assert_eq!(table_type, TableType::Thematic);
        classify_thematic(layer, band, rat, criteria, ramp)?
    } else {
        classify_athematic(layer, band, rat, labels, ramp)?
    };
    layer.trigger_repaint();
    Ok(unique)
}

fn classify_thematic(
    layer: &mut dyn RasterLayer,
    band: usize,
    rat: &Rat,
    criteria: &str,
    ramp: &dyn ColorRamp,
) -> Result<Vec<usize>> {
    let value_index = rat
        .field_by_usage(FieldUsage::Value)
        .expect("checked by caller");
    let raw_classes = layer.class_data(band, ramp)?;

    let mut kept: Vec<ClassData> = Vec::new();
    let mut unique: Vec<usize> = Vec::new();
    let mut label_colors: HashMap<String, Color> = HashMap::new();
    for class in raw_classes {
        let Some(row) = rat.find_value_row(value_index, class.value) else {
            info!(value = class.value, "raster value not in the RAT, marking no-data");
            layer.register_nodata(band, class.value)?;
            continue;
        };
        let label = rat
            .get_value(row, criteria)
            .map(|cell| cell.to_string())
            .unwrap_or_default();
        let legend_row = kept.len() + 1;
        let color = match label_colors.get(&label) {
            Some(color) => *color,
            None => {
                let color = rat.get_color(row).unwrap_or(class.color);
                label_colors.insert(label.clone(), color);
                unique.push(legend_row);
                color
            }
        };
        kept.push(ClassData::new(class.value, label, color));
    }
    layer.set_renderer(RendererSpec::Paletted { band, classes: kept });
    Ok(unique)
}

fn classify_athematic(
    layer: &mut dyn RasterLayer,
    band: usize,
    rat: &Rat,
    labels: &ColumnData,
    ramp: &dyn ColorRamp,
) -> Result<Vec<usize>> {
    let min_column = rat
        .column_by_usage(FieldUsage::ValueMin)
        .expect("checked by caller");
    let max_column = rat
        .column_by_usage(FieldUsage::ValueMax)
        .expect("checked by caller");

    let rows = rat.row_count();
    let distinct = {
        let mut seen: Vec<String> = Vec::new();
        for row in 0..rows {
            let label = labels.get(row).map(|c| c.to_string()).unwrap_or_default();
            if !seen.contains(&label) {
                seen.push(label);
            }
        }
        seen.len()
    };

    let mut items: Vec<RampShaderItem> = Vec::new();
    let mut unique: Vec<usize> = Vec::new();
    let mut label_colors: HashMap<String, Color> = HashMap::new();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for row in 0..rows {
        let label = labels.get(row).map(|c| c.to_string()).unwrap_or_default();
        let lower = min_column.as_f64(row).unwrap_or(f64::NAN);
        let upper = max_column.as_f64(row).unwrap_or(f64::NAN);
        min = min.min(lower);
        max = max.max(upper);
        let color = match label_colors.get(&label) {
            Some(color) => *color,
            None => {
                let fraction = label_colors.len() as f64 / (distinct.max(2) - 1) as f64;
                let color = rat.get_color(row).unwrap_or_else(|| ramp.color(fraction));
                label_colors.insert(label.clone(), color);
                unique.push(row + 1);
                color
            }
        };
        // Discrete shader stops are keyed by the range's upper bound.
        items.push(RampShaderItem {
            value: upper,
            color,
            label,
        });
    }
    layer.set_renderer(RendererSpec::PseudoColor {
        band,
        min,
        max,
        items,
    });
    Ok(unique)
}

/// Collapse the legend to one entry per distinct label, headed by a
/// synthetic row carrying the criteria name.
pub fn deduplicate_legend_entries(
    legend: &mut dyn LegendView,
    criteria: &str,
    unique_row_indexes: &[usize],
) {
    let mut order = Vec::with_capacity(unique_row_indexes.len() + 1);
    order.push(0);
    order.extend_from_slice(unique_row_indexes);
    legend.set_row_order(&order);
    legend.set_row_label(0, criteria);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldType, RatField};
    use crate::model::ColumnData;
    use crate::raster::memory::{InMemoryLegend, InMemoryRaster};

    fn thematic_rat() -> Rat {
        Rat::new(
            vec![
                RatField::new("Value", FieldUsage::Value, FieldType::Integer),
                RatField::new("Class", FieldUsage::Name, FieldType::String),
                RatField::new("Red", FieldUsage::Red, FieldType::Integer),
                RatField::new("Green", FieldUsage::Green, FieldType::Integer),
                RatField::new("Blue", FieldUsage::Blue, FieldType::Integer),
            ],
            vec![
                ColumnData::Integer(vec![0, 2, 4]),
                ColumnData::Text(vec!["zero".into(), "one".into(), "two".into()]),
                ColumnData::Integer(vec![10, 20, 30]),
                ColumnData::Integer(vec![11, 21, 31]),
                ColumnData::Integer(vec![12, 22, 32]),
            ],
            false,
            "/data/veg.img.aux.xml",
        )
        .unwrap()
    }

    fn athematic_rat() -> Rat {
        Rat::new(
            vec![
                RatField::new("Min", FieldUsage::ValueMin, FieldType::Real),
                RatField::new("Max", FieldUsage::ValueMax, FieldType::Real),
                RatField::new("Class", FieldUsage::Name, FieldType::String),
            ],
            vec![
                ColumnData::Real(vec![0.0, 10.0, 20.0]),
                ColumnData::Real(vec![10.0, 20.0, 30.0]),
                ColumnData::Text(vec!["zero2".into(), "zero2".into(), "high".into()]),
            ],
            false,
            "/data/dem.tif.aux.xml",
        )
        .unwrap()
    }

    #[test]
    fn thematic_classification_installs_paletted_renderer() {
        let mut layer = InMemoryRaster::new("/data/veg.img").with_band(&[0.0, 2.0, 4.0]);
        let rat = thematic_rat();
        let unique = classify(&mut layer, 1, &rat, "Class", None).unwrap();

        assert_eq!(unique, vec![1, 2, 3]);
        assert_eq!(layer.repaints(), 1);
        match layer.renderer().unwrap() {
            RendererSpec::Paletted { band, classes } => {
                assert_eq!(*band, 1);
                assert_eq!(classes.len(), 3);
                assert_eq!(classes[0].label, "zero");
                assert_eq!(classes[1].color, Color::rgb(20, 21, 22));
            }
            other => panic!("unexpected renderer {:?}", other),
        }
    }

    #[test]
    fn unmatched_values_become_nodata() {
        let mut layer = InMemoryRaster::new("/data/veg.img").with_band(&[0.0, 2.0, 3.0, 4.0]);
        let rat = thematic_rat();
        let unique = classify(&mut layer, 1, &rat, "Class", None).unwrap();

        assert_eq!(unique, vec![1, 2, 3]);
        assert_eq!(layer.nodata(1), &[3.0]);
        match layer.renderer().unwrap() {
            RendererSpec::Paletted { classes, .. } => assert_eq!(classes.len(), 3),
            other => panic!("unexpected renderer {:?}", other),
        }
    }

    #[test]
    fn shared_labels_share_the_first_occurrence_color() {
        let mut layer = InMemoryRaster::new("/data/veg.img").with_band(&[0.0, 2.0, 4.0]);
        let mut rat = thematic_rat();
        rat.set_value(2, "Class", crate::model::CellValue::Text("zero".into()))
            .unwrap();
        let unique = classify(&mut layer, 1, &rat, "Class", None).unwrap();

        // Rows 1 and 3 collapse onto one label.
        assert_eq!(unique, vec![1, 2]);
        match layer.renderer().unwrap() {
            RendererSpec::Paletted { classes, .. } => {
                assert_eq!(classes[0].color, classes[2].color);
                assert_eq!(classes[0].color, Color::rgb(10, 11, 12));
            }
            other => panic!("unexpected renderer {:?}", other),
        }
    }

    #[test]
    fn athematic_classification_installs_discrete_shader() {
        let mut layer = InMemoryRaster::new("/data/dem.tif");
        let rat = athematic_rat();
        let unique = classify(&mut layer, 1, &rat, "Class", None).unwrap();

        assert_eq!(unique, vec![1, 3]);
        match layer.renderer().unwrap() {
            RendererSpec::PseudoColor {
                band,
                min,
                max,
                items,
            } => {
                assert_eq!(*band, 1);
                assert_eq!(*min, 0.0);
                assert_eq!(*max, 30.0);
                assert_eq!(items.len(), 3);
                assert_eq!(items[0].value, 10.0);
                assert_eq!(items[0].label, "zero2");
                // The duplicate label reuses the first range's color.
                assert_eq!(items[0].color, items[1].color);
            }
            other => panic!("unexpected renderer {:?}", other),
        }
    }

    #[test]
    fn classifying_by_a_missing_column_fails() {
        let mut layer = InMemoryRaster::new("/data/veg.img").with_band(&[0.0]);
        let rat = thematic_rat();
        assert!(matches!(
            classify(&mut layer, 1, &rat, "Ghost", None),
            Err(RatError::Validation(_))
        ));
    }

    #[test]
    fn classifying_an_invalid_table_fails() {
        let mut layer = InMemoryRaster::new("/data/veg.img").with_band(&[0.0]);
        let rat = Rat::empty("/data/veg.img.aux.xml", false);
        assert!(matches!(
            classify(&mut layer, 1, &rat, "Class", None),
            Err(RatError::Validation(_))
        ));
    }

    #[test]
    fn legend_dedup_reorders_and_labels_the_header() {
        let mut legend = InMemoryLegend::new(&["header", "zero", "one", "two", "dup"]);
        deduplicate_legend_entries(&mut legend, "Class", &[1, 2, 3]);

        assert_eq!(legend.order(), &[0, 1, 2, 3]);
        assert_eq!(legend.labels()[0], "Class");
    }
}
