use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{ClassData, ColorRamp, LegendView, RasterLayer, RendererSpec};

/// In-memory raster collaborator for tests and embedding hosts.
/// Holds per-band unique values and no-data sets; does NOT read pixels.
#[derive(Debug, Default)]
pub struct InMemoryRaster {
    path: PathBuf,
    bands: Vec<BandData>,
    renderer: Option<RendererSpec>,
    repaints: usize,
}

#[derive(Debug, Default, Clone)]
struct BandData {
    unique_values: Vec<f64>,
    nodata: Vec<f64>,
}

impl InMemoryRaster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Add a band whose unique-value scan yields `values`.
    pub fn with_band(mut self, values: &[f64]) -> Self {
        self.bands.push(BandData {
            unique_values: values.to_vec(),
            nodata: Vec::new(),
        });
        self
    }

    pub fn nodata(&self, band: usize) -> &[f64] {
        self.bands
            .get(band - 1)
            .map(|b| b.nodata.as_slice())
            .unwrap_or(&[])
    }

    pub fn repaints(&self) -> usize {
        self.repaints
    }
}

impl RasterLayer for InMemoryRaster {
    fn source(&self) -> &Path {
        &self.path
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn class_data(&mut self, band: usize, ramp: &dyn ColorRamp) -> Result<Vec<ClassData>> {
        let data = match self.bands.get(band - 1) {
            Some(b) => b.clone(),
            None => return Ok(Vec::new()),
        };
        let n = data.unique_values.len().max(1);
        Ok(data
            .unique_values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let fraction = i as f64 / (n.max(2) - 1) as f64;
                ClassData::new(*v, format!("{}", v), ramp.color(fraction))
            })
            .collect())
    }

    fn register_nodata(&mut self, band: usize, value: f64) -> Result<()> {
        if let Some(b) = self.bands.get_mut(band - 1) {
            if !b.nodata.contains(&value) {
                b.nodata.push(value);
            }
        }
        Ok(())
    }

    fn set_renderer(&mut self, renderer: RendererSpec) {
        self.renderer = Some(renderer);
    }

    fn renderer(&self) -> Option<&RendererSpec> {
        self.renderer.as_ref()
    }

    fn trigger_repaint(&mut self) {
        self.repaints += 1;
    }
}

/// In-memory legend-node list: rows of `(source index, label)`.
#[derive(Debug, Default)]
pub struct InMemoryLegend {
    rows: Vec<(usize, String)>,
}

impl InMemoryLegend {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            rows: labels
                .iter()
                .enumerate()
                .map(|(i, l)| (i, l.to_string()))
                .collect(),
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|(_, l)| l.as_str()).collect()
    }

    pub fn order(&self) -> Vec<usize> {
        self.rows.iter().map(|(i, _)| *i).collect()
    }
}

impl LegendView for InMemoryLegend {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn set_row_order(&mut self, order: &[usize]) {
        let old = std::mem::take(&mut self.rows);
        for &src in order {
            if let Some(row) = old.iter().find(|(i, _)| *i == src) {
                self.rows.push(row.clone());
            }
        }
    }

    fn set_row_label(&mut self, row: usize, label: &str) {
        if let Some(entry) = self.rows.iter_mut().find(|(i, _)| *i == row) {
            entry.1 = label.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RandomColorRamp;

    #[test]
    fn class_data_labels_carry_the_value() {
        let mut raster = InMemoryRaster::new("test.tif").with_band(&[0.0, 2.0, 4.0]);
        let classes = raster.class_data(1, &RandomColorRamp::new()).unwrap();
        assert_eq!(classes.len(), 3);
        assert_eq!(classes[1].label, "2");
    }

    #[test]
    fn nodata_registration_deduplicates() {
        let mut raster = InMemoryRaster::new("test.tif").with_band(&[1.0]);
        raster.register_nodata(1, 9.0).unwrap();
        raster.register_nodata(1, 9.0).unwrap();
        assert_eq!(raster.nodata(1), &[9.0]);
    }

    #[test]
    fn legend_reorder_keeps_labels_with_rows() {
        let mut legend = InMemoryLegend::new(&["h", "a", "b", "c"]);
        legend.set_row_order(&[0, 2]);
        assert_eq!(legend.labels(), vec!["h", "b"]);
        legend.set_row_label(0, "Class");
        assert_eq!(legend.labels(), vec!["Class", "b"]);
    }
}
