use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::fields::FieldUsage;

const CONFIG_FILENAME: &str = "rat-config.json";

/// One set of sidecar color column names, matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorAlias {
    pub red: String,
    pub green: String,
    pub blue: String,
    pub alpha: String,
}

impl ColorAlias {
    pub fn new(red: &str, green: &str, blue: &str, alpha: &str) -> Self {
        Self {
            red: red.to_string(),
            green: green.to_string(),
            blue: blue.to_string(),
            alpha: alpha.to_string(),
        }
    }
}

/// Host-tunable settings, stored as `rat-config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatConfig {
    /// Recognized names for sidecar color columns, in priority order.
    #[serde(default = "default_color_aliases")]
    pub color_aliases: Vec<ColorAlias>,

    /// Verify the embedded write by re-reading the aux.xml, flushing a
    /// second time only on mismatch. Disabling restores the legacy
    /// unconditional double flush.
    #[serde(default = "default_verify")]
    pub verify_embedded_flush: bool,
}

fn default_color_aliases() -> Vec<ColorAlias> {
    vec![
        ColorAlias::new("R", "G", "B", "A"),
        ColorAlias::new("RED", "GREEN", "BLUE", "ALPHA"),
    ]
}

fn default_verify() -> bool {
    true
}

impl Default for RatConfig {
    fn default() -> Self {
        Self {
            color_aliases: default_color_aliases(),
            verify_embedded_flush: default_verify(),
        }
    }
}

impl RatConfig {
    /// Load config from the given directory, or return defaults if not
    /// found.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path)?;
        let config: RatConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory.
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    /// Color channel role for a sidecar column name, if any alias set
    /// names it.
    pub fn color_usage(&self, column_name: &str) -> Option<FieldUsage> {
        let upper = column_name.to_uppercase();
        for alias in &self.color_aliases {
            if upper == alias.red.to_uppercase() {
                return Some(FieldUsage::Red);
            }
            if upper == alias.green.to_uppercase() {
                return Some(FieldUsage::Green);
            }
            if upper == alias.blue.to_uppercase() {
                return Some(FieldUsage::Blue);
            }
            if upper == alias.alpha.to_uppercase() {
                return Some(FieldUsage::Alpha);
            }
        }
        None
    }
}
