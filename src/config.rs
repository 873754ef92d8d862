//! Translator configuration

use crate::consts::{DEFAULT_INTERFACE_ARRAY_FIELD, MAX_CODE_OFFSET};

/// Knobs for one import pass
#[derive(Debug, Clone)]
pub struct Config {
    /// Highest source instruction offset a method may have
    pub max_code_offset: u32,
    /// Record source line numbers against emitted code
    pub emit_line_numbers: bool,
    /// Name of the per-instance interface dispatch array field
    pub interface_array_field: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_code_offset: MAX_CODE_OFFSET,
            emit_line_numbers: true,
            interface_array_field: DEFAULT_INTERFACE_ARRAY_FIELD.to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by `SBIL2TBF_MAX_CODE_OFFSET`, `SBIL2TBF_LINE_NUMBERS`
    /// and `SBIL2TBF_INTERFACE_ARRAY_FIELD`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("SBIL2TBF_MAX_CODE_OFFSET") {
            match value.trim().parse::<u32>() {
                Ok(max) => config.max_code_offset = max.min(MAX_CODE_OFFSET),
                Err(_) => log::warn!("ignoring invalid SBIL2TBF_MAX_CODE_OFFSET '{}'", value),
            }
        }
        if let Ok(value) = std::env::var("SBIL2TBF_LINE_NUMBERS") {
            config.emit_line_numbers = !matches!(value.trim(), "0" | "false" | "no" | "off");
        }
        if let Ok(value) = std::env::var("SBIL2TBF_INTERFACE_ARRAY_FIELD") {
            if !value.is_empty() {
                config.interface_array_field = value;
            }
        }
        config
    }
}
