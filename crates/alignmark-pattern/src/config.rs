//! Pattern parameters.
//!
//! Every group mirrors a `{"size": …, "unit": …}` dimension record so a JSON
//! file can override any subset of the defaults. [`MarkConfig::resolve`]
//! turns the whole thing into integer nanometers once, up front.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use alignmark_core::{Coord, Length, Unit};

/// Database unit used for every generated layout, in nanometers.
pub const DBU_NM: f64 = 1.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown substrate preset '{0}'")]
    UnknownSubstrate(String),
}

// ── Substrate presets ────────────────────────────────────────────────

/// A standard wafer size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubstratePreset {
    pub name: &'static str,
    pub diameter_mm: f64,
    pub thickness_um: f64,
}

pub const SUBSTRATE_PRESETS: &[SubstratePreset] = &[
    SubstratePreset { name: "2-inch", diameter_mm: 50.8, thickness_um: 275.0 },
    SubstratePreset { name: "3-inch", diameter_mm: 76.2, thickness_um: 375.0 },
    SubstratePreset { name: "100mm", diameter_mm: 100.0, thickness_um: 525.0 },
    SubstratePreset { name: "125mm", diameter_mm: 125.0, thickness_um: 625.0 },
    SubstratePreset { name: "150mm", diameter_mm: 150.0, thickness_um: 675.0 },
    SubstratePreset { name: "200mm", diameter_mm: 200.0, thickness_um: 725.0 },
    SubstratePreset { name: "300mm", diameter_mm: 300.0, thickness_um: 775.0 },
    SubstratePreset { name: "450mm", diameter_mm: 450.0, thickness_um: 925.0 },
];

impl SubstratePreset {
    /// Look up a preset by name, ignoring case and an optional space (`"3 inch"`, `"100 MM"`).
    pub fn find(name: &str) -> Result<&'static SubstratePreset, ConfigError> {
        let wanted: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase()
            .replace("inch", "-inch")
            .replace("--", "-");
        SUBSTRATE_PRESETS
            .iter()
            .find(|p| p.name == wanted)
            .ok_or_else(|| ConfigError::UnknownSubstrate(name.to_string()))
    }

    pub fn diameter(&self) -> Length {
        Length::new(self.diameter_mm, Unit::Millimeter)
    }
}

/// Side of the largest square inscribed in a circle of `diameter`.
pub fn max_square_size(diameter: Length) -> Length {
    Length::new(diameter.value / std::f64::consts::SQRT_2, diameter.unit)
}

// ── Config groups ────────────────────────────────────────────────────

/// Text height of the position labels plus label typesetting knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub size: f64,
    pub unit: Unit,
    /// Gap between consecutive label glyphs, in nanometers.
    pub glyph_spacing_nm: Coord,
    /// Provenance text height as a multiple of the label size.
    pub provenance_scale: f64,
    /// Provenance lift above its grid row as a multiple of the label size.
    pub provenance_offset_factor: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            size: 5.0,
            unit: Unit::Micrometer,
            glyph_spacing_nm: 350,
            provenance_scale: 400.0,
            provenance_offset_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossConfig {
    /// End-to-end arm length.
    pub size: f64,
    pub line_width: f64,
    pub unit: Unit,
}

impl Default for CrossConfig {
    fn default() -> Self {
        Self {
            size: 15.0,
            line_width: 2.0,
            unit: Unit::Micrometer,
        }
    }
}

impl CrossConfig {
    /// The 10 µm × 2 µm cross of the single-cross example.
    pub fn example() -> Self {
        Self {
            size: 10.0,
            line_width: 2.0,
            unit: Unit::Micrometer,
        }
    }

    pub fn arm_length(&self) -> Length {
        Length::new(self.size, self.unit)
    }

    pub fn arm_width(&self) -> Length {
        Length::new(self.line_width, self.unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayConfig {
    pub spacing: f64,
    pub unit: Unit,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            spacing: 1000.0,
            unit: Unit::Micrometer,
        }
    }
}

/// Plain `{"size", "unit"}` record used for the substrate and the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeConfig {
    pub size: f64,
    pub unit: Unit,
}

impl SizeConfig {
    pub fn length(&self) -> Length {
        Length::new(self.size, self.unit)
    }
}

impl From<Length> for SizeConfig {
    fn from(length: Length) -> Self {
        Self {
            size: length.value,
            unit: length.unit,
        }
    }
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            size: 76.2,
            unit: Unit::Millimeter,
        }
    }
}

/// A GDS (layer, datatype) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdsLayer {
    pub layer: u16,
    pub datatype: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub cross: GdsLayer,
    pub text: GdsLayer,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            cross: GdsLayer { layer: 1, datatype: 0 },
            text: GdsLayer { layer: 2, datatype: 0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Base filename without extension; derived from the substrate when absent.
    pub filename: Option<String>,
    pub overwrite: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            filename: None,
            overwrite: false,
        }
    }
}

// ── Top-level config ─────────────────────────────────────────────────

/// All user-tunable parameters of an alignment-mark array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkConfig {
    pub label: LabelConfig,
    pub cross: CrossConfig,
    pub array: ArrayConfig,
    pub substrate: SizeConfig,
    /// Side of the square area to fill. Defaults to the largest square on the substrate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<SizeConfig>,
    pub author: String,
    pub layers: LayerConfig,
    pub output: OutputConfig,
}

impl Default for MarkConfig {
    fn default() -> Self {
        Self {
            label: LabelConfig::default(),
            cross: CrossConfig::default(),
            array: ArrayConfig::default(),
            substrate: SizeConfig::default(),
            pattern: None,
            author: "William Veith".to_string(),
            layers: LayerConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl MarkConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace the substrate with a standard wafer size.
    pub fn with_substrate_preset(mut self, name: &str) -> Result<Self, ConfigError> {
        let preset = SubstratePreset::find(name)?;
        self.substrate = preset.diameter().into();
        Ok(self)
    }

    /// Pattern size, falling back to the largest square that fits the substrate.
    pub fn pattern_size(&self) -> Length {
        self.pattern
            .map(|p| p.length())
            .unwrap_or_else(|| max_square_size(self.substrate.length()))
    }

    /// `"Created By: <author>"`.
    pub fn provenance_text(&self) -> String {
        format!("Created By: {}", self.author)
    }

    /// Output name without extension, e.g. `76.2mm_wafer_alignmentMarks`.
    ///
    /// Whole sizes keep their decimal point (`100.0mm_…`).
    pub fn base_filename(&self) -> String {
        self.output.filename.clone().unwrap_or_else(|| {
            format!(
                "{:?}{}_wafer_alignmentMarks",
                self.substrate.size, self.substrate.unit
            )
        })
    }

    /// Convert every dimension to integer nanometers and validate it.
    pub fn resolve(&self) -> Result<Dimensions, ConfigError> {
        let label_size = Length::new(self.label.size, self.label.unit).to_dbu(DBU_NM);
        let dims = Dimensions {
            label_size,
            cross_size: self.cross.arm_length().to_dbu(DBU_NM),
            cross_width: self.cross.arm_width().to_dbu(DBU_NM),
            spacing: Length::new(self.array.spacing, self.array.unit).to_dbu(DBU_NM),
            substrate_size: self.substrate.length().to_dbu(DBU_NM),
            pattern_size: self.pattern_size().to_dbu(DBU_NM),
            glyph_spacing: self.label.glyph_spacing_nm,
            provenance_height: (label_size as f64 * self.label.provenance_scale).round() as Coord,
            provenance_offset: (label_size as f64 * self.label.provenance_offset_factor).round()
                as Coord,
        };
        dims.validate()?;
        Ok(dims)
    }
}

/// Resolved pattern dimensions, all in nanometers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub label_size: Coord,
    pub cross_size: Coord,
    pub cross_width: Coord,
    pub spacing: Coord,
    pub substrate_size: Coord,
    pub pattern_size: Coord,
    pub glyph_spacing: Coord,
    pub provenance_height: Coord,
    pub provenance_offset: Coord,
}

impl Dimensions {
    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("label size", self.label_size),
            ("cross size", self.cross_size),
            ("cross line width", self.cross_width),
            ("array spacing", self.spacing),
            ("substrate size", self.substrate_size),
        ];
        for (what, value) in positive {
            if value <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive, got {} nm",
                    what, value
                )));
            }
        }
        if self.pattern_size < 0 || self.glyph_spacing < 0 {
            return Err(ConfigError::Invalid(
                "pattern size and glyph spacing must not be negative".into(),
            ));
        }
        if self.pattern_size > self.substrate_size {
            log::warn!(
                "Pattern ({} nm) is larger than the substrate ({} nm)",
                self.pattern_size,
                self.substrate_size
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_resolve() {
        let dims = MarkConfig::default().resolve().unwrap();
        assert_eq!(dims.label_size, 5_000);
        assert_eq!(dims.cross_size, 15_000);
        assert_eq!(dims.cross_width, 2_000);
        assert_eq!(dims.spacing, 1_000_000);
        assert_eq!(dims.substrate_size, 76_200_000);
        assert_eq!(dims.pattern_size, 53_881_537);
        assert_eq!(dims.glyph_spacing, 350);
        assert_eq!(dims.provenance_height, 2_000_000);
        assert_eq!(dims.provenance_offset, 10_000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MarkConfig::from_json(
            r#"{ "label": { "size": 10, "unit": "UM" }, "array": { "spacing": 2, "unit": "mm" } }"#,
        )
        .unwrap();
        assert_relative_eq!(config.label.size, 10.0);
        assert_eq!(config.label.glyph_spacing_nm, 350);
        assert_eq!(config.array.unit, Unit::Millimeter);
        assert_eq!(config.author, "William Veith");
        assert_eq!(config.resolve().unwrap().spacing, 2_000_000);
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        let err = MarkConfig::from_json(r#"{ "cross": { "size": 15, "line_width": 2, "unit": "furlong" } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("furlong"));
    }

    #[test]
    fn test_explicit_pattern_size() {
        let config = MarkConfig {
            pattern: Some(SizeConfig { size: 4.5, unit: Unit::Millimeter }),
            ..MarkConfig::default()
        };
        assert_eq!(config.resolve().unwrap().pattern_size, 4_500_000);
    }

    #[test]
    fn test_zero_spacing_is_invalid() {
        let mut config = MarkConfig::default();
        config.array.spacing = 0.0;
        assert!(matches!(config.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_base_filename() {
        assert_eq!(
            MarkConfig::default().base_filename(),
            "76.2mm_wafer_alignmentMarks"
        );
        let named = MarkConfig {
            output: OutputConfig {
                filename: Some("run".into()),
                ..OutputConfig::default()
            },
            ..MarkConfig::default()
        };
        assert_eq!(named.base_filename(), "run");
    }

    #[test]
    fn test_substrate_presets() {
        assert_relative_eq!(SubstratePreset::find("3-inch").unwrap().diameter_mm, 76.2);
        assert_relative_eq!(SubstratePreset::find("3 Inch").unwrap().diameter_mm, 76.2);
        assert_relative_eq!(SubstratePreset::find("150MM").unwrap().diameter_mm, 150.0);
        assert!(matches!(
            SubstratePreset::find("7-inch"),
            Err(ConfigError::UnknownSubstrate(_))
        ));

        let config = MarkConfig::default().with_substrate_preset("100mm").unwrap();
        assert_eq!(config.base_filename(), "100.0mm_wafer_alignmentMarks");
        assert_eq!(config.resolve().unwrap().pattern_size, 70_710_678);
    }

    #[test]
    fn test_json_round_trip() {
        let config = MarkConfig::default().with_substrate_preset("2-inch").unwrap();
        let restored = MarkConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marks.json");
        fs::write(&path, r#"{ "author": "Lab A" }"#).unwrap();
        let config = MarkConfig::load(&path).unwrap();
        assert_eq!(config.provenance_text(), "Created By: Lab A");

        let missing = MarkConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
