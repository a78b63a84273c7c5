use serde::Deserialize;

use crate::error::SourceError;

pub const FEET_IN_METER: f64 = 3.28084;
pub const MILES_IN_METER: f64 = 0.000621371;

/// Walk metadata stored as JSON in each photo's EXIF ImageDescription.
///
/// Distances are in metres.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageMeta {
    /// Human-readable location name
    pub loc: String,
    #[serde(default)]
    pub orig: [f64; 2],
    #[serde(default)]
    pub dest: Vec<f64>,
    /// Straight-line distance
    pub crow: f64,
    /// Walking distance
    pub walk: f64,
    /// walk / crow
    pub ratio: f64,
}

impl ImageMeta {
    /// Parse the raw tag value.
    ///
    /// Some writers store the JSON wrapped in one pair of double quotes;
    /// that pair is dropped before parsing.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let raw = raw.trim();
        let json = raw
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(raw);

        serde_json::from_str(json)
            .map_err(|e| SourceError::Metadata(format!("invalid walk metadata: {}", e)))
    }

    /// Post text: location, both distances in imperial units, and the ratio
    pub fn describe(&self) -> String {
        format!(
            "{}\nIt could be: {:.0} feet\nBut it's actually: {:.1} miles\nRatio: {:.2}x\n",
            self.loc,
            self.crow * FEET_IN_METER,
            self.walk * MILES_IN_METER,
            self.ratio
        )
    }
}
