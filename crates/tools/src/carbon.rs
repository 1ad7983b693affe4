//! Carbon Footprint Tool
//!
//! Closed-form conversion from energy to grams of CO2e using a regional
//! grid-intensity table. Unknown or missing regions fall back to the
//! `default` coefficient.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Joules in one kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3_600_000.0;

/// Region used when the caller gives none or an unknown one.
pub const DEFAULT_REGION: &str = "default";

/// Grid carbon intensity by region (gCO2/kWh).
pub const CARBON_INTENSITY: &[(&str, f64)] = &[
    ("us-west", 350.0),
    ("us-east", 400.0),
    ("eu-west", 300.0),
    ("eu-north", 20.0),
    ("asia-east", 550.0),
    (DEFAULT_REGION, 400.0),
];

/// Errors from the carbon tool
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CarbonError {
    #[error("either energy_joules or energy_kwh is required")]
    MissingEnergy,

    #[error("energy must be a finite, non-negative number, got {0}")]
    InvalidEnergy(f64),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Intensity lookup result.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionIntensity {
    /// Normalized region key actually used
    pub region: String,
    pub grams_per_kwh: f64,
    pub used_default: bool,
}

/// Look up a region's intensity, lowercasing the key.
pub fn carbon_intensity(region: Option<&str>) -> RegionIntensity {
    let key = region
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty());

    let found = key.as_deref().and_then(|k| {
        CARBON_INTENSITY
            .iter()
            .find(|(name, _)| *name == k)
            .map(|(name, g)| (*name, *g))
    });

    match found {
        Some((name, grams)) => RegionIntensity {
            region: name.to_string(),
            grams_per_kwh: grams,
            used_default: name == DEFAULT_REGION,
        },
        None => RegionIntensity {
            region: DEFAULT_REGION.to_string(),
            grams_per_kwh: default_intensity(),
            used_default: true,
        },
    }
}

fn default_intensity() -> f64 {
    CARBON_INTENSITY
        .iter()
        .find(|(name, _)| *name == DEFAULT_REGION)
        .map(|(_, g)| *g)
        .unwrap_or(400.0)
}

/// Arguments accepted by `carbon_footprint`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CarbonFootprintArgs {
    #[serde(default)]
    pub energy_joules: Option<f64>,
    #[serde(default)]
    pub energy_kwh: Option<f64>,
    #[serde(default)]
    pub region: Option<String>,
}

impl CarbonFootprintArgs {
    /// Parse from a model-supplied argument object.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CarbonError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|e| CarbonError::InvalidArguments(e.to_string()))
    }
}

/// Output of `carbon_footprint`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonFootprint {
    pub energy_kwh: f64,
    pub region: String,
    pub carbon_intensity_g_per_kwh: f64,
    pub carbon_grams: f64,
    pub used_default_region: bool,
}

/// Convert energy to carbon. `energy_joules` wins when both units are given.
pub fn carbon_footprint(args: &CarbonFootprintArgs) -> Result<CarbonFootprint, CarbonError> {
    let energy_kwh = match (args.energy_joules, args.energy_kwh) {
        (Some(joules), _) => {
            check_energy(joules)?;
            joules / JOULES_PER_KWH
        }
        (None, Some(kwh)) => {
            check_energy(kwh)?;
            kwh
        }
        (None, None) => return Err(CarbonError::MissingEnergy),
    };

    let intensity = carbon_intensity(args.region.as_deref());

    Ok(CarbonFootprint {
        energy_kwh,
        carbon_grams: energy_kwh * intensity.grams_per_kwh,
        carbon_intensity_g_per_kwh: intensity.grams_per_kwh,
        region: intensity.region,
        used_default_region: intensity.used_default,
    })
}

fn check_energy(value: f64) -> Result<(), CarbonError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CarbonError::InvalidEnergy(value))
    }
}
