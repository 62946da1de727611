use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::noise::{NoiseSource, RandomNoise};

pub const ENGINE_NAME: &str = "Aries AI";
pub const ENGINE_VERSION: &str = "1.0";

/// Used by `predict` when the caller leaves a coordinate out (Ankara).
pub const DEFAULT_LAT: f64 = 39.9334;
pub const DEFAULT_LNG: f64 = 32.8597;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct PartialCoordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub predicted: LatLng,
    pub confidence: f64,
    pub margin_of_error: String,
    pub methodology: String,
    #[serde(rename = "ai_model")]
    pub ai_model: String,
    pub timestamp: String,
    #[serde(rename = "ai_processing")]
    pub ai_processing: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Deflection {
    pub xi: f64,
    pub eta: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlateMotion {
    pub velocity: f64,
    pub direction: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GeodeticParameters {
    pub geoid_undulation: f64,
    pub deflection_of_vertical: Deflection,
    pub atmospheric_refraction: f64,
    pub tidal_corrections: f64,
    pub plate_motion: PlateMotion,
}

impl GeodeticParameters {
    fn base() -> Self {
        GeodeticParameters {
            geoid_undulation: 32.5,
            deflection_of_vertical: Deflection { xi: -2.1, eta: 1.8 },
            atmospheric_refraction: 0.13,
            tidal_corrections: 0.08,
            plate_motion: PlateMotion {
                velocity: 25.4,
                direction: "N45E".to_string(),
            },
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ParameterEstimate {
    pub estimated_parameters: GeodeticParameters,
    pub uncertainty: Value,
    pub correlation_matrix: Value,
    pub quality_metrics: Value,
    pub ai_recommendations: Vec<String>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub scale: f64,
    pub rotation: f64,
}

impl TransformParams {
    pub const IDENTITY: TransformParams = TransformParams {
        scale: 1.0,
        rotation: 0.0,
    };

    /// Static table keyed by the exact `(from, to)` names; unknown pairs,
    /// including differently-cased ones, map to identity.
    pub fn lookup(from: &str, to: &str) -> TransformParams {
        let (scale, rotation) = match (from, to) {
            ("wgs84", "itrf96") => (0.999999, 0.000003),
            ("itrf96", "wgs84") => (1.000001, -0.000003),
            ("ed50", "wgs84") => (1.000002, -0.000005),
            ("wgs84", "ed50") => (0.999998, 0.000005),
            ("utm", "geographic") => (0.9996, 0.0),
            ("geographic", "utm") => (1.0004, 0.0),
            _ => return Self::IDENTITY,
        };
        TransformParams { scale, rotation }
    }

    pub fn apply(&self, coords: LatLng) -> LatLng {
        LatLng {
            lat: coords.lat * self.scale + self.rotation,
            lng: coords.lng * self.scale - self.rotation,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SystemCoords {
    pub coords: LatLng,
    pub system: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct Transformation {
    pub original: SystemCoords,
    pub transformed: SystemCoords,
    pub accuracy: String,
    pub transformation_model: String,
    pub ai_notes: String,
    pub quality_assurance: Value,
}

#[derive(Serialize, Debug, Clone)]
pub struct EngineStatus {
    pub status: String,
    pub engine: String,
    pub version: String,
    pub capabilities: Vec<String>,
    pub performance: String,
    pub dependencies: String,
}

pub const CAPABILITIES: [&str; 5] = [
    "Smart Coordinate Prediction",
    "Geodetic Parameter Estimation",
    "Multi-system Coordinate Transformation",
    "Topographic Analysis",
    "Engineering AI Chat",
];

/// The "Aries AI" toy engine: fixed payloads plus arithmetic noise.
///
/// Besides the noise source, the only state is the construction instant,
/// which seeds the slow sinusoidal drift applied to predictions.
pub struct CoordinateEngine {
    noise: Mutex<Box<dyn NoiseSource>>,
    started: Instant,
}

impl Default for CoordinateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinateEngine {
    pub fn new() -> Self {
        Self::with_noise(Box::new(RandomNoise::from_entropy()))
    }

    pub fn with_noise(noise: Box<dyn NoiseSource>) -> Self {
        log::info!("{ENGINE_NAME} engine initialised");
        Self {
            noise: Mutex::new(noise),
            started: Instant::now(),
        }
    }

    fn sample(&self) -> f64 {
        self.noise
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample()
    }

    fn enhance(&self, value: f64) -> f64 {
        let jitter = (self.sample() - 0.5) * 0.01;
        let elapsed_ms = self.started.elapsed().as_millis() as f64;
        let drift = (elapsed_ms * 0.0001).sin() * 0.001;
        value + jitter + drift
    }

    fn optimize(&self, value: f64) -> f64 {
        value * (0.97 + self.sample() * 0.06)
    }

    pub fn predict(&self, partial: PartialCoordinates) -> Prediction {
        log::debug!("coordinate prediction for {:?}", partial);
        let lat = self.enhance(partial.lat.unwrap_or(DEFAULT_LAT));
        let lng = self.enhance(partial.lng.unwrap_or(DEFAULT_LNG));
        Prediction {
            predicted: LatLng { lat, lng },
            confidence: 0.87 + self.sample() * 0.08,
            margin_of_error: format!("{:.2}m", 1.5 + self.sample() * 3.0),
            methodology: "AI + geodetic data fusion - Aries Engine".to_string(),
            ai_model: "CoordinatePredictor v1.0".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            ai_processing: "Heuristic enhancement applied".to_string(),
        }
    }

    pub fn estimate_parameters(&self, survey: &Value) -> ParameterEstimate {
        log::debug!("parameter estimation for {}", survey);
        let mut params = GeodeticParameters::base();
        params.geoid_undulation = self.optimize(params.geoid_undulation);
        params.atmospheric_refraction = self.optimize(params.atmospheric_refraction);
        params.tidal_corrections = self.optimize(params.tidal_corrections);

        ParameterEstimate {
            estimated_parameters: params,
            uncertainty: json!({
                "geoid_undulation": "±0.05m",
                "deflection_of_vertical": "±0.02\"",
                "atmospheric_refraction": "±0.01",
                "overall_confidence": "95.2%"
            }),
            correlation_matrix: json!({
                "geoid_deflection": 0.78,
                "refraction_tidal": 0.45,
                "plate_geoid": 0.32
            }),
            quality_metrics: json!({
                "rmse": "0.023m",
                "precision": "high",
                "reliability_index": 0.94
            }),
            ai_recommendations: vec![
                "Atmospheric correction applied".to_string(),
                "Geoid model updated".to_string(),
                "Plate motion integrated".to_string(),
            ],
        }
    }

    pub fn transform(&self, coords: LatLng, from: &str, to: &str) -> Transformation {
        let params = TransformParams::lookup(from, to);
        log::debug!("transform {from} -> {to} with {:?}", params);
        Transformation {
            original: SystemCoords {
                coords,
                system: from.to_string(),
            },
            transformed: SystemCoords {
                coords: params.apply(coords),
                system: to.to_string(),
            },
            accuracy: "±0.001°".to_string(),
            transformation_model: "Aries AI Enhanced".to_string(),
            ai_notes: "7-parameter similarity transformation applied".to_string(),
            quality_assurance: json!({
                "residual_error": "0.0002°",
                "confidence_level": "99.8%",
                "algorithm": "AI-Optimized Helmert Transformation"
            }),
        }
    }

    pub fn analyze_terrain(&self, area: &Value) -> Value {
        log::debug!("terrain analysis for {}", area);
        json!({
            "slope_analysis": {
                "average_slope": "15.2°",
                "max_slope": "32.8°",
                "slope_distribution": ["0-10°: 45%", "10-20°: 35%", "20+°: 20%"],
                "ai_calculated": true
            },
            "aspect_map": {
                "predominant_direction": "Northwest",
                "aspect_distribution": {
                    "north": "25%", "south": "20%", "east": "28%", "west": "27%"
                }
            },
            "watersheds": {
                "main_basin": "Marmara Basin",
                "sub_basins": 12,
                "drainage_density": "2.8 km/km²",
                "flow_accumulation": "AI-calculated"
            },
            "geological_risks": {
                "landslide_risk": "Medium",
                "erosion_risk": "High",
                "flood_risk": "Low",
                "seismic_risk": "Medium",
                "risk_assessment": "AI-enhanced analysis"
            },
            "ai_recommendations": [
                "Erosion control measures are recommended",
                "Slope stability should be monitored",
                "Drainage system should be optimised"
            ],
            "analysis_metadata": {
                "resolution": "30m DEM",
                "data_source": "SRTM + AI Enhancement",
                "processing_time": "1.8s",
                "model_version": "TopoAnalyzer v1.2",
                "ai_engine": ENGINE_NAME
            }
        })
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            status: "active".to_string(),
            engine: ENGINE_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            capabilities: CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            performance: "optimized".to_string(),
            dependencies: "none".to_string(),
        }
    }
}

#[test]
fn test_transform_lookup_table() {
    assert_eq!(TransformParams::lookup("wgs84", "ed50").scale, 0.999998);
    assert_eq!(TransformParams::lookup("wgs84", "itrf96").rotation, 0.000003);
    assert_eq!(TransformParams::lookup("WGS84", "ITRF96"), TransformParams::IDENTITY);
    assert_eq!(TransformParams::lookup("mars", "venus"), TransformParams::IDENTITY);
}
