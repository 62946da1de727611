use chrono::Utc;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

use crate::noise::{NoiseSource, RandomNoise};

pub const DEFAULT_CONTEXT: &str = "geospatial";

const GEOSPATIAL: &[&str] = &[
    "I suggest a coordinate transformation for your mapping project.",
    "I can optimise your geodetic parameters.",
    "Shall we run a topographic analysis for this area?",
    "Coordinate prediction can fill in your missing data.",
    "As Aries AI I can help with surveying engineering problems.",
];

const CADASTRAL: &[&str] = &[
    "I can analyse your cadastral data.",
    "I can help optimise your parcel layout.",
    "I can analyse data for boundary disputes.",
    "I can support land registry and cadastre data integration.",
];

const GENERAL: &[&str] = &[
    "As Aries AI I can help with surveying engineering.",
    "I can answer questions about coordinate systems.",
    "I'm here for geodetic calculations!",
    "I'm with you on mapping and cadastre engineering problems.",
];

#[derive(Serialize, Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub context: String,
    pub confidence: f64,
    pub ai_engine: String,
    pub suggestions: Vec<String>,
    pub timestamp: String,
}

/// Canned engineering chat. Available whether or not the engine is loaded.
pub struct ChatResponder {
    noise: Mutex<Box<dyn NoiseSource>>,
}

impl Default for ChatResponder {
    fn default() -> Self {
        Self::with_noise(Box::new(RandomNoise::from_entropy()))
    }
}

impl ChatResponder {
    pub fn with_noise(noise: Box<dyn NoiseSource>) -> Self {
        Self {
            noise: Mutex::new(noise),
        }
    }

    fn sample(&self) -> f64 {
        self.noise
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample()
    }

    pub fn replies_for(context: &str) -> &'static [&'static str] {
        match context {
            "geospatial" => GEOSPATIAL,
            "cadastral" => CADASTRAL,
            _ => GENERAL,
        }
    }

    pub fn reply(&self, message: &str, context: &str, engine_active: bool) -> ChatReply {
        log::debug!("chat message in {context}: {message:?}");
        let pool = Self::replies_for(context);
        let idx = ((self.sample() * pool.len() as f64) as usize).min(pool.len() - 1);

        ChatReply {
            response: pool[idx].to_string(),
            context: context.to_string(),
            confidence: 0.85 + self.sample() * 0.1,
            ai_engine: if engine_active {
                "Aries AI Active".to_string()
            } else {
                "Basic Chat".to_string()
            },
            suggestions: vec![
                "Predict coordinates".to_string(),
                "Optimise parameters".to_string(),
                "Run topographic analysis".to_string(),
                "Transform map coordinates".to_string(),
            ],
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::ConstantNoise;

    #[test]
    fn test_unknown_context_uses_general_pool() {
        let chat = ChatResponder::with_noise(Box::new(ConstantNoise(0.0)));
        let reply = chat.reply("hi", "astrology", false);
        assert_eq!(reply.response, GENERAL[0]);
        assert_eq!(reply.context, "astrology");
        assert_eq!(reply.ai_engine, "Basic Chat");
    }

    #[test]
    fn test_top_of_range_picks_last_reply() {
        let chat = ChatResponder::with_noise(Box::new(ConstantNoise(0.999)));
        let reply = chat.reply("parcel", "cadastral", true);
        assert_eq!(reply.response, CADASTRAL[CADASTRAL.len() - 1]);
        assert!(reply.confidence < 0.95);
        assert_eq!(reply.ai_engine, "Aries AI Active");
    }
}
