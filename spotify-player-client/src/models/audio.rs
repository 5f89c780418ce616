use serde::{Deserialize, Serialize};

use super::Id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: Id,
    pub danceability: f32,
    pub energy: f32,
    /// Pitch class, -1 when no key was detected.
    pub key: i8,
    pub loudness: f32,
    pub mode: u8,
    pub speechiness: f32,
    pub acousticness: f32,
    pub instrumentalness: f32,
    pub liveness: f32,
    pub valence: f32,
    pub tempo: f32,
    pub duration_ms: u64,
    pub time_signature: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AudioFeaturesList {
    pub audio_features: Vec<Option<AudioFeatures>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Seconds.
    pub duration: f64,
    pub tempo: f32,
    pub key: i8,
    pub mode: i8,
    pub time_signature: u8,
    pub loudness: f32,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: f64,
    pub duration: f64,
    pub confidence: f32,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub start: f64,
    pub duration: f64,
    pub confidence: f32,
    pub loudness: f32,
    pub tempo: f32,
    pub key: i8,
    pub mode: i8,
    pub time_signature: u8,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAnalysis {
    pub track: AnalysisSummary,
    #[serde(default)]
    pub bars: Vec<TimeInterval>,
    #[serde(default)]
    pub beats: Vec<TimeInterval>,
    #[serde(default)]
    pub tatums: Vec<TimeInterval>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_decode_as_none() {
        let list: AudioFeaturesList = serde_json::from_str(
            r#"{"audio_features": [null, {
                "id": "06AKEBrKUckW0KREUWRnvT", "danceability": 0.735, "energy": 0.578,
                "key": 5, "loudness": -11.84, "mode": 0, "speechiness": 0.0461,
                "acousticness": 0.514, "instrumentalness": 0.0902, "liveness": 0.159,
                "valence": 0.636, "tempo": 98.002, "duration_ms": 255349, "time_signature": 4
            }]}"#,
        )
        .unwrap();

        assert!(list.audio_features[0].is_none());
        assert_eq!(list.audio_features[1].as_ref().unwrap().duration_ms, 255349);
    }

    #[test]
    fn analysis_tolerates_missing_sequences() {
        let analysis: AudioAnalysis = serde_json::from_str(
            r#"{"track": {"duration": 207.95, "tempo": 118.2, "key": 5, "mode": 1,
                "time_signature": 4, "loudness": -5.8}}"#,
        )
        .unwrap();

        assert!(analysis.bars.is_empty());
        assert_eq!(analysis.track.time_signature, 4);
    }
}
