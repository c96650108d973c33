//! JSON exporter for playback traces.
//!
//! Exports one record per handled frame so a run can be replayed or plotted
//! outside the simulator.

use anabasis_core::geojson::Position;
use anabasis_core::{FrameOutcome, TransportMode};
use serde::Serialize;
use std::fs::File;
use std::io::Write;

/// A single frame of playback data.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackFrame {
    /// Virtual time in seconds
    pub time_sec: f64,

    /// Current waypoint after the frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoint_id: Option<String>,

    /// Latest marker position, `[lon, lat]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Position>,

    /// Latest marker mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<TransportMode>,

    /// Display badge for `mode`, icon then label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,

    /// Segment being traversed, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,

    /// Meters into `segment_id`
    pub distance_traveled: f64,

    /// What the frame did
    pub outcome: FrameOutcome,
}

/// Complete playback export.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<PlaybackFrame>,

    /// Final results
    pub passed: bool,

    /// Waypoint the run ended on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_waypoint: Option<String>,
}

impl PlaybackExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            final_waypoint: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: PlaybackFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, final_waypoint: Option<String>) {
        self.passed = passed;
        self.final_waypoint = final_waypoint;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_tracks_duration_and_result() {
        let mut export = PlaybackExport::new("teleport", 7);
        export.add_frame(PlaybackFrame {
            time_sec: 0.5,
            waypoint_id: Some("wp-gordium".into()),
            marker: Some([31.99, 37.511]),
            mode: Some(TransportMode::Horse),
            transport: Some("🐎 Mounted".into()),
            segment_id: None,
            distance_traveled: 0.0,
            outcome: FrameOutcome::Teleported {
                waypoint_id: "wp-gordium".into(),
            },
        });
        export.finalize(true, Some("wp-gordium".into()));

        assert_eq!(export.duration_sec, 0.5);
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["frames"][0]["outcome"]["outcome"], "teleported");
        assert_eq!(json["frames"][0]["mode"], "horse");
        assert_eq!(json["frames"][0]["transport"], "🐎 Mounted");
        assert!(json["frames"][0].get("segment_id").is_none());
        assert_eq!(json["final_waypoint"], "wp-gordium");
    }
}
