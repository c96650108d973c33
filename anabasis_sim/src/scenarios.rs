//! Playback scenarios for deterministic simulation runs.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// PB-001: One timed segment from start to arrival
    SingleSegment,

    /// PB-002: Waypoints with no joining segment
    Teleport,

    /// PB-003: Territory snapshot fallback while stepping
    TerritoryFallback,

    /// PB-004: Autoplay the demo campaign end to end
    FullCampaign,

    /// PB-005: Switch tracks mid-traversal
    TrackSwitch,

    /// PB-006: Change playback speed mid-traversal
    SpeedChange,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SingleSegment,
            ScenarioId::Teleport,
            ScenarioId::TerritoryFallback,
            ScenarioId::FullCampaign,
            ScenarioId::TrackSwitch,
            ScenarioId::SpeedChange,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SingleSegment => "single_segment",
            ScenarioId::Teleport => "teleport",
            ScenarioId::TerritoryFallback => "territory_fallback",
            ScenarioId::FullCampaign => "full_campaign",
            ScenarioId::TrackSwitch => "track_switch",
            ScenarioId::SpeedChange => "speed_change",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SingleSegment => "1.2 km horse segment, arrival time matches mode speed",
            ScenarioId::Teleport => "No segment between waypoints, marker jumps in one frame",
            ScenarioId::TerritoryFallback => "Territory falls back to the last snapshot",
            ScenarioId::FullCampaign => "Autoplay the demo campaign to its last waypoint",
            ScenarioId::TrackSwitch => "Switch tracks mid-segment, stale frame is discarded",
            ScenarioId::SpeedChange => "Double speed halfway, arrival time follows",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_segment" | "singlesegment" | "pb-001" => Ok(ScenarioId::SingleSegment),
            "teleport" | "pb-002" => Ok(ScenarioId::Teleport),
            "territory_fallback" | "territoryfallback" | "pb-003" => {
                Ok(ScenarioId::TerritoryFallback)
            }
            "full_campaign" | "fullcampaign" | "pb-004" => Ok(ScenarioId::FullCampaign),
            "track_switch" | "trackswitch" | "pb-005" => Ok(ScenarioId::TrackSwitch),
            "speed_change" | "speedchange" | "pb-006" => Ok(ScenarioId::SpeedChange),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
