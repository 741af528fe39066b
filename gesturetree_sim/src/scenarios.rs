//! Named end-to-end scenarios for the simulation harness.

use serde::{Deserialize, Serialize};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// GT-001: Five open-palm frames scatter a formed tree on the 3rd frame
    PalmScatter,

    /// GT-002: A stable pinch opens the lightbox with a fade-in
    PinchOpen,

    /// GT-003: Releasing the pinch closes the lightbox after the close delay
    PinchRelease,

    /// GT-004: Forming the tree fires exactly one transition burst
    FormationBurst,

    /// GT-005: Single-frame label flicker never toggles the scene
    FlickerRejection,

    /// GT-006: Pinch distance oscillating inside the band never flips the pinch
    HysteresisBand,

    /// GT-007: Repeated opens avoid recently viewed photos
    AntiRepeat,

    /// GT-008: Classifier failures degrade to "no hand" with deduplicated status
    ClassifierOutage,

    /// GT-009: Ambient fireworks run only while the lightbox is open
    AmbientFireworks,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::PalmScatter,
            ScenarioId::PinchOpen,
            ScenarioId::PinchRelease,
            ScenarioId::FormationBurst,
            ScenarioId::FlickerRejection,
            ScenarioId::HysteresisBand,
            ScenarioId::AntiRepeat,
            ScenarioId::ClassifierOutage,
            ScenarioId::AmbientFireworks,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::PalmScatter => "palm_scatter",
            ScenarioId::PinchOpen => "pinch_open",
            ScenarioId::PinchRelease => "pinch_release",
            ScenarioId::FormationBurst => "formation_burst",
            ScenarioId::FlickerRejection => "flicker_rejection",
            ScenarioId::HysteresisBand => "hysteresis_band",
            ScenarioId::AntiRepeat => "anti_repeat",
            ScenarioId::ClassifierOutage => "classifier_outage",
            ScenarioId::AmbientFireworks => "ambient_fireworks",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::PalmScatter => "Formed tree, 5 Open_Palm frames @0.9: CHAOS on the 3rd and stays",
            ScenarioId::PinchOpen => "Formed tree, pinch 0.05 in band: OPENING at opacity 0, then 1",
            ScenarioId::PinchRelease => "Open lightbox, pinch jumps to 0.12: CLOSING then CLOSED after 400ms",
            ScenarioId::FormationBurst => "CHAOS -> FORMED: one transition batch that self-evicts",
            ScenarioId::FlickerRejection => "Closed_Fist stream with single Open_Palm frames: no toggle",
            ScenarioId::HysteresisBand => "Pinch distance jittering between thresholds: no flips",
            ScenarioId::AntiRepeat => "Open/close cycles: fresh candidates always beat recent photos",
            ScenarioId::ClassifierOutage => "Recurring classifier errors: status once per message, lightbox closes",
            ScenarioId::AmbientFireworks => "Held lightbox: ambient batches on interval, capped, stop on close",
        }
    }

    /// Returns the GT-xxx code.
    pub fn code(&self) -> &'static str {
        match self {
            ScenarioId::PalmScatter => "GT-001",
            ScenarioId::PinchOpen => "GT-002",
            ScenarioId::PinchRelease => "GT-003",
            ScenarioId::FormationBurst => "GT-004",
            ScenarioId::FlickerRejection => "GT-005",
            ScenarioId::HysteresisBand => "GT-006",
            ScenarioId::AntiRepeat => "GT-007",
            ScenarioId::ClassifierOutage => "GT-008",
            ScenarioId::AmbientFireworks => "GT-009",
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
        let key = s.to_lowercase();
        ScenarioId::all()
            .into_iter()
            .find(|id| {
                key == id.name() || key == id.name().replace('_', "") || key == id.code().to_lowercase()
            })
            .ok_or_else(|| format!("Unknown scenario: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
            assert_eq!(id.code().parse::<ScenarioId>(), Ok(id));
        }
    }

    #[test]
    fn test_aliases_and_unknown() {
        assert_eq!("PinchOpen".parse::<ScenarioId>(), Ok(ScenarioId::PinchOpen));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
