use super::flight_fsm::FlightPhase;

#[derive(defmt::Format, Debug, Clone)]
pub struct FlapConfig {
    pub target_apogee: f32,
    /// Extension fraction commanded per meter of predicted overshoot.
    pub gain: f32,
}

impl Default for FlapConfig {
    fn default() -> Self {
        Self {
            target_apogee: 3048.0,
            gain: 0.01,
        }
    }
}

/// Drag flap command policy. The flaps only ever act during the GNC coast
/// window; everywhere else the command is neutral so the airframe stays
/// clean through boost and recovery.
pub struct DragFlapController {
    config: FlapConfig,
}

impl DragFlapController {
    pub fn new(config: FlapConfig) -> Self {
        Self { config }
    }

    pub fn extension(&self, phase: FlightPhase, apogee_prediction: f32) -> f32 {
        if phase != FlightPhase::CoastGnc {
            return 0.0;
        }
        let overshoot = apogee_prediction - self.config.target_apogee;
        (overshoot * self.config.gain).clamp(0.0, 1.0)
    }
}
