use super::flight_fsm::FlightPhase;

/// Events the core tasks hand to the event consumer, which fans them out to
/// telemetry, storage and the buzzer.
#[derive(defmt::Format, Debug, Clone, PartialEq)]
pub enum FlightEvent {
    PhaseChange { timestamp: f64, phase: FlightPhase },
    AbortCommanded { timestamp: f64 },
}
