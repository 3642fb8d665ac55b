use rkyv::{Archive, Deserialize, Serialize};

use crate::avionics::estimate_history::EstimateSample;
use crate::avionics::flight_fsm::FlightPhase;

/// Downlink snapshot of the state estimate and the flight phase. The radio
/// driver owns the bit-exact wire layout.
#[derive(defmt::Format, Debug, Clone, Archive, Deserialize, Serialize)]
pub struct TelemetryPacket {
    pub timestamp: f64,
    pub altitude: f32,
    pub vertical_velocity: f32,
    pub vertical_acceleration: f32,
    pub apogee_prediction: f32,
    pub phase: u8,
}

impl TelemetryPacket {
    pub fn new(estimate: &EstimateSample, phase: FlightPhase) -> Self {
        Self {
            timestamp: estimate.timestamp,
            altitude: estimate.altitude,
            vertical_velocity: estimate.vertical_velocity,
            vertical_acceleration: estimate.vertical_acceleration,
            apogee_prediction: estimate.apogee_prediction,
            phase: phase as u8,
        }
    }
}

/// Commands the ground station may uplink between downlink windows.
#[derive(defmt::Format, Debug, Clone, PartialEq, Eq, Archive, Deserialize, Serialize)]
pub enum UplinkCommand {
    Abort,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn packet_carries_phase_index() {
        let estimate = EstimateSample {
            timestamp: 1250.0,
            altitude: 412.5,
            vertical_velocity: 88.0,
            vertical_acceleration: -9.6,
            apogee_prediction: 802.0,
        };
        let packet = TelemetryPacket::new(&estimate, FlightPhase::CoastGnc);

        assert_eq!(packet.phase, FlightPhase::CoastGnc as u8);
        assert_eq!(packet.altitude, 412.5);
        assert_eq!(packet.timestamp, 1250.0);
    }
}
