use core::fmt::Debug;

use crate::common::telemetry::{TelemetryPacket, UplinkCommand};

/// Low bandwidth downlink plus ground command polling.
///
/// The wire layout of the packet is the ground station's concern; the core
/// hands over the packet struct and lets the implementation encode it.
pub trait Radio {
    type Error: defmt::Format + Debug;

    async fn reset(&mut self) -> Result<(), Self::Error>;
    async fn send(&mut self, packet: &TelemetryPacket) -> Result<(), Self::Error>;
    async fn poll_command(&mut self) -> Result<Option<UplinkCommand>, Self::Error>;
}

pub struct DummyRadio;

impl Radio for DummyRadio {
    type Error = ();

    async fn reset(&mut self) -> Result<(), ()> {
        Ok(())
    }

    async fn send(&mut self, _packet: &TelemetryPacket) -> Result<(), ()> {
        Ok(())
    }

    async fn poll_command(&mut self) -> Result<Option<UplinkCommand>, ()> {
        Ok(None)
    }
}
