use core::fmt::Debug;

/// Aerodynamic drag flap actuator. Extension is normalized to [0, 1].
pub trait FlapServo {
    type Error: defmt::Format + Debug;

    async fn reset(&mut self) -> Result<(), Self::Error>;
    async fn set_extension(&mut self, extension: f32) -> Result<(), Self::Error>;
}

pub struct DummyFlapServo;

impl FlapServo for DummyFlapServo {
    type Error = ();

    async fn reset(&mut self) -> Result<(), ()> {
        Ok(())
    }

    async fn set_extension(&mut self, _extension: f32) -> Result<(), ()> {
        Ok(())
    }
}
