use core::fmt::Debug;

#[derive(defmt::Format, Debug, Clone)]
pub struct OrientationReading {
    pub timestamp: f64, // ms
    pub roll: f32,      // deg
    pub pitch: f32,     // deg
    pub yaw: f32,       // deg
}

pub trait OrientationSensor {
    type Error: defmt::Format + Debug;

    async fn reset(&mut self) -> Result<(), Self::Error>;
    async fn read(&mut self) -> Result<OrientationReading, Self::Error>;
}
