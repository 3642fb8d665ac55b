use core::fmt::Debug;

#[derive(defmt::Format, Debug, Clone)]
pub struct HighGReading {
    pub timestamp: f64,  // ms
    pub acc: [f32; 3],   // g, body frame, index 2 = vertical axis when upright
}

impl HighGReading {
    pub fn az(&self) -> f32 {
        self.acc[2]
    }
}

/// High range accelerometer, the launch / burnout reference sensor.
pub trait HighGAccelerometer {
    type Error: defmt::Format + Debug;

    async fn reset(&mut self) -> Result<(), Self::Error>;
    async fn read(&mut self) -> Result<HighGReading, Self::Error>;
}
