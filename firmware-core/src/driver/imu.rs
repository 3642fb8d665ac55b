use core::fmt::Debug;

#[derive(defmt::Format, Debug, Clone)]
pub struct ImuReading {
    pub timestamp: f64, // ms
    pub acc: [f32; 3],  // m/s^2
    pub gyro: [f32; 3], // deg/s
}

pub trait Imu {
    type Error: defmt::Format + Debug;

    async fn reset(&mut self) -> Result<(), Self::Error>;
    async fn read(&mut self) -> Result<ImuReading, Self::Error>;
}
