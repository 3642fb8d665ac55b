use core::fmt::Debug;

#[derive(defmt::Format, Debug, Clone)]
pub struct MagReading {
    pub timestamp: f64, // ms
    pub mag: [f32; 3],  // gauss
}

pub trait Magnetometer {
    type Error: defmt::Format + Debug;

    async fn reset(&mut self) -> Result<(), Self::Error>;
    async fn read(&mut self) -> Result<MagReading, Self::Error>;
}
