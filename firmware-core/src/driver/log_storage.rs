use core::fmt::Debug;

/// Record-oriented sink backing the storage task, e.g. an SD card or a raw
/// flash region behind a filesystem. Frames are opaque serialized records.
pub trait LogStorage {
    type Error: defmt::Format + Debug;

    async fn reset(&mut self) -> Result<(), Self::Error>;
    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

pub struct DummyLogStorage;

impl LogStorage for DummyLogStorage {
    type Error = ();

    async fn reset(&mut self) -> Result<(), ()> {
        Ok(())
    }

    async fn write_frame(&mut self, _frame: &[u8]) -> Result<(), ()> {
        Ok(())
    }
}
