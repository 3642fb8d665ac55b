use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use rkyv::ser::serializers::BufferSerializer;
use rkyv::ser::Serializer;
use rkyv::{Archive, Deserialize, Serialize};

use crate::avionics::estimate_history::EstimateSample;
use crate::common::task_timer::TaskTimer;
use crate::driver::log_storage::LogStorage;
use crate::Clock;

pub const ESTIMATE_RECORD: u8 = 0;
pub const PHASE_CHANGE_RECORD: u8 = 1;

#[derive(defmt::Format, Debug, Clone, Archive, Deserialize, Serialize)]
pub struct PhaseChangeRecord {
    pub timestamp: f64,
    pub phase: u8,
}

#[derive(defmt::Format, Debug, Clone)]
pub enum LogRecord {
    Estimate(EstimateSample),
    PhaseChange(PhaseChangeRecord),
}

/// Bounded fifo between the flight tasks and stable storage. Producers never
/// block; the drain task empties the fifo once per storage tick.
pub struct FlightLogger<const CAP: usize> {
    channel: Channel<NoopRawMutex, LogRecord, CAP>,
}

impl<const CAP: usize> FlightLogger<CAP> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    pub fn log(&self, record: LogRecord) {
        if self.channel.try_send(record).is_err() {
            log_warn!("flight log fifo full, record dropped");
        }
    }

    pub async fn run(
        &self,
        mut storage: impl LogStorage,
        clock: impl Clock,
        delay: impl DelayNs,
        period_ms: f64,
    ) -> ! {
        let mut timer = TaskTimer::new(clock, delay, period_ms);
        loop {
            while let Ok(record) = self.channel.try_receive() {
                let result = match &record {
                    LogRecord::Estimate(sample) => {
                        write_record(&mut storage, ESTIMATE_RECORD, sample).await
                    }
                    LogRecord::PhaseChange(change) => {
                        write_record(&mut storage, PHASE_CHANGE_RECORD, change).await
                    }
                };
                if result.is_err() {
                    log_warn!("flight log write failed, record dropped");
                }
            }
            timer.tick().await;
        }
    }
}

/// One tag byte followed by the archived record.
async fn write_record<S, T>(storage: &mut S, tag: u8, value: &T) -> Result<(), S::Error>
where
    S: LogStorage,
    T: Archive + rkyv::Serialize<BufferSerializer<[u8; 64]>>,
{
    let mut serializer = BufferSerializer::new([0u8; 64]);
    serializer.serialize_value(value).unwrap();
    let buffer = serializer.into_inner();

    let mut frame = Vec::<u8, 65>::new();
    frame.push(tag).unwrap();
    frame
        .extend_from_slice(&buffer[..core::mem::size_of::<T::Archived>()])
        .unwrap();
    storage.write_frame(&frame).await
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fifo_drops_when_full_without_blocking() {
        let logger = FlightLogger::<2>::new();
        for i in 0..4 {
            logger.log(LogRecord::PhaseChange(PhaseChangeRecord {
                timestamp: i as f64,
                phase: 1,
            }));
        }
        // the first two records survive, the rest were dropped
        assert!(logger.channel.try_receive().is_ok());
        assert!(logger.channel.try_receive().is_ok());
        assert!(logger.channel.try_receive().is_err());
    }
}
