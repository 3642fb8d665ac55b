use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embedded_hal_async::delay::DelayNs;

use crate::driver::buzzer::Buzzer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuzzerTone {
    pub frequency: u32,
    pub duration_ms: u32,
    pub pause_ms: u32,
}

/// Fire-and-forget tone queue so tasks can chirp without owning the buzzer.
pub struct BuzzerQueue {
    channel: Channel<NoopRawMutex, BuzzerTone, 8>,
}

impl BuzzerQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    pub fn publish(&self, frequency: u32, duration_ms: u32, pause_ms: u32) {
        let tone = BuzzerTone {
            frequency,
            duration_ms,
            pause_ms,
        };
        if self.channel.try_send(tone).is_err() {
            log_warn!("buzzer queue full, tone dropped");
        }
    }

    pub async fn run(&self, mut buzzer: impl Buzzer, mut delay: impl DelayNs) -> ! {
        loop {
            let tone = self.channel.receive().await;
            buzzer.play(tone.frequency, tone.duration_ms).await;
            delay.delay_ms(tone.pause_ms).await;
        }
    }
}
