use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::NoopRawMutex, Mutex as BlockingMutex};

/// Last successful reading of one sensor, one writer, many readers.
///
/// There is no staleness tracking: a consumer that runs faster than the
/// sampling task simply sees the same reading again.
pub struct SensorCache<T: Clone> {
    slot: BlockingMutex<NoopRawMutex, RefCell<Option<T>>>,
}

impl<T: Clone> SensorCache<T> {
    pub const fn new() -> Self {
        Self {
            slot: BlockingMutex::new(RefCell::new(None)),
        }
    }

    pub fn update(&self, reading: T) {
        self.slot.lock(|slot| {
            slot.borrow_mut().replace(reading);
        });
    }

    pub fn get(&self) -> Option<T> {
        self.slot.lock(|slot| slot.borrow().clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_last_reading() {
        let cache = SensorCache::<u32>::new();
        assert_eq!(cache.get(), None);

        cache.update(1);
        cache.update(2);
        assert_eq!(cache.get(), Some(2));
        // reads do not consume
        assert_eq!(cache.get(), Some(2));
    }
}
