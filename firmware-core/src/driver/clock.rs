/// Milliseconds since boot. Monotonic, never adjusted in flight.
pub trait Clock: Copy {
    fn now_ms(&self) -> f64;
}
