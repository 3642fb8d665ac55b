use heapless::Deque;
use rkyv::{Archive, Deserialize, Serialize};

/// One published output of the state estimator.
#[derive(defmt::Format, Debug, Clone, Archive, Deserialize, Serialize)]
pub struct EstimateSample {
    pub timestamp: f64, // ms since boot
    pub altitude: f32,
    pub vertical_velocity: f32,
    pub vertical_acceleration: f32,
    pub apogee_prediction: f32,
}

/// Ring of the last N estimates, newest at index 0. Pushing overwrites the
/// oldest sample once full; reads never consume. The phase sequencer uses
/// this to look a few samples back in time.
pub struct EstimateHistory<const N: usize> {
    samples: Deque<EstimateSample, N>,
}

impl<const N: usize> EstimateHistory<N> {
    pub const fn new() -> Self {
        Self {
            samples: Deque::new(),
        }
    }

    pub fn push(&mut self, sample: EstimateSample) {
        if self.samples.is_full() {
            self.samples.pop_back();
        }
        self.samples.push_front(sample).ok();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn newest(&self) -> Option<&EstimateSample> {
        self.samples.front()
    }

    /// Arithmetic mean of `field` over the window of `len` samples starting
    /// `start` back from the newest. Fails closed: an empty or out-of-range
    /// window yields 0.
    pub fn mean(
        &self,
        field: impl Fn(&EstimateSample) -> f32,
        start: usize,
        len: usize,
    ) -> f32 {
        if len == 0 || start + len > self.samples.len() {
            return 0.0;
        }
        let mut sum = 0.0f32;
        for sample in self.samples.iter().skip(start).take(len) {
            sum += field(sample);
        }
        sum / len as f32
    }

    /// Mean of the second finite difference of `field` against `time_field`
    /// over the same window, in units of `field` per second squared. Central
    /// differences inside the window, one-sided at the edges; exactly zero
    /// for a sequence affine in time. Fails closed like `mean` (a second
    /// difference needs at least three samples).
    pub fn second_derivative_mean(
        &self,
        field: impl Fn(&EstimateSample) -> f32,
        time_field: impl Fn(&EstimateSample) -> f64,
        start: usize,
        len: usize,
    ) -> f32 {
        if len < 3 || start + len > self.samples.len() {
            return 0.0;
        }

        // reorder oldest to newest so the time axis increases
        let mut times = heapless::Vec::<f64, N>::new();
        let mut values = heapless::Vec::<f32, N>::new();
        for sample in self.samples.iter().skip(start).take(len) {
            times.push(time_field(sample) / 1000.0).ok();
            values.push(field(sample)).ok();
        }
        times.reverse();
        values.reverse();

        let mut sum = 0.0f64;
        for i in 0..len {
            // clamp the stencil so edge points reuse the nearest interior one
            let mid = i.clamp(1, len - 2);
            sum += three_point_second_derivative(&times, &values, mid - 1);
        }
        (sum / len as f64) as f32
    }

    pub fn altitude_average(&self, start: usize, len: usize) -> f32 {
        self.mean(|s| s.altitude, start, len)
    }

    pub fn acceleration_average(&self, start: usize, len: usize) -> f32 {
        self.mean(|s| s.vertical_acceleration, start, len)
    }

    pub fn altitude_second_derivative_average(&self, start: usize, len: usize) -> f32 {
        self.second_derivative_mean(|s| s.altitude, |s| s.timestamp, start, len)
    }
}

/// Second derivative estimate from the three points starting at `i`, valid
/// for non-uniform spacing (twice the second divided difference). Exact for
/// quadratics in time.
fn three_point_second_derivative(times: &[f64], values: &[f32], i: usize) -> f64 {
    let dt01 = times[i + 1] - times[i];
    let dt12 = times[i + 2] - times[i + 1];
    let dt02 = times[i + 2] - times[i];
    let slope01 = (values[i + 1] - values[i]) as f64 / dt01;
    let slope12 = (values[i + 2] - values[i + 1]) as f64 / dt12;
    2.0 * (slope12 - slope01) / dt02
}
