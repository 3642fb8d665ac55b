use nalgebra::{Matrix2, Matrix3, SMatrix, Vector2, Vector3};

use super::estimate_history::EstimateSample;
use super::flight_fsm::FlightPhase;

/// Process noise calibration found on flight data, applied on top of the
/// white-noise jerk model both at initialization and at every step.
const Q_CALIBRATION: f32 = 13.0;

#[derive(defmt::Format, Debug, Clone)]
pub struct KalmanConfig {
    pub spectral_density: f32,
    pub nominal_step_ms: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            spectral_density: Q_CALIBRATION,
            nominal_step_ms: 50.0,
        }
    }
}

/// One fused measurement: barometric altitude plus vertical acceleration
/// already converted to m/s^2.
#[derive(defmt::Format, Debug, Clone)]
pub struct Measurement {
    pub altitude: f32,
    pub vertical_acceleration: f32,
}

/// Converts the high-g accelerometer vertical axis (g) into the filter's
/// acceleration measurement (m/s^2): gravity removal plus the fixed pad
/// calibration offset.
pub fn vertical_acceleration_measurement(az: f32) -> f32 {
    az * 9.81 - 0.981 - 0.51
}

/// Linear Kalman filter over [altitude, vertical velocity, vertical
/// acceleration], fusing barometric altitude and body frame vertical
/// acceleration.
///
/// State transition and process noise are rebuilt from dt every step, never
/// accumulated. The acceleration row of the measurement matrix is dropped
/// once the vehicle passes apogee: after tumble the body frame vertical axis
/// no longer tracks the world vertical.
pub struct KalmanFilter {
    x: Vector3<f32>,
    p: Matrix3<f32>,
    q: Matrix3<f32>,
    f: Matrix3<f32>,
    h: SMatrix<f32, 2, 3>,
    r: Matrix2<f32>,
    k: SMatrix<f32, 3, 2>,
    apogee_prediction: f32,
    spectral_density: f32,
}

impl KalmanFilter {
    /// `initial_altitude` is the averaged pad barometric altitude; velocity
    /// and acceleration start at zero with full confidence (P = 0).
    pub fn new(initial_altitude: f32, config: &KalmanConfig) -> Self {
        let dt = (config.nominal_step_ms / 1000.0) as f32;
        let mut filter = Self {
            x: Vector3::new(initial_altitude, 0.0, 0.0),
            p: Matrix3::zeros(),
            q: Matrix3::zeros(),
            f: Matrix3::zeros(),
            h: SMatrix::<f32, 2, 3>::new(
                1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0,
            ),
            r: Matrix2::new(
                2.0, 0.0, //
                0.0, 0.1,
            ),
            k: SMatrix::zeros(),
            apogee_prediction: 0.0,
            spectral_density: config.spectral_density,
        };
        filter.set_f(dt);
        filter.set_q(dt, Q_CALIBRATION);
        filter
    }

    fn set_f(&mut self, dt: f32) {
        self.f = Matrix3::new(
            1.0, dt, dt * dt / 2.0, //
            0.0, 1.0, dt, //
            0.0, 0.0, 1.0,
        );
    }

    // Continuous-time white-noise jerk model. The 80x cross term between
    // altitude and velocity is flight tuning and must stay bit-for-bit.
    fn set_q(&mut self, dt: f32, scale: f32) {
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;
        let dt5 = dt4 * dt;
        let q01 = dt4 / 8.0 * 80.0;
        self.q = Matrix3::new(
            dt5 / 20.0, q01, dt3 / 6.0, //
            q01, dt3 / 8.0, dt2 / 2.0, //
            dt3 / 6.0, dt2 / 2.0, dt,
        ) * scale;
    }

    /// One priori + posteriori cycle. Inactive until the sequencer has left
    /// the pad phases.
    pub fn step(&mut self, dt_ms: f64, phase: FlightPhase, measurement: &Measurement) {
        if phase <= FlightPhase::Idle {
            return;
        }

        let dt = (dt_ms / 1000.0) as f32;
        self.set_f(dt);
        self.set_q(dt, self.spectral_density);

        let x_priori = self.f * self.x;
        let p_priori = self.f * self.p * self.f.transpose() + self.q;

        if phase >= FlightPhase::Apogee {
            self.h[(1, 2)] = 0.0;
        }

        // 2x2 innovation, nonsingular by construction of R
        let innovation_inverse = (self.h * p_priori * self.h.transpose() + self.r)
            .try_inverse()
            .unwrap();
        self.k = p_priori * self.h.transpose() * innovation_inverse;

        let y = Vector2::new(measurement.altitude, measurement.vertical_acceleration);
        self.x = x_priori + self.k * (y - self.h * x_priori);
        self.p = (Matrix3::identity() - self.k * self.h) * p_priori;
    }

    /// The predicted apogee is produced outside the filter and carried
    /// through into every published sample.
    pub fn update_apogee(&mut self, prediction: f32) {
        self.apogee_prediction = prediction;
    }

    pub fn altitude(&self) -> f32 {
        self.x[0]
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.x[1]
    }

    pub fn vertical_acceleration(&self) -> f32 {
        self.x[2]
    }

    pub fn covariance(&self) -> &Matrix3<f32> {
        &self.p
    }

    /// Snapshot for the latest-estimate slot and the history ring.
    pub fn sample(&self, timestamp: f64) -> EstimateSample {
        EstimateSample {
            timestamp,
            altitude: self.x[0],
            vertical_velocity: self.x[1],
            vertical_acceleration: self.x[2],
            apogee_prediction: self.apogee_prediction,
        }
    }

    /// Published while the filter is gated off on the pad: state untouched,
    /// acceleration passed through from the high-g channel so launch
    /// detection has a live signal to watch.
    pub fn pad_sample(&self, measurement: &Measurement, timestamp: f64) -> EstimateSample {
        EstimateSample {
            timestamp,
            altitude: self.x[0],
            vertical_velocity: self.x[1],
            vertical_acceleration: measurement.vertical_acceleration,
            apogee_prediction: self.apogee_prediction,
        }
    }
}
