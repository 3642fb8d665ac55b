use libm::{powf, sqrtf};

const GRAVITY: f32 = 9.80665;

// US standard atmosphere, troposphere layer
const SEA_LEVEL_TEMPERATURE: f32 = 288.15; // K
const SEA_LEVEL_DENSITY: f32 = 1.225; // kg/m^3
const TEMPERATURE_LAPSE_RATE: f32 = 0.0065; // K/m
const AIR_GAS_CONSTANT: f32 = 287.05; // J/(kg K)
const AIR_GAMMA: f32 = 1.4;

fn air_temperature(altitude: f32) -> f32 {
    SEA_LEVEL_TEMPERATURE - TEMPERATURE_LAPSE_RATE * altitude
}

fn air_density(altitude: f32) -> f32 {
    let ratio = air_temperature(altitude) / SEA_LEVEL_TEMPERATURE;
    SEA_LEVEL_DENSITY * powf(ratio, GRAVITY / (AIR_GAS_CONSTANT * TEMPERATURE_LAPSE_RATE) - 1.0)
}

fn speed_of_sound(altitude: f32) -> f32 {
    sqrtf(AIR_GAMMA * AIR_GAS_CONSTANT * air_temperature(altitude))
}

// Drag coefficient spline knots over Mach number, fit on simulated flight
// data for the current airframe.
const CD_SPLINE_MACH: [f32; 30] = [
    0.01, 0.11310345, 0.2162069, 0.31931034, 0.42241379, 0.52551724, 0.62862069, 0.73172414,
    0.83482759, 0.93793103, 1.04103448, 1.14413793, 1.24724138, 1.35034483, 1.45344828,
    1.55655172, 1.65965517, 1.76275862, 1.86586207, 1.96896552, 2.07206897, 2.17517241,
    2.27827586, 2.38137931, 2.48448276, 2.58758621, 2.69068966, 2.7937931, 2.89689655, 3.0,
];

// Four coefficients per interval: two curvature terms and an affine pair.
const CD_SPLINE_COEFFS: [f32; 120] = [
    0.0, 15.0, -1.2, 0.68, 15.0, -3.82, 0.29, 0.52, -3.82, 0.9, -0.09, 0.6, 0.9, 0.23, 0.0, 0.57,
    0.23, -0.02, 0.02, 0.56, -0.02, 2.25, 0.02, 0.56, 2.25, -4.17, 0.25, 0.42, -4.17, 6.55, -0.17,
    0.72, 6.55, 9.35, 0.49, 0.19, 9.35, -13.77, 1.42, -0.66, -13.77, -5.0, 0.04, 0.73, -5.0, 1.16,
    -0.45, 1.28, 1.16, 0.34, -0.34, 1.14, 0.34, 0.48, -0.3, 1.09, 0.48, 0.76, -0.26, 1.03, 0.76,
    0.11, -0.18, 0.91, 0.11, 0.61, -0.17, 0.89, 0.61, 0.46, -0.11, 0.79, 0.46, -0.05, -0.06, 0.71,
    -0.05, 0.95, -0.07, 0.72, 0.95, -0.12, 0.03, 0.53, -0.12, 1.35, 0.02, 0.55, 1.35, -4.08, 0.15,
    0.26, -4.08, 1.06, -0.26, 1.19, 1.06, -0.16, -0.15, 0.94, -0.16, 0.17, -0.17, 0.98, 0.17,
    0.07, -0.15, 0.93, 0.07, 0.14, -0.14, 0.91, 0.14, -0.04, -0.13, 0.87, -0.04, 0.0, -0.13, 0.88,
];

/// Cubic-spline drag coefficient lookup, clamped to the fitted Mach range.
fn drag_coefficient(mach: f32) -> f32 {
    let last = CD_SPLINE_MACH.len() - 1;
    let m = mach.clamp(CD_SPLINE_MACH[0], CD_SPLINE_MACH[last]);

    let mut i = 0;
    while i < last - 1 && m > CD_SPLINE_MACH[i + 1] {
        i += 1;
    }

    let x0 = CD_SPLINE_MACH[i];
    let x1 = CD_SPLINE_MACH[i + 1];
    let c = &CD_SPLINE_COEFFS[4 * i..4 * i + 4];
    let d0 = m - x1;
    let d1 = m - x0;
    c[0] / (6.0 * (x0 - x1)) * d0 * d0 * d0 + c[1] / (6.0 * (x1 - x0)) * d1 * d1 * d1
        + c[2] * m
        + c[3]
}

#[derive(defmt::Format, Debug, Clone)]
pub struct ApogeeConfig {
    pub dry_mass_kg: f32,
    pub reference_area_m2: f32,
    /// Integration step, seconds.
    pub step_s: f32,
}

impl Default for ApogeeConfig {
    fn default() -> Self {
        Self {
            dry_mass_kg: 21.3,
            reference_area_m2: 0.00811,
            step_s: 0.05,
        }
    }
}

/// RK4 integration of the 1-D coast under gravity and aerodynamic drag,
/// run forward until the vertical velocity crosses zero.
pub struct ApogeePredictor {
    config: ApogeeConfig,
}

impl ApogeePredictor {
    // bounds the integration at roughly 100 simulated seconds
    const MAX_STEPS: u32 = 2000;

    pub fn new(config: ApogeeConfig) -> Self {
        Self { config }
    }

    /// State is [altitude, vertical velocity]; only valid while ascending.
    fn derivative(&self, state: [f32; 2]) -> [f32; 2] {
        let [altitude, velocity] = state;
        let density = air_density(altitude);
        let mach = velocity / speed_of_sound(altitude);
        let drag = 0.5 * density * velocity * velocity * drag_coefficient(mach)
            * self.config.reference_area_m2
            / self.config.dry_mass_kg;
        [velocity, -GRAVITY - drag]
    }

    fn rk4_step(&self, state: [f32; 2], dt: f32) -> [f32; 2] {
        let k1 = self.derivative(state);
        let k2 = self.derivative([state[0] + k1[0] * dt / 2.0, state[1] + k1[1] * dt / 2.0]);
        let k3 = self.derivative([state[0] + k2[0] * dt / 2.0, state[1] + k2[1] * dt / 2.0]);
        let k4 = self.derivative([state[0] + k3[0] * dt, state[1] + k3[1] * dt]);
        [
            state[0] + dt / 6.0 * (k1[0] + 2.0 * k2[0] + 2.0 * k3[0] + k4[0]),
            state[1] + dt / 6.0 * (k1[1] + 2.0 * k2[1] + 2.0 * k3[1] + k4[1]),
        ]
    }

    /// Predicted apogee altitude for the current estimate.
    pub fn predict_apogee(&self, altitude: f32, vertical_velocity: f32) -> f32 {
        let mut state = [altitude, vertical_velocity];
        let mut steps = 0;
        while state[1] > 0.0 && steps < Self::MAX_STEPS {
            state = self.rk4_step(state, self.config.step_s);
            steps += 1;
        }
        state[0]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn drag_coefficient_is_plausible_across_the_fit_range() {
        for mach in [0.05, 0.3, 0.8, 1.1, 2.0, 2.9] {
            let cd = drag_coefficient(mach);
            assert!(cd > 0.1 && cd < 1.5, "cd({mach}) = {cd}");
        }
        // clamped outside the fitted range
        assert_eq!(drag_coefficient(5.0), drag_coefficient(3.0));
        assert_eq!(drag_coefficient(0.0), drag_coefficient(0.01));
    }

    #[test]
    fn prediction_is_bounded_by_the_vacuum_solution() {
        let predictor = ApogeePredictor::new(ApogeeConfig::default());

        let altitude = 1200.0;
        let velocity = 250.0;
        let predicted = predictor.predict_apogee(altitude, velocity);
        let vacuum = altitude + velocity * velocity / (2.0 * GRAVITY);

        assert!(predicted > altitude);
        assert!(predicted < vacuum, "{predicted} should undershoot {vacuum}");
    }

    #[test]
    fn prediction_grows_with_velocity() {
        let predictor = ApogeePredictor::new(ApogeeConfig::default());

        let slow = predictor.predict_apogee(1000.0, 50.0);
        let fast = predictor.predict_apogee(1000.0, 150.0);
        assert!(fast > slow);
    }

    #[test]
    fn descending_state_predicts_current_altitude() {
        let predictor = ApogeePredictor::new(ApogeeConfig::default());
        assert_eq!(predictor.predict_apogee(800.0, -10.0), 800.0);
        assert_eq!(predictor.predict_apogee(800.0, 0.0), 800.0);
    }
}
