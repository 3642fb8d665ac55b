use libm::fabsf;

use super::estimate_history::{EstimateHistory, EstimateSample};
use super::thresholds::FsmThresholds;

/// Mission phases in expected order. The `*Detect` variants are hysteresis
/// antechambers: the triggering condition must persist long enough to be
/// believed, otherwise the sequencer falls back to the previous phase.
#[derive(defmt::Format, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum FlightPhase {
    Init = 0,
    Idle,
    LaunchDetect,
    Boost,
    BurnoutDetect,
    CoastPreGnc,
    CoastGnc,
    ApogeeDetect,
    Apogee,
    DrogueDetect,
    Drogue,
    MainDetect,
    Main,
    LandedDetect,
    Landed,
    Abort,
}

/// Phase sequencer driven by the estimator output.
///
/// One tick evaluates at most one transition. Hysteresis is wall time since
/// the recorded entry timestamps rather than consecutive tick counts, so the
/// sequencer is insensitive to tick rate jitter.
pub struct FlightFsm {
    thresholds: FsmThresholds,
    phase: FlightPhase,
    launch_time: f64,
    burnout_time: f64,
    apogee_time: f64,
    drogue_time: f64,
    main_time: f64,
    landing_time: f64,
}

impl FlightFsm {
    pub fn new(thresholds: FsmThresholds) -> Self {
        Self {
            thresholds,
            phase: FlightPhase::Init,
            launch_time: 0.0,
            burnout_time: 0.0,
            apogee_time: 0.0,
            drogue_time: 0.0,
            main_time: 0.0,
            landing_time: 0.0,
        }
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn launch_time(&self) -> f64 {
        self.launch_time
    }

    pub fn burnout_time(&self) -> f64 {
        self.burnout_time
    }

    pub fn apogee_time(&self) -> f64 {
        self.apogee_time
    }

    pub fn drogue_time(&self) -> f64 {
        self.drogue_time
    }

    pub fn main_time(&self) -> f64 {
        self.main_time
    }

    pub fn landing_time(&self) -> f64 {
        self.landing_time
    }

    /// Advances the sequencer by one tick. Returns the new phase when a
    /// transition was taken.
    pub fn tick<const N: usize>(
        &mut self,
        now: f64,
        abort: bool,
        estimate: &EstimateSample,
        history: &EstimateHistory<N>,
    ) -> Option<FlightPhase> {
        // the estimator has not published yet, nothing to sequence on
        if history.is_empty() {
            return None;
        }

        if abort && self.phase != FlightPhase::Abort {
            self.phase = FlightPhase::Abort;
            return Some(FlightPhase::Abort);
        }

        let t = self.thresholds;
        let acc = estimate.vertical_acceleration;
        let vel = estimate.vertical_velocity;
        let previous = self.phase;

        match self.phase {
            FlightPhase::Init => {
                self.phase = FlightPhase::Idle;
            }
            FlightPhase::Idle => {
                if acc > t.launch_linear_acceleration_thresh {
                    self.launch_time = now;
                    self.phase = FlightPhase::LaunchDetect;
                }
            }
            FlightPhase::LaunchDetect => {
                if acc < t.launch_linear_acceleration_thresh {
                    // the kick was too brief, back to the pad
                    self.phase = FlightPhase::Idle;
                } else if now - self.launch_time > t.launch_time_thresh {
                    self.phase = FlightPhase::Boost;
                }
            }
            FlightPhase::Boost => {
                if acc < t.coast_thresh {
                    self.burnout_time = now;
                    self.phase = FlightPhase::BurnoutDetect;
                } else if now - self.launch_time > t.burn_time_thresh_ms {
                    // no motor burns this long, force coast
                    self.burnout_time = now;
                    self.phase = FlightPhase::CoastPreGnc;
                }
            }
            FlightPhase::BurnoutDetect => {
                if acc > t.coast_thresh {
                    self.phase = FlightPhase::Boost;
                } else if now - self.burnout_time > t.coast_time_thresh {
                    self.phase = FlightPhase::CoastPreGnc;
                }
            }
            FlightPhase::CoastPreGnc => {
                if now - self.burnout_time > t.coast_ac_delay_thresh {
                    self.phase = FlightPhase::CoastGnc;
                }
            }
            FlightPhase::CoastGnc => {
                if fabsf(vel) * 0.02 < t.apogee_altimeter_threshold {
                    self.apogee_time = now;
                    self.phase = FlightPhase::ApogeeDetect;
                } else if now - self.burnout_time > t.coast_to_apogee_time_thresh {
                    self.apogee_time = now;
                    self.phase = FlightPhase::Apogee;
                }
            }
            FlightPhase::ApogeeDetect => {
                let altitude_change =
                    history.altitude_average(0, 3) - history.altitude_average(3, 3);
                if fabsf(altitude_change) > t.apogee_altimeter_threshold {
                    // still moving, back to coast
                    self.phase = FlightPhase::CoastGnc;
                } else if now - self.apogee_time > t.apogee_time_thresh {
                    self.phase = FlightPhase::Apogee;
                }
            }
            FlightPhase::Apogee => {
                let acceleration_change =
                    history.acceleration_average(0, 3) - history.acceleration_average(3, 3);
                if fabsf(acceleration_change) > t.drogue_acceleration_change_threshold_imu {
                    self.phase = FlightPhase::DrogueDetect;
                } else if now - self.apogee_time > t.drogue_deploy_time_since_apogee_threshold {
                    self.drogue_time = now;
                    self.phase = FlightPhase::Drogue;
                }
            }
            FlightPhase::DrogueDetect => {
                let curvature_change = history.altitude_second_derivative_average(0, 3)
                    - history.altitude_second_derivative_average(3, 3);
                if fabsf(curvature_change) > t.drogue_acceleration_change_threshold_altimeter {
                    self.drogue_time = now;
                    self.phase = FlightPhase::Drogue;
                } else {
                    self.phase = FlightPhase::Apogee;
                }
            }
            FlightPhase::Drogue => {
                let acceleration_change =
                    history.acceleration_average(0, 3) - history.acceleration_average(3, 3);
                if now - self.drogue_time > t.refresh_timer
                    && fabsf(acceleration_change) > t.main_acceleration_change_threshold_imu
                {
                    self.phase = FlightPhase::MainDetect;
                } else if now - self.drogue_time > t.main_deploy_time_since_drogue_threshold {
                    self.main_time = now;
                    self.phase = FlightPhase::Main;
                }
            }
            FlightPhase::MainDetect => {
                let curvature_change = history.altitude_second_derivative_average(0, 3)
                    - history.altitude_second_derivative_average(3, 3);
                if fabsf(curvature_change) > t.main_acceleration_change_threshold_altimeter {
                    self.main_time = now;
                    self.phase = FlightPhase::Main;
                } else {
                    self.phase = FlightPhase::Drogue;
                }
            }
            FlightPhase::Main => {
                let altitude_change =
                    history.altitude_average(0, 3) - history.altitude_average(3, 3);
                if fabsf(altitude_change) < t.landing_altimeter_threshold {
                    self.landing_time = now;
                    self.phase = FlightPhase::LandedDetect;
                } else if now - self.main_time > t.main_deploy_time_since_drogue_threshold {
                    // timed from main entry; the threshold name is historical
                    self.phase = FlightPhase::Landed;
                }
            }
            FlightPhase::LandedDetect => {
                let altitude_change =
                    history.altitude_average(0, 3) - history.altitude_average(3, 3);
                if fabsf(altitude_change) > t.landing_altimeter_threshold {
                    self.phase = FlightPhase::Main;
                } else if now - self.landing_time > t.landing_time_thresh {
                    self.phase = FlightPhase::Landed;
                }
            }
            FlightPhase::Landed => {}
            FlightPhase::Abort => {}
        }

        if self.phase != previous {
            Some(self.phase)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn force_phase(&mut self, phase: FlightPhase, now: f64) {
        self.phase = phase;
        self.launch_time = now;
        self.burnout_time = now;
        self.apogee_time = now;
        self.drogue_time = now;
        self.main_time = now;
        self.landing_time = now;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TICK_MS: f64 = 10.0;

    fn test_thresholds() -> FsmThresholds {
        FsmThresholds {
            launch_linear_acceleration_thresh: 29.43,
            launch_time_thresh: 250.0,
            coast_thresh: 2.943,
            coast_time_thresh: 300.0,
            burn_time_thresh_ms: 4500.0,
            coast_ac_delay_thresh: 1000.0,
            coast_to_apogee_time_thresh: 26000.0,
            apogee_altimeter_threshold: 1.0,
            apogee_time_thresh: 1500.0,
            drogue_acceleration_change_threshold_imu: 15.0,
            drogue_acceleration_change_threshold_altimeter: 60.0,
            drogue_deploy_time_since_apogee_threshold: 3000.0,
            main_acceleration_change_threshold_imu: 15.0,
            main_acceleration_change_threshold_altimeter: 60.0,
            main_deploy_time_since_drogue_threshold: 60000.0,
            landing_altimeter_threshold: 0.5,
            landing_time_thresh: 5000.0,
            refresh_timer: 500.0,
        }
    }

    struct Bench {
        fsm: FlightFsm,
        history: EstimateHistory<16>,
        now: f64,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                fsm: FlightFsm::new(test_thresholds()),
                history: EstimateHistory::new(),
                now: 0.0,
            }
        }

        fn push(&mut self, altitude: f32, vertical_velocity: f32, vertical_acceleration: f32) {
            self.now += TICK_MS;
            self.history.push(EstimateSample {
                timestamp: self.now,
                altitude,
                vertical_velocity,
                vertical_acceleration,
                apogee_prediction: 0.0,
            });
        }

        fn step(
            &mut self,
            altitude: f32,
            vertical_velocity: f32,
            vertical_acceleration: f32,
        ) -> FlightPhase {
            self.push(altitude, vertical_velocity, vertical_acceleration);
            let estimate = self.history.newest().unwrap().clone();
            self.fsm.tick(self.now, false, &estimate, &self.history);
            self.fsm.phase()
        }

        fn step_for(&mut self, duration_ms: f64, altitude: f32, vel: f32, acc: f32) {
            let ticks = (duration_ms / TICK_MS) as usize;
            for _ in 0..ticks {
                self.step(altitude, vel, acc);
            }
        }
    }

    #[test]
    fn stalls_in_init_until_an_estimate_exists() {
        let mut bench = Bench::new();
        let estimate = EstimateSample {
            timestamp: 0.0,
            altitude: 0.0,
            vertical_velocity: 0.0,
            vertical_acceleration: 0.0,
            apogee_prediction: 0.0,
        };

        for _ in 0..5 {
            let transition = bench
                .fsm
                .tick(bench.now, false, &estimate, &bench.history);
            assert_eq!(transition, None);
            assert_eq!(bench.fsm.phase(), FlightPhase::Init);
        }

        assert_eq!(bench.step(0.0, 0.0, 0.0), FlightPhase::Idle);
    }

    #[test]
    fn quiet_pad_stays_idle() {
        let mut bench = Bench::new();
        bench.step(0.0, 0.0, 0.0); // Init -> Idle
        for _ in 0..100 {
            assert_eq!(bench.step(0.0, 0.0, 0.0), FlightPhase::Idle);
        }
    }

    #[test]
    fn launch_transient_is_rejected() {
        let mut bench = Bench::new();
        bench.step(0.0, 0.0, 0.0);

        assert_eq!(bench.step(0.0, 0.0, 40.0), FlightPhase::LaunchDetect);
        assert_eq!(bench.step(0.0, 0.0, 0.0), FlightPhase::Idle);

        for _ in 0..50 {
            assert_eq!(bench.step(0.0, 0.0, 0.0), FlightPhase::Idle);
        }
    }

    #[test]
    fn sustained_acceleration_is_a_launch() {
        let mut bench = Bench::new();
        bench.step(0.0, 0.0, 0.0);

        assert_eq!(bench.step(0.0, 0.0, 50.0), FlightPhase::LaunchDetect);

        let mut saw_boost = false;
        for _ in 0..30 {
            if bench.step(10.0, 50.0, 50.0) == FlightPhase::Boost {
                saw_boost = true;
                break;
            }
        }
        assert!(saw_boost, "expected Boost within 300ms of sustained thrust");
    }

    #[test]
    fn one_transition_per_tick_never_skips_the_detect_gate() {
        let mut bench = Bench::new();
        bench.step(0.0, 0.0, 0.0);

        // a single tick of massive thrust only reaches the antechamber
        assert_eq!(bench.step(0.0, 0.0, 500.0), FlightPhase::LaunchDetect);
    }

    #[test]
    fn burnout_by_timeout_records_burnout_time() {
        let mut bench = Bench::new();
        bench.step(0.0, 0.0, 0.0);
        bench.step(0.0, 0.0, 50.0);
        bench.step_for(300.0, 10.0, 50.0, 50.0);
        assert_eq!(bench.fsm.phase(), FlightPhase::Boost);

        let launch_time = bench.fsm.launch_time();
        bench.step_for(5000.0, 100.0, 100.0, 50.0);
        assert_eq!(bench.fsm.phase(), FlightPhase::CoastPreGnc);

        // burnout stamp is the first tick past the burn time threshold
        let expected = launch_time + 4500.0 + TICK_MS;
        assert_eq!(bench.fsm.burnout_time(), expected);
    }

    #[test]
    fn burnout_transient_returns_to_boost() {
        let mut bench = Bench::new();
        bench.step(0.0, 0.0, 0.0);
        bench.step(0.0, 0.0, 50.0);
        bench.step_for(300.0, 10.0, 50.0, 50.0);
        assert_eq!(bench.fsm.phase(), FlightPhase::Boost);

        assert_eq!(bench.step(100.0, 100.0, 0.0), FlightPhase::BurnoutDetect);
        assert_eq!(bench.step(100.0, 100.0, 50.0), FlightPhase::Boost);
    }

    #[test]
    fn apogee_via_velocity_passes_through_the_detect_gate() {
        let mut bench = Bench::new();
        bench.step(0.0, 0.0, 0.0);
        bench.step(0.0, 0.0, 50.0);
        bench.step_for(300.0, 10.0, 50.0, 50.0);
        assert_eq!(bench.fsm.phase(), FlightPhase::Boost);

        // burnout, then wait out the detect window and the gnc delay
        bench.step(300.0, 100.0, 0.0);
        bench.step_for(400.0, 300.0, 100.0, 0.0);
        assert_eq!(bench.fsm.phase(), FlightPhase::CoastPreGnc);
        bench.step_for(800.0, 800.0, 90.0, -9.0);
        assert_eq!(bench.fsm.phase(), FlightPhase::CoastGnc);

        // velocity decaying toward zero, altitude holding
        let mut saw_detect = false;
        let mut vel = 10.0f32;
        for _ in 0..200 {
            let phase = bench.step(800.0, vel, -9.0);
            if phase == FlightPhase::ApogeeDetect {
                saw_detect = true;
                // |vel| * 0.02 crossed below the altimeter threshold
                assert!(vel * 0.02 < 1.0);
                break;
            }
            vel -= 0.05;
        }
        assert!(saw_detect);

        bench.step_for(2000.0, 800.0, 0.0, -9.0);
        assert_eq!(bench.fsm.phase(), FlightPhase::Apogee);
    }

    #[test]
    fn apogee_detect_reverts_when_still_moving() {
        let mut bench = Bench::new();
        // climb fast enough that the altitude windows differ by > 1m
        let mut altitude = 800.0f32;
        for _ in 0..8 {
            altitude += 5.0;
            bench.push(altitude, 90.0, -9.0);
        }
        bench.fsm.force_phase(FlightPhase::ApogeeDetect, bench.now);

        altitude += 5.0;
        assert_eq!(bench.step(altitude, 90.0, -9.0), FlightPhase::CoastGnc);
    }

    #[test]
    fn drogue_transient_rejected_then_deployed_by_timeout() {
        let mut bench = Bench::new();
        for _ in 0..8 {
            bench.push(800.0, 0.0, 0.0);
        }
        bench.fsm.force_phase(FlightPhase::Apogee, bench.now);

        // a jerk in the imu acceleration windows opens the detect gate
        bench.step(800.0, 0.0, -20.0);
        bench.step(800.0, 0.0, -20.0);
        assert_eq!(bench.step(800.0, 0.0, -20.0), FlightPhase::DrogueDetect);

        // flat altitude curvature: not a real deployment, fall back
        assert_eq!(bench.step(800.0, 0.0, -20.0), FlightPhase::Apogee);

        // eventually the timeout fires the drogue regardless
        bench.step_for(3500.0, 800.0, 0.0, 0.0);
        assert_eq!(bench.fsm.phase(), FlightPhase::Drogue);
        assert!(bench.fsm.drogue_time() > 0.0);
    }

    #[test]
    fn drogue_detect_confirms_on_altitude_curvature() {
        let mut fsm = FlightFsm::new(test_thresholds());
        let mut history = EstimateHistory::<16>::new();

        // oldest window affine in time, newest window curving at 100 m/s^2
        for i in 0..6u32 {
            let t_ms = i as f64 * TICK_MS;
            let altitude = if i < 3 {
                790.0 + t_ms as f32
            } else {
                let dt = ((t_ms - 3.0 * TICK_MS) / 1000.0) as f32;
                800.0 + 0.5 * 100.0 * dt * dt
            };
            history.push(EstimateSample {
                timestamp: t_ms,
                altitude,
                vertical_velocity: 0.0,
                vertical_acceleration: 0.0,
                apogee_prediction: 0.0,
            });
        }
        fsm.force_phase(FlightPhase::DrogueDetect, 60.0);

        let estimate = history.newest().unwrap().clone();
        let transition = fsm.tick(60.0, false, &estimate, &history);
        assert_eq!(transition, Some(FlightPhase::Drogue));
        assert_eq!(fsm.drogue_time(), 60.0);
    }

    #[test]
    fn landing_confirmed_from_main() {
        let mut bench = Bench::new();
        for _ in 0..8 {
            bench.push(100.0, -5.0, 0.0);
        }
        bench.fsm.force_phase(FlightPhase::Main, bench.now);

        let mut saw_detect = false;
        let mut landed_at = None;
        for i in 0..700 {
            let altitude = if (i / 3) % 2 == 0 { 100.0 } else { 99.9 };
            let phase = bench.step(altitude, 0.0, 0.0);
            match phase {
                FlightPhase::LandedDetect => saw_detect = true,
                FlightPhase::Landed => {
                    landed_at = Some(bench.now);
                    break;
                }
                _ => {}
            }
        }

        assert!(saw_detect, "expected the landing detect gate first");
        let landed_at = landed_at.expect("expected Landed within the window");
        // confirmation takes the landing hysteresis window
        assert!(landed_at - bench.fsm.landing_time() > 5000.0);
    }

    #[test]
    fn landed_is_terminal() {
        let mut bench = Bench::new();
        for _ in 0..8 {
            bench.push(100.0, 0.0, 0.0);
        }
        bench.fsm.force_phase(FlightPhase::Landed, bench.now);

        for _ in 0..50 {
            assert_eq!(bench.step(0.0, -50.0, 80.0), FlightPhase::Landed);
        }
    }

    #[test]
    fn abort_absorbs_from_any_phase() {
        for phase in [
            FlightPhase::Idle,
            FlightPhase::Boost,
            FlightPhase::CoastGnc,
            FlightPhase::Drogue,
            FlightPhase::Main,
        ] {
            let mut bench = Bench::new();
            for _ in 0..8 {
                bench.push(500.0, 0.0, 0.0);
            }
            bench.fsm.force_phase(phase, bench.now);

            let estimate = bench.history.newest().unwrap().clone();
            let transition = bench
                .fsm
                .tick(bench.now, true, &estimate, &bench.history);
            assert_eq!(transition, Some(FlightPhase::Abort));

            // sticky even after the flag reader would have cleared
            for _ in 0..20 {
                assert_eq!(bench.step(500.0, 0.0, 50.0), FlightPhase::Abort);
            }
        }
    }

    #[test]
    fn phase_only_moves_forward_outside_detect_reversions() {
        let mut bench = Bench::new();
        bench.step(0.0, 0.0, 0.0);
        bench.step(0.0, 0.0, 50.0);
        bench.step_for(300.0, 10.0, 50.0, 50.0);
        bench.step_for(5000.0, 500.0, 100.0, 50.0);
        bench.step_for(1500.0, 900.0, 90.0, -9.0);

        // the whole powered ascent never went backwards
        assert_eq!(bench.fsm.phase(), FlightPhase::CoastGnc);
    }
}
