/// Phase transition thresholds, tuned per flight vehicle.
///
/// Accelerations are m/s^2, times are ms, altitude differences are meters.
#[derive(defmt::Format, Debug, Clone, Copy)]
pub struct FsmThresholds {
    pub launch_linear_acceleration_thresh: f32,
    pub launch_time_thresh: f64,
    pub coast_thresh: f32,
    pub coast_time_thresh: f64,
    pub burn_time_thresh_ms: f64,
    pub coast_ac_delay_thresh: f64,
    pub coast_to_apogee_time_thresh: f64,
    pub apogee_altimeter_threshold: f32,
    pub apogee_time_thresh: f64,
    pub drogue_acceleration_change_threshold_imu: f32,
    pub drogue_acceleration_change_threshold_altimeter: f32,
    pub drogue_deploy_time_since_apogee_threshold: f64,
    pub main_acceleration_change_threshold_imu: f32,
    pub main_acceleration_change_threshold_altimeter: f32,
    pub main_deploy_time_since_drogue_threshold: f64,
    pub landing_altimeter_threshold: f32,
    pub landing_time_thresh: f64,
    pub refresh_timer: f64,
}

impl FsmThresholds {
    /// Values flown on the current vehicle.
    pub const fn tuned() -> Self {
        Self {
            // 3 g sustained for a quarter second
            launch_linear_acceleration_thresh: 29.43,
            launch_time_thresh: 250.0,
            // 0.3 g
            coast_thresh: 2.943,
            coast_time_thresh: 300.0,
            burn_time_thresh_ms: 4500.0,
            coast_ac_delay_thresh: 2000.0,
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
}

impl Default for FsmThresholds {
    fn default() -> Self {
        Self::tuned()
    }
}
