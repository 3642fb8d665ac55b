use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::{raw::NoopRawMutex, Mutex as BlockingMutex};
use embassy_sync::channel::{Channel, TrySendError};
use embedded_hal_async::delay::DelayNs;
use futures::join;

use crate::common::buzzer_queue::BuzzerQueue;
use crate::common::sensor_cache::SensorCache;
use crate::common::storage::{FlightLogger, LogRecord, PhaseChangeRecord};
use crate::common::task_timer::TaskTimer;
use crate::common::telemetry::{TelemetryPacket, UplinkCommand};
use crate::driver::barometer::{BaroReading, Barometer};
use crate::driver::buzzer::Buzzer;
use crate::driver::flap_servo::FlapServo;
use crate::driver::high_g_accelerometer::{HighGAccelerometer, HighGReading};
use crate::driver::imu::{Imu, ImuReading};
use crate::driver::indicator::Indicator;
use crate::driver::log_storage::LogStorage;
use crate::driver::mag::{MagReading, Magnetometer};
use crate::driver::orientation::{OrientationReading, OrientationSensor};
use crate::driver::radio::Radio;
use crate::Clock;

pub mod apogee_predictor;
pub mod drag_flap;
pub mod estimate_history;
pub mod flight_event;
pub mod flight_fsm;
pub mod kalman_filter;
pub mod thresholds;

use apogee_predictor::{ApogeeConfig, ApogeePredictor};
use drag_flap::{DragFlapController, FlapConfig};
use estimate_history::{EstimateHistory, EstimateSample};
use flight_event::FlightEvent;
use flight_fsm::{FlightFsm, FlightPhase};
use kalman_filter::{
    vertical_acceleration_measurement, KalmanConfig, KalmanFilter, Measurement,
};
use thresholds::FsmThresholds;

/// How far back the sequencer can look; must cover the windowed statistics
/// with slack.
const ESTIMATE_HISTORY_LEN: usize = 32;

const SENSOR_PERIOD_MS: f64 = 6.0;
const KALMAN_PERIOD_MS: f64 = 50.0;
const FSM_PERIOD_MS: f64 = 6.0;
const FLAP_PERIOD_MS: f64 = 6.0;
const DOWNLINK_BUFFER_PERIOD_MS: f64 = 80.0;
const DOWNLINK_SEND_PERIOD_MS: f64 = 200.0;
const STORAGE_PERIOD_MS: f64 = 6.0;
const BARO_SEED_PERIOD_MS: f64 = 100.0;
const BARO_SEED_SAMPLES: u32 = 30;

#[derive(defmt::Format, Debug, Clone, Default)]
pub struct AvionicsConfig {
    pub thresholds: FsmThresholds,
    pub kalman: KalmanConfig,
    pub flap: FlapConfig,
    pub apogee: ApogeeConfig,
}

pub struct AvionicsDevices<C, D, B, H, I, M, O, FS, R, L, BZ, IND> {
    pub clock: C,
    pub delay: D,
    pub barometer: B,
    pub high_g: H,
    pub imu: I,
    pub mag: M,
    pub orientation: O,
    pub flap_servo: FS,
    pub radio: R,
    pub log_storage: L,
    pub buzzer: BZ,
    pub indicator: IND,
}

/// Entry point of the flight-control core. Initializes the peripherals and
/// then runs the fixed set of periodic tasks forever. Never returns; a fatal
/// init failure parks on the indicator without starting any flight task.
#[inline(never)]
pub async fn avionics_main<C, D, B, H, I, M, O, FS, R, L, BZ, IND>(
    devices: AvionicsDevices<C, D, B, H, I, M, O, FS, R, L, BZ, IND>,
    config: AvionicsConfig,
) -> !
where
    C: Clock,
    D: DelayNs + Clone,
    B: Barometer,
    H: HighGAccelerometer,
    I: Imu,
    M: Magnetometer,
    O: OrientationSensor,
    FS: FlapServo,
    R: Radio,
    L: LogStorage,
    BZ: Buzzer,
    IND: Indicator,
{
    let AvionicsDevices {
        clock,
        delay,
        mut barometer,
        mut high_g,
        mut imu,
        mut mag,
        mut orientation,
        mut flap_servo,
        mut radio,
        mut log_storage,
        buzzer,
        mut indicator,
    } = devices;

    // the estimator cannot run without its two fusion sources
    if let Err(e) = barometer.reset().await {
        log_error!("barometer init failed: {:?}", e);
        init_failure(&mut indicator, delay.clone()).await;
    }
    if let Err(e) = high_g.reset().await {
        log_error!("high-g accelerometer init failed: {:?}", e);
        init_failure(&mut indicator, delay.clone()).await;
    }

    // everything else degrades gracefully
    if imu.reset().await.is_err() {
        log_warn!("low-g imu init failed, continuing");
    }
    if mag.reset().await.is_err() {
        log_warn!("magnetometer init failed, continuing");
    }
    if orientation.reset().await.is_err() {
        log_warn!("orientation unit init failed, continuing");
    }
    if flap_servo.reset().await.is_err() {
        log_warn!("flap servo init failed, continuing");
    }
    if radio.reset().await.is_err() {
        log_warn!("radio init failed, telemetry degraded");
    }
    if log_storage.reset().await.is_err() {
        log_warn!("log storage init failed, records will be dropped");
    }

    let buzzer_queue = BuzzerQueue::new();
    buzzer_queue.publish(2000, 50, 150);
    buzzer_queue.publish(3000, 50, 150);

    let baro_cache = SensorCache::<BaroReading>::new();
    let high_g_cache = SensorCache::<HighGReading>::new();
    let imu_cache = SensorCache::<ImuReading>::new();
    let mag_cache = SensorCache::<MagReading>::new();
    let orientation_cache = SensorCache::<OrientationReading>::new();

    let latest_estimate: BlockingMutex<NoopRawMutex, RefCell<Option<EstimateSample>>> =
        BlockingMutex::new(RefCell::new(None));
    let estimate_history: BlockingMutex<
        NoopRawMutex,
        RefCell<EstimateHistory<ESTIMATE_HISTORY_LEN>>,
    > = BlockingMutex::new(RefCell::new(EstimateHistory::new()));
    let current_phase: BlockingMutex<NoopRawMutex, RefCell<FlightPhase>> =
        BlockingMutex::new(RefCell::new(FlightPhase::Init));
    let apogee_prediction: BlockingMutex<NoopRawMutex, RefCell<f32>> =
        BlockingMutex::new(RefCell::new(0.0));
    let abort_flag = AtomicBool::new(false);

    let flight_events = Channel::<NoopRawMutex, FlightEvent, 8>::new();
    let downlink_fifo = Channel::<NoopRawMutex, TelemetryPacket, 4>::new();
    let flight_logger = FlightLogger::<64>::new();

    let sensor_fut = async {
        let mut timer = TaskTimer::new(clock, delay.clone(), SENSOR_PERIOD_MS);
        loop {
            timer.tick().await;
            // transient failures keep the previous cached reading
            match barometer.read().await {
                Ok(reading) => baro_cache.update(reading),
                Err(e) => log_debug!("barometer read failed: {:?}", e),
            }
            match high_g.read().await {
                Ok(reading) => high_g_cache.update(reading),
                Err(e) => log_debug!("high-g read failed: {:?}", e),
            }
            match imu.read().await {
                Ok(reading) => imu_cache.update(reading),
                Err(e) => log_debug!("imu read failed: {:?}", e),
            }
            match mag.read().await {
                Ok(reading) => mag_cache.update(reading),
                Err(e) => log_debug!("mag read failed: {:?}", e),
            }
            match orientation.read().await {
                Ok(reading) => orientation_cache.update(reading),
                Err(e) => log_debug!("orientation read failed: {:?}", e),
            }
        }
    };

    let kalman_fut = async {
        // seed altitude with the pad average so convergence is immediate
        let mut seed_timer = TaskTimer::new(clock, delay.clone(), BARO_SEED_PERIOD_MS);
        let mut sum = 0.0f32;
        let mut samples = 0u32;
        while samples < BARO_SEED_SAMPLES {
            seed_timer.tick().await;
            if let Some(reading) = baro_cache.get() {
                sum += reading.altitude();
                samples += 1;
            }
        }
        let mut filter = KalmanFilter::new(sum / BARO_SEED_SAMPLES as f32, &config.kalman);
        log_info!("estimator seeded at {} m", filter.altitude());

        // the sequencer stalls in Init until this first sample lands
        let first = filter.sample(clock.now_ms());
        latest_estimate.lock(|e| e.borrow_mut().replace(first.clone()));
        estimate_history.lock(|h| h.borrow_mut().push(first));

        let mut timer = TaskTimer::new(clock, delay.clone(), KALMAN_PERIOD_MS);
        loop {
            let dt_ms = timer.tick().await;
            let (Some(baro), Some(high_g)) = (baro_cache.get(), high_g_cache.get()) else {
                continue;
            };
            let measurement = Measurement {
                altitude: baro.altitude(),
                vertical_acceleration: vertical_acceleration_measurement(high_g.az()),
            };
            let phase = current_phase.lock(|p| *p.borrow());
            filter.update_apogee(apogee_prediction.lock(|a| *a.borrow()));
            filter.step(dt_ms, phase, &measurement);

            let now = clock.now_ms();
            let sample = if phase <= FlightPhase::Idle {
                // state is gated off on the pad; pass the live acceleration
                // through so launch detection has a signal
                filter.pad_sample(&measurement, now)
            } else {
                filter.sample(now)
            };
            latest_estimate.lock(|e| e.borrow_mut().replace(sample.clone()));
            estimate_history.lock(|h| h.borrow_mut().push(sample.clone()));
            flight_logger.log(LogRecord::Estimate(sample));
        }
    };

    let fsm_fut = async {
        let mut fsm = FlightFsm::new(config.thresholds);
        let mut timer = TaskTimer::new(clock, delay.clone(), FSM_PERIOD_MS);
        loop {
            timer.tick().await;
            let Some(estimate) = latest_estimate.lock(|e| e.borrow().clone()) else {
                continue;
            };
            let abort = abort_flag.load(Ordering::Relaxed);
            let now = clock.now_ms();
            let transition =
                estimate_history.lock(|h| fsm.tick(now, abort, &estimate, &h.borrow()));
            if let Some(phase) = transition {
                current_phase.lock(|p| *p.borrow_mut() = phase);
                let event = FlightEvent::PhaseChange {
                    timestamp: now,
                    phase,
                };
                if flight_events.try_send(event).is_err() {
                    log_warn!("flight event queue full");
                }
            }
        }
    };

    let flap_fut = async {
        let predictor = ApogeePredictor::new(config.apogee.clone());
        let controller = DragFlapController::new(config.flap.clone());
        let mut timer = TaskTimer::new(clock, delay.clone(), FLAP_PERIOD_MS);
        loop {
            timer.tick().await;
            let phase = current_phase.lock(|p| *p.borrow());
            let mut extension = 0.0;
            if phase == FlightPhase::CoastGnc {
                if let Some(estimate) = latest_estimate.lock(|e| e.borrow().clone()) {
                    let predicted =
                        predictor.predict_apogee(estimate.altitude, estimate.vertical_velocity);
                    apogee_prediction.lock(|a| *a.borrow_mut() = predicted);
                    extension = controller.extension(phase, predicted);
                }
            }
            flap_servo.set_extension(extension).await.ok();
        }
    };

    let downlink_buffer_fut = async {
        let mut timer = TaskTimer::new(clock, delay.clone(), DOWNLINK_BUFFER_PERIOD_MS);
        loop {
            timer.tick().await;
            let Some(estimate) = latest_estimate.lock(|e| e.borrow().clone()) else {
                continue;
            };
            let phase = current_phase.lock(|p| *p.borrow());
            let packet = TelemetryPacket::new(&estimate, phase);
            if let Err(TrySendError::Full(packet)) = downlink_fifo.try_send(packet) {
                // overwrite the oldest snapshot, fresh state matters more
                let _ = downlink_fifo.try_receive();
                downlink_fifo.try_send(packet).ok();
            }
        }
    };

    let downlink_send_fut = async {
        let mut timer = TaskTimer::new(clock, delay.clone(), DOWNLINK_SEND_PERIOD_MS);
        loop {
            timer.tick().await;
            if let Ok(packet) = downlink_fifo.try_receive() {
                if let Err(e) = radio.send(&packet).await {
                    log_warn!("downlink send failed: {:?}", e);
                }
            }
            match radio.poll_command().await {
                Ok(Some(UplinkCommand::Abort)) => {
                    log_warn!("abort commanded from the ground");
                    abort_flag.store(true, Ordering::Relaxed);
                    let event = FlightEvent::AbortCommanded {
                        timestamp: clock.now_ms(),
                    };
                    flight_events.try_send(event).ok();
                }
                Ok(None) => {}
                Err(e) => log_debug!("uplink poll failed: {:?}", e),
            }
        }
    };

    let storage_fut = flight_logger.run(log_storage, clock, delay.clone(), STORAGE_PERIOD_MS);

    let event_consumer_fut = async {
        loop {
            let event = flight_events.receive().await;
            match &event {
                FlightEvent::PhaseChange { timestamp, phase } => {
                    log_info!("phase -> {:?} at {}ms", phase, timestamp);
                    flight_logger.log(LogRecord::PhaseChange(PhaseChangeRecord {
                        timestamp: *timestamp,
                        phase: *phase as u8,
                    }));
                    match phase {
                        FlightPhase::Boost => {
                            buzzer_queue.publish(2000, 50, 150);
                            buzzer_queue.publish(3000, 50, 150);
                        }
                        FlightPhase::Apogee => {
                            buzzer_queue.publish(3000, 50, 150);
                        }
                        FlightPhase::Drogue | FlightPhase::Main => {
                            buzzer_queue.publish(2500, 50, 150);
                        }
                        FlightPhase::Landed => {
                            buzzer_queue.publish(2000, 700, 300);
                            buzzer_queue.publish(3000, 700, 300);
                        }
                        FlightPhase::Abort => {
                            buzzer_queue.publish(1000, 700, 300);
                        }
                        _ => {}
                    }
                }
                FlightEvent::AbortCommanded { .. } => {
                    buzzer_queue.publish(1000, 700, 300);
                }
            }
        }
    };

    let buzzer_fut = buzzer_queue.run(buzzer, delay.clone());

    let indicator_fut = async {
        let mut heartbeat_delay = delay.clone();
        loop {
            indicator.set_enable(true).await;
            heartbeat_delay.delay_ms(50).await;
            indicator.set_enable(false).await;
            heartbeat_delay.delay_ms(950).await;
        }
    };

    join!(
        sensor_fut,
        kalman_fut,
        fsm_fut,
        flap_fut,
        downlink_buffer_fut,
        downlink_send_fut,
        storage_fut,
        event_consumer_fut,
        buzzer_fut,
        indicator_fut,
    );
    log_unreachable!();
}

async fn init_failure(indicator: &mut impl Indicator, mut delay: impl DelayNs) -> ! {
    loop {
        indicator.set_enable(true).await;
        delay.delay_ms(200).await;
        indicator.set_enable(false).await;
        delay.delay_ms(200).await;
    }
}
