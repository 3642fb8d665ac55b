pub mod buzzer_queue;
pub mod sensor_cache;
pub mod storage;
pub mod task_timer;
pub mod telemetry;
