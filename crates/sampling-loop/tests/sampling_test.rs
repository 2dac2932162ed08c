//! Tick and cadence behaviour of the sampling loop

mod common;

use common::{FixedClock, MemoryRecorder, Row, ScriptedSensors, SensorStep, WriteFault};
use recorder::Table;
use sampling_loop::{LoopConfig, LoopPhase, SamplingLoop, TickOutcome};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

fn sampler(
    sensors: ScriptedSensors,
    recorder: MemoryRecorder,
) -> SamplingLoop<ScriptedSensors, MemoryRecorder, FixedClock> {
    SamplingLoop::with_clock(
        sensors,
        recorder,
        FixedClock::at("2024-01-01T00:00:00"),
        LoopConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_tick_writes_paired_rows() {
    let sensors = ScriptedSensors::new([SensorStep::Read(21.5, true)]);
    let mut sampler = sampler(sensors, MemoryRecorder::connected([]));
    assert_eq!(sampler.phase(), LoopPhase::Idle);

    let outcome = sampler.tick().await;

    assert_eq!(outcome, TickOutcome::Persisted { reconnected: false });
    assert_eq!(
        sampler.recorder().rows,
        vec![
            Row {
                table: Table::Temperature,
                timestamp: "2024-01-01T00:00:00".to_string(),
                value: 21.5,
            },
            Row {
                table: Table::Motion,
                timestamp: "2024-01-01T00:00:00".to_string(),
                value: 1.0,
            },
        ]
    );
    assert_eq!(sampler.phase(), LoopPhase::Sampling);
    assert!(sampler.last_tick().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_sensor_failure_writes_nothing() {
    let sensors = ScriptedSensors::new([SensorStep::Fail, SensorStep::Read(19.0, false)]);
    let mut sampler = sampler(sensors, MemoryRecorder::connected([]));

    assert_eq!(sampler.tick().await, TickOutcome::SensorFailed);
    assert!(sampler.recorder().rows.is_empty());

    assert_eq!(
        sampler.tick().await,
        TickOutcome::Persisted { reconnected: false }
    );
    assert_eq!(sampler.recorder().rows.len(), 2);
    assert_eq!(sampler.stats().sensor_failures, 1);
    assert_eq!(sampler.stats().persisted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_sensor_times_out() {
    let sensors = ScriptedSensors::new([SensorStep::Hang]);
    let mut sampler = sampler(sensors, MemoryRecorder::connected([]));

    let started = Instant::now();
    assert_eq!(sampler.tick().await, TickOutcome::SensorFailed);
    assert_eq!(started.elapsed(), LoopConfig::default().io_timeout);
}

#[tokio::test(start_paused = true)]
async fn test_single_connection_loss_recovers_with_one_reconnect() {
    let recorder = MemoryRecorder::connected([WriteFault::ConnectionLost]);
    let mut sampler = sampler(ScriptedSensors::default(), recorder);

    let outcome = sampler.tick().await;

    assert_eq!(outcome, TickOutcome::Persisted { reconnected: true });
    assert_eq!(sampler.recorder().connects, 1);
    assert_eq!(sampler.recorder().rows_in(Table::Temperature).len(), 1);
    assert_eq!(sampler.recorder().rows_in(Table::Motion).len(), 1);
    assert_eq!(sampler.stats().reconnect_attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_double_connection_loss_drops_tick_and_continues() {
    let recorder =
        MemoryRecorder::connected([WriteFault::ConnectionLost, WriteFault::ConnectionLost]);
    let mut sampler = sampler(ScriptedSensors::default(), recorder);

    assert_eq!(
        sampler.tick().await,
        TickOutcome::Dropped {
            persisted_temperature: false,
            reconnected: true,
        }
    );
    assert!(sampler.recorder().rows.is_empty());
    assert_eq!(sampler.recorder().connects, 1);

    // Next tick reconnects again and persists
    assert_eq!(
        sampler.tick().await,
        TickOutcome::Persisted { reconnected: true }
    );
    assert_eq!(sampler.recorder().rows.len(), 2);
    assert_eq!(sampler.recorder().connects, 2);
}

#[tokio::test(start_paused = true)]
async fn test_motion_loss_after_temperature_recovers() {
    let recorder = MemoryRecorder::connected([WriteFault::None, WriteFault::ConnectionLost]);
    let mut sampler = sampler(ScriptedSensors::default(), recorder);

    assert_eq!(
        sampler.tick().await,
        TickOutcome::Persisted { reconnected: true }
    );
    assert_eq!(sampler.recorder().rows.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_budget_is_one_per_tick() {
    let recorder = MemoryRecorder::connected([
        WriteFault::ConnectionLost,
        WriteFault::None,
        WriteFault::ConnectionLost,
    ]);
    let mut sampler = sampler(ScriptedSensors::default(), recorder);

    assert_eq!(
        sampler.tick().await,
        TickOutcome::Dropped {
            persisted_temperature: true,
            reconnected: true,
        }
    );
    assert_eq!(sampler.recorder().connects, 1);
    assert_eq!(sampler.recorder().rows_in(Table::Temperature).len(), 1);
    assert!(sampler.recorder().rows_in(Table::Motion).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_row_does_not_reconnect() {
    let recorder = MemoryRecorder::connected([WriteFault::Rejected]);
    let mut sampler = sampler(ScriptedSensors::default(), recorder);

    assert_eq!(
        sampler.tick().await,
        TickOutcome::Dropped {
            persisted_temperature: false,
            reconnected: false,
        }
    );
    assert_eq!(sampler.recorder().connects, 0);
    assert!(sampler.recorder().rows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_reconnect_recovers_next_tick() {
    let mut recorder = MemoryRecorder::connected([WriteFault::ConnectionLost]);
    recorder.connect_faults.push_back(true);
    let mut sampler = sampler(ScriptedSensors::default(), recorder);

    assert_eq!(
        sampler.tick().await,
        TickOutcome::Dropped {
            persisted_temperature: false,
            reconnected: false,
        }
    );
    assert!(!sampler.recorder().connected);

    assert_eq!(
        sampler.tick().await,
        TickOutcome::Persisted { reconnected: true }
    );
    assert_eq!(sampler.recorder().connects, 2);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_write_reconnects_without_retry() {
    let recorder = MemoryRecorder::connected([WriteFault::Hang]);
    let mut sampler = sampler(ScriptedSensors::default(), recorder);
    let config = *sampler.config();

    let started = Instant::now();
    let outcome = sampler.tick().await;

    assert_eq!(
        outcome,
        TickOutcome::Dropped {
            persisted_temperature: false,
            reconnected: true,
        }
    );
    // insert, then reconnect (instant); the timed-out insert is not reissued
    assert_eq!(started.elapsed(), config.io_timeout);
    assert!(started.elapsed() <= config.max_tick_duration());
    assert_eq!(sampler.recorder().connects, 1);
    assert!(sampler.recorder().rows.is_empty());

    // Next tick starts on the fresh connection
    assert_eq!(
        sampler.tick().await,
        TickOutcome::Persisted { reconnected: false }
    );
    assert_eq!(sampler.recorder().rows.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_motion_keeps_temperature_only() {
    let recorder = MemoryRecorder::connected([WriteFault::None, WriteFault::Hang]);
    let mut sampler = sampler(ScriptedSensors::default(), recorder);

    assert_eq!(
        sampler.tick().await,
        TickOutcome::Dropped {
            persisted_temperature: true,
            reconnected: true,
        }
    );
    assert_eq!(sampler.recorder().rows_in(Table::Temperature).len(), 1);
    assert!(sampler.recorder().rows_in(Table::Motion).is_empty());
    assert_eq!(sampler.stats().reconnect_attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_ticks_on_cadence_until_stopped() {
    let (tx, rx) = watch::channel(false);
    let mut sampler = sampler(ScriptedSensors::default(), MemoryRecorder::connected([]));

    let (stats, ()) = tokio::join!(sampler.run(rx), async move {
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        tx.send(true).unwrap();
    });

    assert_eq!(stats.ticks, 4);
    assert_eq!(stats.persisted, 4);
    assert_eq!(sampler.recorder().rows.len(), 8);
    assert_eq!(sampler.phase(), LoopPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_slow_tick_delays_without_catch_up() {
    let (tx, rx) = watch::channel(false);
    let sensors = ScriptedSensors::new([SensorStep::Slow(Duration::from_millis(2_500), 20.0, false)]);
    let config = LoopConfig {
        interval: Duration::from_secs(1),
        io_timeout: Duration::from_secs(5),
    };
    let mut sampler = SamplingLoop::with_clock(
        sensors,
        MemoryRecorder::connected([]),
        FixedClock::at("2024-01-01T00:00:00"),
        config,
    );

    let start = Instant::now();
    let (stats, ()) = tokio::join!(sampler.run(rx), async move {
        tokio::time::sleep(Duration::from_millis(4_000)).await;
        tx.send(true).unwrap();
    });

    let offsets: Vec<u128> = sampler
        .sensors()
        .calls
        .iter()
        .map(|at| at.duration_since(start).as_millis())
        .collect();
    assert_eq!(offsets, vec![0, 2_500, 3_500]);
    assert_eq!(stats.ticks, 3);
}

#[tokio::test(start_paused = true)]
async fn test_sensor_failures_never_stop_the_loop() {
    let (tx, rx) = watch::channel(false);
    let sensors = ScriptedSensors::new([SensorStep::Fail, SensorStep::Fail, SensorStep::Fail]);
    let mut sampler = sampler(sensors, MemoryRecorder::connected([]));

    let (stats, ()) = tokio::join!(sampler.run(rx), async move {
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        tx.send(true).unwrap();
    });

    assert_eq!(stats.sensor_failures, 3);
    assert_eq!(stats.persisted, 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_tick_finishes_writes() {
    let (tx, rx) = watch::channel(false);
    let mut sensors = ScriptedSensors::new([SensorStep::Read(22.0, true)]);
    sensors.stop_on_sample = Some(tx);
    let recorder = MemoryRecorder::connected([WriteFault::ConnectionLost]);
    let mut sampler = sampler(sensors, recorder);

    let stats = sampler.run(rx).await;

    assert_eq!(stats.ticks, 1);
    assert_eq!(stats.persisted, 1);
    assert_eq!(sampler.recorder().rows.len(), 2);
    assert_eq!(sampler.phase(), LoopPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_first_tick() {
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    let mut sampler = sampler(ScriptedSensors::default(), MemoryRecorder::connected([]));

    let stats = sampler.run(rx).await;

    assert_eq!(stats.ticks, 0);
    assert!(sampler.sensors().calls.is_empty());
    assert_eq!(sampler.phase(), LoopPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_into_parts_returns_resources() {
    let mut sampler = sampler(ScriptedSensors::default(), MemoryRecorder::connected([]));
    sampler.tick().await;

    let (sensors, recorder) = sampler.into_parts();
    assert_eq!(sensors.calls.len(), 1);
    assert_eq!(recorder.rows.len(), 2);
}
