//! Sampling Loop Implementation

use crate::clock::{Clock, LocalClock};
use crate::config::LoopConfig;
use crate::outcome::{LoopPhase, LoopStats, TickOutcome};
use recorder::{ConnectionError, Recorder, Table, WriteError};
use sensor_source::{Reading, SensorReadError, SensorSample, SensorSource};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Sample-then-persist loop over an owned sensor source and recorder
pub struct SamplingLoop<S, R, C = LocalClock> {
    sensors: S,
    recorder: R,
    clock: C,
    config: LoopConfig,
    phase: LoopPhase,
    /// Start of the most recent tick
    last_tick: Option<Instant>,
    stats: LoopStats,
}

impl<S, R> SamplingLoop<S, R, LocalClock>
where
    S: SensorSource,
    R: Recorder,
{
    /// Create a loop stamping readings with local wall-clock time
    pub fn new(sensors: S, recorder: R, config: LoopConfig) -> Self {
        Self::with_clock(sensors, recorder, LocalClock, config)
    }
}

impl<S, R, C> SamplingLoop<S, R, C>
where
    S: SensorSource,
    R: Recorder,
    C: Clock,
{
    /// Create a loop with an explicit timestamp source
    pub fn with_clock(sensors: S, recorder: R, clock: C, config: LoopConfig) -> Self {
        Self {
            sensors,
            recorder,
            clock,
            config,
            phase: LoopPhase::Idle,
            last_tick: None,
            stats: LoopStats::default(),
        }
    }

    /// Run ticks on the configured cadence until `shutdown` carries `true`.
    ///
    /// The stop signal interrupts the cadence wait but never a tick in
    /// progress; it is checked again once the tick's writes are done.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> LoopStats {
        info!(
            "Starting sampling loop: interval {:?}, I/O timeout {:?}",
            self.config.interval, self.config.io_timeout
        );

        let mut cadence = time::interval(self.config.interval);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = cadence.tick() => {}
                _ = stop_requested(&mut shutdown) => {
                    debug!("Stop requested while waiting for next tick");
                    break;
                }
            }

            let outcome = self.tick().await;
            debug!("Tick finished: {:?}", outcome);
        }

        self.phase = LoopPhase::Stopped;
        info!("Sampling loop stopped: {}", self.stats);
        self.stats
    }

    /// Execute a single tick immediately
    pub async fn tick(&mut self) -> TickOutcome {
        self.phase = LoopPhase::Sampling;
        self.last_tick = Some(Instant::now());

        let outcome = match self.sample().await {
            Ok(sample) => {
                let reading = Reading::stamp(sample, self.clock.now());
                self.phase = LoopPhase::Persisting;
                let outcome = self.persist(reading).await;
                self.phase = LoopPhase::Sampling;
                outcome
            }
            Err(e) => {
                warn!(operation = "sample", "Sensor read failed, skipping tick: {}", e);
                TickOutcome::SensorFailed
            }
        };

        self.stats.record(outcome);
        outcome
    }

    async fn sample(&mut self) -> Result<SensorSample, SensorReadError> {
        let timeout = self.config.io_timeout;
        match time::timeout(timeout, self.sensors.sample()).await {
            Ok(result) => result,
            Err(_) => Err(SensorReadError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Write temperature then motion, reconnecting at most once per tick.
    ///
    /// A failed insert is retried after the reconnection only when the row
    /// is known not to have been written; a timed-out insert is never
    /// issued twice.
    async fn persist(&mut self, reading: Reading) -> TickOutcome {
        let mut reconnect_spent = false;
        let mut reconnected = false;

        for table in [Table::Temperature, Table::Motion] {
            let mut result = self.write(table, &reading).await;

            if let Err(e) = &result {
                if e.is_connection_loss() && !reconnect_spent {
                    reconnect_spent = true;
                    let retry = e.is_retryable();
                    if retry {
                        warn!(operation = "insert", table = %table, "Connection lost, reconnecting: {}", e);
                    } else {
                        warn!(
                            operation = "insert",
                            table = %table,
                            "Write outcome unknown, reconnecting without retry: {}",
                            e
                        );
                    }
                    match self.reconnect().await {
                        Ok(()) => {
                            reconnected = true;
                            if retry {
                                result = self.write(table, &reading).await;
                            }
                        }
                        Err(ce) => {
                            error!(operation = "connect", "Reconnection failed: {}", ce);
                        }
                    }
                }
            }

            if let Err(e) = result {
                error!(
                    operation = "insert",
                    table = %e.table(),
                    timestamp = %reading.timestamp(),
                    "Dropping reading: {}",
                    e
                );
                return TickOutcome::Dropped {
                    persisted_temperature: table == Table::Motion,
                    reconnected,
                };
            }
        }

        if reading.motion_detected() {
            info!("Motion detected!");
        } else {
            info!("No motion");
        }
        TickOutcome::Persisted { reconnected }
    }

    async fn write(&mut self, table: Table, reading: &Reading) -> Result<(), WriteError> {
        let timeout = self.config.io_timeout;
        let timestamp = reading.timestamp();
        let insert = async {
            match table {
                Table::Temperature => {
                    self.recorder
                        .insert_temperature(reading.temperature_celsius(), timestamp)
                        .await
                }
                Table::Motion => {
                    self.recorder
                        .insert_motion(reading.motion_detected(), timestamp)
                        .await
                }
            }
        };

        match time::timeout(timeout, insert).await {
            Ok(result) => result,
            Err(_) => Err(WriteError::Timeout {
                table,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn reconnect(&mut self) -> Result<(), ConnectionError> {
        self.stats.reconnect_attempts += 1;
        let timeout = self.config.io_timeout;
        match time::timeout(timeout, self.recorder.connect()).await {
            Ok(result) => {
                if result.is_ok() {
                    info!("Reconnected to database");
                }
                result
            }
            Err(_) => Err(ConnectionError::Timeout(timeout.as_millis() as u64)),
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn last_tick(&self) -> Option<Instant> {
        self.last_tick
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Hand the resources back for teardown
    pub fn into_parts(self) -> (S, R) {
        (self.sensors, self.recorder)
    }
}

/// Resolves once the signal carries `true`; never resolves if the sender is gone
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
