//! Agent Lifecycle
//!
//! Startup acquires resources in order (connection, schema, sensors) and
//! shutdown releases them in reverse once the sampling loop has stopped.

use crate::config::{ConfigError, SensorMode, Settings};
use async_trait::async_trait;
use recorder::{ConnectionError, Recorder, SchemaError, SqliteRecorder};
use sampling_loop::{LoopConfig, LoopStats, SamplingLoop};
use sensor_source::{HardwareSensors, SensorReadError, SensorSample, SensorSource, SimulatedSensors};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, warn};

/// Fatal startup failures
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Database schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Sensor acquisition error: {0}")]
    Sensors(#[from] SensorReadError),
}

impl AgentError {
    /// Process exit status (sysexits.h)
    pub fn exit_code(&self) -> u8 {
        match self {
            AgentError::Config(_) => 78,
            AgentError::Connection(_) => 69,
            AgentError::Schema(_) => 65,
            AgentError::Sensors(_) => 74,
        }
    }
}

/// Sensors selected by configuration
pub enum Sensors {
    Hardware(HardwareSensors),
    Simulated(SimulatedSensors),
}

impl Sensors {
    pub async fn acquire(mode: &SensorMode) -> Result<Self, SensorReadError> {
        match mode {
            SensorMode::Hardware(config) => Ok(Sensors::Hardware(HardwareSensors::acquire(config).await?)),
            SensorMode::Simulated => Ok(Sensors::Simulated(SimulatedSensors::default())),
        }
    }
}

#[async_trait]
impl SensorSource for Sensors {
    async fn sample(&mut self) -> Result<SensorSample, SensorReadError> {
        match self {
            Sensors::Hardware(s) => s.sample().await,
            Sensors::Simulated(s) => s.sample().await,
        }
    }

    async fn release(&mut self) {
        match self {
            Sensors::Hardware(s) => s.release().await,
            Sensors::Simulated(s) => s.release().await,
        }
    }
}

/// Connect and ensure the schema, each bounded by `io_timeout`.
///
/// The connection is closed again if the schema cannot be ensured.
pub async fn open_recorder<R: Recorder>(recorder: &mut R, io_timeout: Duration) -> Result<(), AgentError> {
    let timeout_ms = io_timeout.as_millis() as u64;

    time::timeout(io_timeout, recorder.connect())
        .await
        .map_err(|_| ConnectionError::Timeout(timeout_ms))??;

    let schema = time::timeout(io_timeout, recorder.ensure_schema())
        .await
        .unwrap_or(Err(SchemaError::Timeout(timeout_ms)));
    if let Err(e) = schema {
        recorder.close().await;
        return Err(e.into());
    }
    Ok(())
}

/// Await sensor acquisition, bounded by `io_timeout`
pub async fn acquire_within<S, F>(acquire: F, io_timeout: Duration) -> Result<S, SensorReadError>
where
    F: Future<Output = Result<S, SensorReadError>>,
{
    time::timeout(io_timeout, acquire)
        .await
        .unwrap_or(Err(SensorReadError::Timeout(io_timeout.as_millis() as u64)))
}

/// A started agent: connection open, schema ensured, sensors held
pub struct Agent<S, R> {
    sampler: SamplingLoop<S, R>,
    settle_delay: Duration,
}

impl Agent<Sensors, SqliteRecorder> {
    /// Bring up the production agent from validated settings
    pub async fn start(settings: &Settings) -> Result<Self, AgentError> {
        info!("Starting agent with {:?}", settings.credentials);

        let io_timeout = settings.loop_config.io_timeout;
        let mut recorder = SqliteRecorder::new(settings.credentials.clone())
            .with_busy_timeout(settings.loop_config.busy_timeout());
        open_recorder(&mut recorder, io_timeout).await?;

        let sensors = match acquire_within(Sensors::acquire(&settings.sensors), io_timeout).await {
            Ok(sensors) => sensors,
            Err(e) => {
                recorder.close().await;
                return Err(e.into());
            }
        };

        Ok(Self::assemble(
            sensors,
            recorder,
            settings.loop_config,
            settings.settle_delay,
        ))
    }
}

impl<S, R> Agent<S, R>
where
    S: SensorSource,
    R: Recorder,
{
    /// Build an agent from resources that are already acquired
    pub fn assemble(sensors: S, recorder: R, loop_config: LoopConfig, settle_delay: Duration) -> Self {
        Self {
            sampler: SamplingLoop::new(sensors, recorder, loop_config),
            settle_delay,
        }
    }

    /// Settle, sample until `shutdown` carries `true`, then tear down.
    ///
    /// Returns the resources after teardown together with the loop counters.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> (LoopStats, S, R) {
        if !self.settle_delay.is_zero() {
            info!("Waiting {:?} for sensors to settle", self.settle_delay);
            let stop = shutdown.wait_for(|stop| *stop);
            tokio::select! {
                _ = time::sleep(self.settle_delay) => info!("Ready"),
                _ = stop => info!("Stop requested during settle"),
            }
        }

        let stats = self.sampler.run(shutdown).await;

        let (mut sensors, mut recorder) = self.sampler.into_parts();
        sensors.release().await;
        recorder.close().await;
        info!("Released sensors and closed database connection");
        (stats, sensors, recorder)
    }
}

/// Raise the shutdown signal on SIGINT or SIGTERM
pub fn spawn_signal_listener(shutdown: watch::Sender<bool>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        if shutdown.send(true).is_err() {
            warn!("Shutdown signal raised after the agent exited");
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT (Ctrl+C), shutting down"),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            }
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
