//! Scripted sensor and recorder doubles for loop tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use recorder::{ConnectionError, Recorder, SchemaError, Table, WriteError};
use sampling_loop::Clock;
use sensor_source::{SensorReadError, SensorSample, SensorSource, Timestamp};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

pub fn timestamp(s: &str) -> Timestamp {
    Timestamp::from_naive(NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap())
}

/// Clock that always reports the same instant
pub struct FixedClock(pub Timestamp);

impl FixedClock {
    pub fn at(s: &str) -> Self {
        Self(timestamp(s))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0.clone()
    }
}

pub enum SensorStep {
    Read(f64, bool),
    Fail,
    /// Return a reading after a delay
    Slow(Duration, f64, bool),
    Hang,
}

/// Sensor source replaying a script, then reading 20 °C / no motion
#[derive(Default)]
pub struct ScriptedSensors {
    pub script: VecDeque<SensorStep>,
    pub calls: Vec<Instant>,
    pub released: bool,
    /// Raised on every sample, before it returns
    pub stop_on_sample: Option<watch::Sender<bool>>,
}

impl ScriptedSensors {
    pub fn new(steps: impl IntoIterator<Item = SensorStep>) -> Self {
        Self {
            script: steps.into_iter().collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SensorSource for ScriptedSensors {
    async fn sample(&mut self) -> Result<SensorSample, SensorReadError> {
        self.calls.push(Instant::now());
        if let Some(stop) = &self.stop_on_sample {
            let _ = stop.send(true);
        }

        let step = self.script.pop_front().unwrap_or(SensorStep::Read(20.0, false));
        let (temperature_celsius, motion_detected) = match step {
            SensorStep::Read(t, m) => (t, m),
            SensorStep::Fail => {
                return Err(SensorReadError::CrcMismatch("28-test".to_string()));
            }
            SensorStep::Slow(delay, t, m) => {
                tokio::time::sleep(delay).await;
                (t, m)
            }
            SensorStep::Hang => std::future::pending().await,
        };
        Ok(SensorSample {
            temperature_celsius,
            motion_detected,
        })
    }

    async fn release(&mut self) {
        self.released = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFault {
    None,
    ConnectionLost,
    Rejected,
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub table: Table,
    pub timestamp: String,
    pub value: f64,
}

/// In-memory recorder with scripted write and connect failures
#[derive(Default)]
pub struct MemoryRecorder {
    pub connected: bool,
    pub rows: Vec<Row>,
    pub write_faults: VecDeque<WriteFault>,
    /// `true` entries make the matching connect attempt fail
    pub connect_faults: VecDeque<bool>,
    pub connects: u32,
    pub closes: u32,
    pub schema_ensured: u32,
}

impl MemoryRecorder {
    /// A connected recorder with the given write faults queued
    pub fn connected(faults: impl IntoIterator<Item = WriteFault>) -> Self {
        Self {
            connected: true,
            write_faults: faults.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn rows_in(&self, table: Table) -> Vec<&Row> {
        self.rows.iter().filter(|r| r.table == table).collect()
    }

    async fn append(&mut self, table: Table, value: f64, timestamp: &Timestamp) -> Result<(), WriteError> {
        match self.write_faults.pop_front().unwrap_or(WriteFault::None) {
            WriteFault::None => {}
            WriteFault::ConnectionLost => {
                self.connected = false;
                return Err(WriteError::ConnectionLost {
                    table,
                    reason: "broken pipe".to_string(),
                });
            }
            WriteFault::Rejected => {
                return Err(WriteError::Rejected {
                    table,
                    reason: "CHECK constraint failed".to_string(),
                });
            }
            WriteFault::Hang => return std::future::pending().await,
        }

        if !self.connected {
            return Err(WriteError::NotConnected(table));
        }
        self.rows.push(Row {
            table,
            timestamp: timestamp.as_str().to_string(),
            value,
        });
        Ok(())
    }
}

#[async_trait]
impl Recorder for MemoryRecorder {
    async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.connects += 1;
        self.connected = false;
        if self.connect_faults.pop_front().unwrap_or(false) {
            return Err(ConnectionError::Connect("connection refused".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    async fn ensure_schema(&mut self) -> Result<(), SchemaError> {
        if !self.connected {
            return Err(SchemaError::NotConnected);
        }
        self.schema_ensured += 1;
        Ok(())
    }

    async fn insert_temperature(&mut self, celsius: f64, timestamp: &Timestamp) -> Result<(), WriteError> {
        self.append(Table::Temperature, celsius, timestamp).await
    }

    async fn insert_motion(&mut self, detected: bool, timestamp: &Timestamp) -> Result<(), WriteError> {
        self.append(Table::Motion, if detected { 1.0 } else { 0.0 }, timestamp).await
    }

    async fn close(&mut self) {
        if self.connected {
            self.closes += 1;
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
