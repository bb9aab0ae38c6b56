use std::{fs, path::PathBuf};

use chrono::{DateTime, Datelike, Local, Timelike};
use log::debug;

use crate::{
    error::Result,
    record::{CSV_HEADER, SensorType},
    registry::ClientId,
};

/// Opens per-client training sinks under one base directory.
#[derive(Debug, Clone)]
pub struct SinkManager {
    base_dir: PathBuf,
}

impl SinkManager {
    /// Creates a manager rooted at `base_dir`. The directory itself is
    /// created on first use.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Opens a fresh pair of sensor sinks for `client`.
    ///
    /// Both files share a wall-clock stem at second resolution and each
    /// starts with the `x,y,z,t,key` header row. Two registrations within
    /// the same second collide on the stem; accepted risk.
    ///
    /// # Errors
    /// Fails if the base directory or either file cannot be created. A
    /// failure aborts this registration only.
    pub fn open(&self, client: ClientId) -> Result<SinkSet> {
        fs::create_dir_all(&self.base_dir)?;

        let stem = timestamp_stem(Local::now());
        debug!("opening sinks for {client}: stem {stem}");

        Ok(SinkSet {
            accelerometer: self.open_sink(&stem, "accelerometer")?,
            gyroscope: self.open_sink(&stem, "gyroscope")?,
        })
    }

    fn open_sink(&self, stem: &str, sensor: &str) -> Result<csv::Writer<fs::File>> {
        let path = self.base_dir.join(format!("{stem}_{sensor}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
        Ok(writer)
    }
}

/// Per-client append targets, one per sensor type.
///
/// Exclusively owned by the client's training worker; single-writer by
/// construction. `close` consumes the set, so it can only happen once;
/// a set that is dropped without closing still flushes.
pub struct SinkSet {
    accelerometer: csv::Writer<fs::File>,
    gyroscope: csv::Writer<fs::File>,
}

impl SinkSet {
    /// Appends one `(x,y,z,t,key)` row to the sink matching `sensor`.
    /// Non-data tags have no sink and write nothing.
    pub fn append(&mut self, sensor: SensorType, row: &[String; 5]) -> Result<()> {
        let writer = match sensor {
            SensorType::Accelerometer => &mut self.accelerometer,
            SensorType::Gyroscope => &mut self.gyroscope,
            SensorType::Terminate | SensorType::Unknown => return Ok(()),
        };

        writer.write_record(row)?;
        Ok(())
    }

    /// Flushes both sinks and releases the underlying files.
    pub fn close(mut self) -> Result<()> {
        self.accelerometer.flush()?;
        self.gyroscope.flush()?;
        Ok(())
    }
}

/// Session-unique file-name stem, `YYYY-M-D_H:M:S`, unpadded.
fn timestamp_stem(now: DateTime<Local>) -> String {
    format!(
        "{}-{}-{}_{}:{}:{}",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
    )
}
