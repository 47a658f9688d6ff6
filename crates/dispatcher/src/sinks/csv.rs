//! CsvSink - one row per sample, flushed per row

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, Sample, SampleSink};
use tracing::{debug, info, instrument};

/// Column order of the on-disk layout
pub const CSV_HEADER: [&str; 20] = [
    "timestamp",
    "spo2",
    "ritmo_cardiaco",
    "ir_value",
    "red_value",
    "finger_detected",
    "spo2_buffer_ready",
    "acel_x",
    "acel_y",
    "acel_z",
    "acel_total",
    "gyro_x",
    "gyro_y",
    "gyro_z",
    "temperatura",
    "pasos_totales",
    "umbral_pasos",
    "calibrado",
    "max30102_ok",
    "mpu6050_ok",
];

/// Sink that appends samples to a CSV file
pub struct CsvSink {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
    rows: u64,
}

impl CsvSink {
    /// Create (truncate) the file, its parent directories and the header row
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "{}", CSV_HEADER.join(","))?;
        writer.flush()?;

        info!(path = %path.display(), "writing samples to csv");
        Ok(Self {
            name: "csv".to_string(),
            path,
            writer,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far (header excluded)
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Floats keep a decimal point (`0.0`, not `0`)
    fn format_row(sample: &Sample, timestamp: &str) -> String {
        let bit = |flag: bool| if flag { "1" } else { "0" };
        [
            timestamp.to_string(),
            format!("{:?}", sample.spo2),
            sample.heart_rate.to_string(),
            sample.ir_value.to_string(),
            sample.red_value.to_string(),
            bit(sample.finger_detected).to_string(),
            bit(sample.buffer_ready).to_string(),
            format!("{:?}", sample.accel_x),
            format!("{:?}", sample.accel_y),
            format!("{:?}", sample.accel_z),
            format!("{:?}", sample.accel_total),
            format!("{:?}", sample.gyro_x),
            format!("{:?}", sample.gyro_y),
            format!("{:?}", sample.gyro_z),
            format!("{:?}", sample.temperature),
            sample.total_steps.to_string(),
            format!("{:?}", sample.step_threshold),
            bit(sample.calibrated).to_string(),
            bit(sample.device_ok("max30102")).to_string(),
            bit(sample.device_ok("mpu6050")).to_string(),
        ]
        .join(",")
    }

    fn write_row(&mut self, sample: &Sample) -> std::io::Result<()> {
        let timestamp = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        writeln!(self.writer, "{}", Self::format_row(sample, &timestamp))?;
        self.writer.flush()
    }
}

impl SampleSink for CsvSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "csv_sink_persist",
        level = "trace",
        skip(self, sample),
        fields(sink = %self.name)
    )]
    async fn persist(&mut self, sample: &Sample) -> Result<(), ContractError> {
        self.write_row(sample)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        self.rows += 1;
        Ok(())
    }

    fn display(&mut self, _sample: &Sample) {}

    #[instrument(name = "csv_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(rows = self.rows, path = %self.path.display(), "csv flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Sample {
        let mut sample = Sample {
            spo2: 97.5,
            heart_rate: 72,
            ir_value: 51000,
            red_value: 40000,
            finger_detected: true,
            buffer_ready: false,
            accel_x: 0.25,
            accel_y: -1.5,
            accel_z: 9.6,
            accel_total: 9.8,
            gyro_x: 2.0,
            gyro_y: -0.75,
            gyro_z: 0.0,
            total_steps: 120,
            step_threshold: 1.8,
            calibrated: true,
            temperature: 31.2,
            ..Default::default()
        };
        sample.sensor_status.insert("max30102".to_string(), true);
        sample.sensor_status.insert("mpu6050".to_string(), false);
        sample
    }

    #[tokio::test]
    async fn test_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("datos").join("samples.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.persist(&sample()).await.unwrap();
        sink.persist(&Sample::default()).await.unwrap();
        sink.flush().await.unwrap();
        assert_eq!(sink.rows(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER.join(","));

        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields.len(), CSV_HEADER.len());
        assert_eq!(
            &fields[1..],
            [
                "97.5", "72", "51000", "40000", "1", "0", "0.25", "-1.5", "9.6", "9.8", "2.0",
                "-0.75", "0.0", "31.2", "120", "1.8", "1", "1", "0"
            ]
        );

        let zeroed: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(zeroed.len(), CSV_HEADER.len());
        assert_eq!(zeroed[7..14], ["0.0"; 7]);
        assert_eq!(zeroed[16], "0.0");
    }

    #[tokio::test]
    async fn test_rows_visible_without_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("live.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.persist(&sample()).await.unwrap();

        // per-row flush: readers see the row while the sink is still open
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_create_fails_on_directory() {
        let dir = tempdir().unwrap();
        assert!(CsvSink::create(dir.path()).is_err());
    }
}
