//! Local sample outputs
//!
//! `CsvSink` persists every sample, `DashboardSink` renders a throttled live
//! view. `LocalSinks` bundles both behind one `SampleSink`.

mod csv;
mod dashboard;

use contracts::{ContractError, PersistenceConfig, Sample, SampleSink};

pub use self::csv::{CsvSink, CSV_HEADER};
pub use self::dashboard::DashboardSink;

/// Optional CSV persistence plus optional dashboard
pub struct LocalSinks {
    csv: Option<CsvSink>,
    dashboard: Option<DashboardSink>,
}

impl LocalSinks {
    pub fn new(csv: Option<CsvSink>, dashboard: Option<DashboardSink>) -> Self {
        Self { csv, dashboard }
    }

    /// Open the configured CSV file (if any) and a dashboard
    pub fn from_config(config: &PersistenceConfig) -> Result<Self, ContractError> {
        let csv = config.csv_path.as_ref().map(CsvSink::create).transpose()?;
        let dashboard = DashboardSink::new(config.dashboard_interval());
        Ok(Self::new(csv, Some(dashboard)))
    }

    /// Drop the dashboard, keeping persistence
    pub fn without_dashboard(mut self) -> Self {
        self.dashboard = None;
        self
    }

    pub fn csv(&self) -> Option<&CsvSink> {
        self.csv.as_ref()
    }

    pub fn dashboard(&self) -> Option<&DashboardSink> {
        self.dashboard.as_ref()
    }
}

impl SampleSink for LocalSinks {
    fn name(&self) -> &str {
        "local"
    }

    async fn persist(&mut self, sample: &Sample) -> Result<(), ContractError> {
        match self.csv.as_mut() {
            Some(csv) => csv.persist(sample).await,
            None => Ok(()),
        }
    }

    fn display(&mut self, sample: &Sample) {
        if let Some(dashboard) = self.dashboard.as_mut() {
            dashboard.display(sample);
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        match self.csv.as_mut() {
            Some(csv) => csv.flush().await,
            None => Ok(()),
        }
    }
}
