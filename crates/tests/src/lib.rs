//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Covers:
//! - Config file to running components
//! - Byte source -> Ingestor -> Processor (no serial device)
//! - Processor -> Dispatcher against a fake collector (no network)

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{MetricChannel, RelayBlueprint};

    #[test]
    fn test_config_round_trips_through_loader() {
        let toml = r#"
            [source]
            path = "/dev/ttyUSB0"

            [collector]
            base_url = "http://192.168.1.20:8000/"
            session = 7

            [dispatch]
            rate_interval_ms = 5000
            send_zero_movement = false
        "#;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(
            blueprint.collector.endpoint(MetricChannel::Movement),
            "http://192.168.1.20:8000/metrics/caminata/"
        );
        assert_eq!(blueprint.collector.session, 7);
        assert!(!blueprint.dispatch.send_zero_movement);
        // untouched sections keep their defaults
        assert_eq!(blueprint.pipeline.channel_capacity, 10);
        assert_eq!(blueprint.dispatch.max_attempts, 3);

        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded: RelayBlueprint =
            ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reloaded.dispatch.rate_interval_ms, 5000);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::NaiveDate;
    use contracts::{
        CandidateRecord, CollectorConfig, ContractError, DispatchConfig, Sample, SampleRelay,
        SampleSink,
    };
    use dispatcher::{
        CollectorTransport, Dispatcher, DispatcherBuilder, LocalSinks, TransportError,
    };
    use ingestion::{BoundedChannel, IngestEnd, Ingestor, IngestorConfig, ScriptedSource};
    use processor::{ProcessSummary, Processor, ProcessorConfig};
    use serde_json::Value;

    /// Keeps every persisted sample
    #[derive(Clone, Default)]
    struct RecordingSink {
        samples: Arc<Mutex<Vec<Sample>>>,
    }

    impl RecordingSink {
        fn spo2(&self) -> Vec<f64> {
            self.samples.lock().unwrap().iter().map(|s| s.spo2).collect()
        }
    }

    impl SampleSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn persist(&mut self, sample: &Sample) -> Result<(), ContractError> {
            self.samples.lock().unwrap().push(sample.clone());
            Ok(())
        }

        fn display(&mut self, _sample: &Sample) {}

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Collector double: records POSTs, optionally refuses connections
    #[derive(Clone, Default)]
    struct FakeCollector {
        posts: Arc<Mutex<Vec<(String, Value)>>>,
        attempted_at: Arc<Mutex<Vec<(String, tokio::time::Instant)>>>,
        refuse: bool,
    }

    impl FakeCollector {
        fn refusing() -> Self {
            Self {
                refuse: true,
                ..Default::default()
            }
        }

        fn posts_to(&self, suffix: &str) -> Vec<Value> {
            self.posts
                .lock()
                .unwrap()
                .iter()
                .filter(|(url, _)| url.ends_with(suffix))
                .map(|(_, body)| body.clone())
                .collect()
        }

        /// Time between consecutive attempts on one endpoint
        fn gaps_to(&self, suffix: &str) -> Vec<Duration> {
            let times: Vec<_> = self
                .attempted_at
                .lock()
                .unwrap()
                .iter()
                .filter(|(url, _)| url.ends_with(suffix))
                .map(|(_, at)| *at)
                .collect();
            times.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    impl CollectorTransport for FakeCollector {
        async fn post_json(&self, url: &str, body: &Value) -> Result<u16, TransportError> {
            self.posts
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            self.attempted_at
                .lock()
                .unwrap()
                .push((url.to_string(), tokio::time::Instant::now()));
            if self.refuse {
                return Err(TransportError::Connect("connection refused".into()));
            }
            Ok(201)
        }

        async fn get(&self, _url: &str) -> Result<u16, TransportError> {
            Ok(200)
        }
    }

    fn dispatcher(collector: FakeCollector) -> Arc<Dispatcher<FakeCollector>> {
        let fixed = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap();
        Arc::new(
            DispatcherBuilder::new(CollectorConfig::default(), DispatchConfig::default(), collector)
                .clock(Arc::new(move || fixed))
                .build(),
        )
    }

    fn stop_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    async fn ingest(source: ScriptedSource, channel: BoundedChannel<CandidateRecord>) -> IngestEnd {
        Ingestor::new(source, channel, stop_flag(), IngestorConfig::default())
            .run()
            .await
            .unwrap()
    }

    /// Ingestor and processor run concurrently over one scripted source
    #[tokio::test]
    async fn test_e2e_malformed_fragment_is_skipped() {
        let channel = BoundedChannel::new(10);
        let sink = RecordingSink::default();
        let processor = Processor::new(
            channel.clone(),
            sink.clone(),
            stop_flag(),
            ProcessorConfig::default(),
        );
        let process_task = tokio::spawn(processor.run());

        let source = ScriptedSource::from_text("{\"spo2\":98}\n{bad\n{\"spo2\":99}\n");
        assert_eq!(ingest(source, channel).await, IngestEnd::EndOfStream);

        let summary = process_task.await.unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(sink.spo2(), vec![98.0, 99.0]);
        assert_eq!(summary.statistics.max_spo2, Some(99.0));
        assert_eq!(summary.statistics.min_spo2, Some(98.0));
    }

    /// A slow consumer only ever sees the newest records
    #[tokio::test]
    async fn test_e2e_drop_oldest_under_backlog() {
        let channel = BoundedChannel::new(3);
        let text: String = (1..=6).map(|i| format!("{{\"spo2\":{}}}\n", 90 + i)).collect();
        ingest(ScriptedSource::from_text(&text), channel.clone()).await;

        let sink = RecordingSink::default();
        let summary = Processor::new(channel, sink.clone(), stop_flag(), ProcessorConfig::default())
            .run()
            .await;

        assert_eq!(summary.records, 3);
        assert_eq!(sink.spo2(), vec![94.0, 95.0, 96.0]);
    }

    /// Records split across reads and a failing source still reach the sink
    #[tokio::test]
    async fn test_e2e_split_reads_then_source_failure() {
        let channel = BoundedChannel::new(10);
        let source = ScriptedSource::new()
            .chunk("{\"spo2\":9")
            .chunk("7,\"pasos_totales\":5}\r\n{\"sp")
            .fail(std::io::ErrorKind::ConnectionReset);

        let result = Ingestor::new(source, channel.clone(), stop_flag(), IngestorConfig::default())
            .run()
            .await;
        assert!(result.is_err());
        assert!(channel.is_closed());

        let sink = RecordingSink::default();
        let summary = Processor::new(channel, sink.clone(), stop_flag(), ProcessorConfig::default())
            .run()
            .await;
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.statistics.last_total_steps, 5);
        assert_eq!(sink.spo2(), vec![97.0]);
    }

    async fn run_with_relay(
        records: &[(&str, Duration)],
        relay: Arc<dyn SampleRelay>,
    ) -> ProcessSummary {
        let channel = BoundedChannel::new(10);
        let processor = Processor::new(
            channel.clone(),
            RecordingSink::default(),
            stop_flag(),
            ProcessorConfig::default(),
        )
        .with_relay(relay);
        let process_task = tokio::spawn(processor.run());

        for (text, pause) in records {
            channel.push(CandidateRecord::new(*text));
            tokio::time::sleep(*pause).await;
        }
        channel.close();
        process_task.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_movement_counts_from_last_success() {
        let collector = FakeCollector::default();
        let dispatcher = dispatcher(collector.clone());

        run_with_relay(
            &[
                ("{\"pasos_totales\":100}", Duration::from_millis(3100)),
                ("{\"pasos_totales\":150}", Duration::from_millis(100)),
            ],
            dispatcher.clone(),
        )
        .await;
        assert!(dispatcher.shutdown(Duration::from_secs(6)).await);

        let movement = collector.posts_to("/metrics/caminata/");
        assert_eq!(movement.len(), 2);
        assert_eq!(movement[0]["pasos"], 100);
        assert_eq!(movement[0]["km_recorridos"], "0.08");
        assert_eq!(movement[1]["pasos"], 50);
        assert_eq!(movement[1]["km_recorridos"], "0.04");
        assert_eq!(movement[1]["calorias_quemadas"], "2.0");
        assert_eq!(movement[1]["sesion"], 1);
        assert_eq!(dispatcher.movement_state().baseline_steps, 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_repeated_vitals_send_once() {
        let collector = FakeCollector::default();
        let dispatcher = dispatcher(collector.clone());
        let vital = "{\"spo2\":97.3,\"ritmo_cardiaco\":72}";

        run_with_relay(
            &[
                (vital, Duration::from_millis(500)),
                (vital, Duration::from_millis(400)),
                (vital, Duration::from_millis(10)),
            ],
            dispatcher.clone(),
        )
        .await;
        dispatcher.shutdown(Duration::from_secs(6)).await;

        let vitals = collector.posts_to("/metrics/corazon/");
        assert_eq!(vitals.len(), 1);
        assert_eq!(vitals[0]["ritmo_cardiaco"], 72);
        assert_eq!(vitals[0]["oxigenacion"], "97.3");
        assert_eq!(vitals[0]["presion"], "120/80");
        assert_eq!(vitals[0]["fecha"], "2024-05-01");
        assert_eq!(vitals[0]["hora"], "09:00:00");
        assert_eq!(dispatcher.metrics().vital.rate_limited, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_unreachable_collector_keeps_state() {
        let collector = FakeCollector::refusing();
        let dispatcher = dispatcher(collector.clone());

        let summary = run_with_relay(
            &[("{\"pasos_totales\":40,\"spo2\":96}", Duration::from_millis(100))],
            dispatcher.clone(),
        )
        .await;
        assert_eq!(summary.samples, 1);

        // 3 attempts + 2 delays fit in the grace period
        assert!(dispatcher.shutdown(Duration::from_secs(6)).await);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.movement.attempts, 3);
        assert_eq!(metrics.movement.failed, 1);
        assert_eq!(metrics.vital.attempts, 3);
        assert_eq!(collector.posts_to("/metrics/caminata/").len(), 3);
        assert_eq!(
            collector.gaps_to("/metrics/caminata/"),
            [Duration::from_secs(2), Duration::from_secs(2)]
        );

        let state = dispatcher.movement_state();
        assert_eq!(state.baseline_steps, 0);
        assert!(state.last_send.is_none());
        assert!(state.last_payload.is_none());
    }

    /// CSV persistence through the real local sinks
    #[tokio::test]
    async fn test_e2e_csv_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datos").join("sensores.csv");
        let persistence = contracts::PersistenceConfig {
            csv_path: Some(path.clone()),
            ..Default::default()
        };
        let sinks = LocalSinks::from_config(&persistence).unwrap().without_dashboard();

        let channel = BoundedChannel::new(10);
        let processor =
            Processor::new(channel.clone(), sinks, stop_flag(), ProcessorConfig::default());
        let process_task = tokio::spawn(processor.run());

        let source = ScriptedSource::from_text(
            "{\"spo2\":97.5,\"ritmo_cardiaco\":70,\"finger_detected\":true,\
             \"acel_x\":0.12,\"acel_y\":-0.48,\"acel_z\":9.79,\"gyro_x\":1.5,\
             \"umbral_pasos\":1.8,\"sensor_status\":{\"max30102\":true,\"mpu6050\":false}}\n",
        );
        ingest(source, channel).await;
        assert_eq!(process_task.await.unwrap().samples, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], dispatcher::CSV_HEADER.join(","));
        assert!(lines[1]
            .ends_with(",97.5,70,0,0,1,0,0.12,-0.48,9.79,0.0,1.5,0.0,0.0,0.0,0,1.8,0,1,0"));
    }
}
