//! # Integration Tests
//!
//! End-to-end runs of the gateway over an in-memory sensor link:
//! transport framing, protocol engine, dispatcher and CSV sink together.

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, GatewayBlueprint};

    #[test]
    fn test_default_blueprint_validates() {
        let toml = r#"
            [transport]
            kind = "tcp"
            addr = "127.0.0.1:7000"
        "#;
        let blueprint: GatewayBlueprint =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(blueprint.version, ConfigVersion::V1);
        assert!(blueprint.model.is_none());
        assert_eq!(
            config_loader::ConfigLoader::effective_model(&blueprint),
            predictor::reference_model_spec()
        );
    }

    #[test]
    fn test_sample_config_loads() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            include_str!("../../../demos/gateway.toml"),
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(blueprint.sinks.len(), 3);
        assert_eq!(blueprint.policy.heartbeat_ticks, 10);
        let warnings = config_loader::warnings(&blueprint);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("reference weights"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone};
    use contracts::{ContractError, ProtocolConfig, SinkConfig, SinkType};
    use dispatcher::sinks::CSV_HEADER;
    use dispatcher::{create_dispatcher, DispatchSummary};
    use ingestion::OnceConnector;
    use predictor::{reference_model_spec, Predictor};
    use sync_engine::{
        ManualClock, ProtocolRunner, RunReport, RunnerSettings, StopReason, SyncEngine,
    };
    use tokio::io::{
        duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf,
        WriteHalf,
    };
    use tokio::sync::{mpsc, watch};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    const STEP: Duration = Duration::from_secs(2);

    fn start_time() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
            .unwrap()
    }

    fn fast_protocol() -> ProtocolConfig {
        ProtocolConfig {
            poll_timeout_ms: 20,
            loop_sleep_ms: 0,
            reconnect: false,
            reconnect_delay_ms: 10,
            ..ProtocolConfig::default()
        }
    }

    fn file_sink(path: &Path) -> SinkConfig {
        SinkConfig {
            name: "csv".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 16,
            params: HashMap::from([("path".to_string(), path.display().to_string())]),
        }
    }

    fn log_sink() -> SinkConfig {
        SinkConfig {
            name: "log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 16,
            params: HashMap::new(),
        }
    }

    /// Sensor side of the link plus the running gateway tasks
    struct Harness {
        replies: Lines<BufReader<ReadHalf<DuplexStream>>>,
        sensor: WriteHalf<DuplexStream>,
        clock: ManualClock,
        shutdown: watch::Sender<bool>,
        runner: JoinHandle<Result<RunReport, ContractError>>,
        dispatcher: JoinHandle<DispatchSummary>,
    }

    impl Harness {
        async fn start(
            protocol: ProtocolConfig,
            max_rx: Option<u64>,
            sinks: Vec<SinkConfig>,
        ) -> Self {
            let (sensor_end, gateway_end) = duplex(1024);
            let (read, write) = split(sensor_end);

            let (event_tx, event_rx) = mpsc::channel(protocol.event_queue);
            let dispatcher = create_dispatcher(sinks, event_rx).await.unwrap().spawn();

            let clock = ManualClock::new(start_time());
            let predictor = Predictor::from_spec(&reference_model_spec()).unwrap();
            let engine = SyncEngine::new(predictor, &protocol, start_time());
            let settings = RunnerSettings::from_protocol(&protocol).with_max_rx(max_rx);
            let (shutdown, shutdown_rx) = watch::channel(false);

            let runner = ProtocolRunner::new(
                OnceConnector::new(gateway_end, "mem://sensor"),
                clock.clone(),
                engine,
                event_tx,
                shutdown_rx,
                settings,
            );
            let runner = tokio::spawn(runner.run());

            Self {
                replies: BufReader::new(read).lines(),
                sensor: write,
                clock,
                shutdown,
                runner,
                dispatcher,
            }
        }

        async fn send(&mut self, line: &str) {
            self.sensor
                .write_all(format!("{line}\n").as_bytes())
                .await
                .unwrap();
        }

        async fn reply(&mut self) -> String {
            timeout(STEP, self.replies.next_line())
                .await
                .expect("no reply from gateway")
                .unwrap()
                .expect("link closed")
        }

        /// Wait for the runner and the dispatcher drain
        async fn join(
            runner: JoinHandle<Result<RunReport, ContractError>>,
            dispatcher: JoinHandle<DispatchSummary>,
        ) -> (RunReport, DispatchSummary) {
            let report = timeout(STEP, runner).await.unwrap().unwrap().unwrap();
            let summary = timeout(STEP, dispatcher).await.unwrap().unwrap();
            (report, summary)
        }

        /// Close the sensor side and collect the results
        async fn hang_up(self) -> (RunReport, DispatchSummary) {
            let Self {
                replies,
                sensor,
                shutdown,
                runner,
                dispatcher,
                ..
            } = self;
            drop(replies);
            drop(sensor);
            let result = Self::join(runner, dispatcher).await;
            drop(shutdown);
            result
        }
    }

    fn epoch() -> String {
        start_time().timestamp().to_string()
    }

    #[tokio::test]
    async fn test_reading_is_acknowledged_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway_log.csv");
        let sinks = vec![file_sink(&path), log_sink()];
        let mut gw = Harness::start(fast_protocol(), None, sinks).await;

        gw.send("Received: 22.10,48.30").await;
        assert_eq!(gw.reply().await, epoch());

        let (report, summary) = gw.hang_up().await;
        assert_eq!(report.stop_reason, StopReason::TransportClosed);
        assert_eq!(report.sequence, 1);
        assert_eq!(report.events_dropped, 0);
        assert_eq!(summary.rx, 1);
        assert_eq!(summary.records(), 1);
        for (name, metrics) in &summary.sinks {
            assert_eq!(metrics.write_count, 1, "sink {name}");
            assert_eq!(metrics.failure_count, 0, "sink {name}");
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split(',').collect::<Vec<_>>(), CSV_HEADER);
        // Prediction columns depend on how many rollouts ran before the line
        let fields: Vec<_> = lines[1].split(',').collect();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[..5], ["2025-03-01 12:00:00", "0.5", "RX", "22.10", "48.30"]);
        for value in &fields[5..9] {
            let (_, decimals) = value.split_once('.').expect("fixed-point value");
            assert_eq!(decimals.len(), 2, "column value {value}");
        }
        let pred_t: f64 = fields[5].parse().unwrap();
        let error_t: f64 = fields[7].parse().unwrap();
        assert!((error_t - (22.10 - pred_t).abs()).abs() <= 0.011);
        assert_eq!(fields[9], "1");
    }

    #[tokio::test]
    async fn test_bare_reading_then_ping_with_default_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway_log.csv");
        let mut gw = Harness::start(fast_protocol(), None, vec![file_sink(&path)]).await;

        gw.send("22.10,48.30").await;
        assert_eq!(gw.reply().await, epoch());
        gw.send("0.0,0.0").await;
        assert_eq!(gw.reply().await, epoch());

        let (report, summary) = gw.hang_up().await;
        assert_eq!(report.sequence, 1);
        assert_eq!(report.engine.pings, 1);
        assert_eq!(summary.rx, 1);
        assert_eq!(summary.pings, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("2025-03-01 12:00:00,0.5,RX,22.10,48.30,"));
        assert!(lines[1].ends_with(",1"));
    }

    #[tokio::test]
    async fn test_ping_gets_clock_but_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway_log.csv");
        let mut gw = Harness::start(fast_protocol(), None, vec![file_sink(&path)]).await;

        gw.send("Received: 0.0,0.0").await;
        assert_eq!(gw.reply().await, epoch());

        gw.clock.advance(TimeDelta::seconds(5));
        gw.send("Received: 22.10,48.30").await;
        assert_eq!(gw.reply().await, (start_time().timestamp() + 5).to_string());

        let (report, summary) = gw.hang_up().await;
        assert_eq!(report.sequence, 1);
        assert_eq!(report.engine.pings, 1);
        assert_eq!(report.transmission.sync_pings, 1);
        assert_eq!(summary.pings, 1);
        assert_eq!(summary.rx, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains(",1\n"));
    }

    #[tokio::test]
    async fn test_malformed_lines_are_dropped_silently() {
        let mut gw = Harness::start(fast_protocol(), None, vec![log_sink()]).await;

        gw.send("boot ok").await;
        gw.send("Received: 1.0,2.0,3.0").await;
        gw.send("Received: warm,wet").await;
        gw.send("Received: 22.10,48.30").await;
        // Only the valid reading is answered
        assert_eq!(gw.reply().await, epoch());

        let (report, summary) = gw.hang_up().await;
        assert_eq!(report.engine.discarded, 3);
        assert_eq!(report.engine.lines, 4);
        assert_eq!(report.sequence, 1);
        assert_eq!(summary.rx, 1);
    }

    #[tokio::test]
    async fn test_any_prefix_without_marker() {
        let protocol = ProtocolConfig {
            marker: None,
            ..fast_protocol()
        };
        let mut gw = Harness::start(protocol, None, vec![log_sink()]).await;

        gw.send("node-7: 22.10,48.30").await;
        assert_eq!(gw.reply().await, epoch());
        gw.send("21.90,48.00").await;
        assert_eq!(gw.reply().await, epoch());

        let (report, _) = gw.hang_up().await;
        assert_eq!(report.sequence, 2);
    }

    #[tokio::test]
    async fn test_estimate_after_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway_log.csv");
        let protocol = ProtocolConfig {
            estimate_interval_secs: 60,
            ..fast_protocol()
        };
        let mut gw = Harness::start(protocol, None, vec![file_sink(&path)]).await;

        gw.send("Received: 22.10,48.30").await;
        assert_eq!(gw.reply().await, epoch());

        gw.clock.advance(TimeDelta::seconds(61));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let (report, summary) = gw.hang_up().await;
        assert_eq!(report.engine.estimates, 1);
        assert_eq!(summary.est, 1);
        assert_eq!(report.sequence, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("2025-03-01 12:01:01,"));
        assert!(lines[2].contains(",EST,,,"));
        assert!(lines[2].ends_with(",1"));
    }

    #[tokio::test]
    async fn test_max_rx_stops_runner() {
        let mut gw = Harness::start(fast_protocol(), Some(2), vec![log_sink()]).await;

        gw.send("Received: 22.10,48.30").await;
        gw.reply().await;
        gw.send("Received: 22.20,48.10").await;
        gw.reply().await;

        let Harness {
            replies,
            sensor,
            shutdown,
            runner,
            dispatcher,
            ..
        } = gw;
        let (report, summary) = Harness::join(runner, dispatcher).await;
        assert_eq!(report.stop_reason, StopReason::MaxRx);
        assert_eq!(report.sequence, 2);
        assert_eq!(summary.rx, 2);
        drop((replies, sensor, shutdown));
    }

    #[tokio::test]
    async fn test_shutdown_while_reconnecting() {
        let protocol = ProtocolConfig {
            reconnect: true,
            ..fast_protocol()
        };
        let mut gw = Harness::start(protocol, None, vec![log_sink()]).await;

        gw.send("Received: 22.10,48.30").await;
        gw.reply().await;

        let Harness {
            replies,
            sensor,
            shutdown,
            runner,
            dispatcher,
            ..
        } = gw;
        // Peer goes away; the single-use connector cannot reopen
        drop((replies, sensor));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!runner.is_finished());

        shutdown.send(true).unwrap();
        let (report, summary) = Harness::join(runner, dispatcher).await;
        assert_eq!(report.stop_reason, StopReason::Shutdown);
        assert_eq!(report.reconnects, 0);
        assert_eq!(report.sequence, 1);
        assert_eq!(summary.rx, 1);
    }

    #[tokio::test]
    async fn test_blueprint_driven_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let toml = format!(
            r#"
            [transport]
            kind = "tcp"
            addr = "127.0.0.1:7000"

            [protocol]
            marker = "DATA"
            poll_timeout_ms = 20
            loop_sleep_ms = 0
            reconnect = false

            [[sinks]]
            name = "csv"
            sink_type = "file"
            params = {{ path = "{}" }}
            "#,
            path.display()
        );
        let blueprint =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let mut gw = Harness::start(blueprint.protocol, None, blueprint.sinks).await;
        gw.send("Received: 22.10,48.30").await;
        gw.send("DATA: 21.00,45.00").await;
        assert_eq!(gw.reply().await, epoch());

        let (report, summary) = gw.hang_up().await;
        assert_eq!(report.sequence, 1);
        assert_eq!(report.engine.discarded, 1);
        assert_eq!(summary.rx, 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(",RX,21.00,45.00,"));
    }
}
