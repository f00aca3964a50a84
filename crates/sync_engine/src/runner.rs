//! Cooperative protocol loop: one task owns the transport and the engine.

use std::time::Duration;

use contracts::{
    ContractError, ProtocolConfig, Transport, TransportConnector, TransmissionEvent,
};
use observability::{TransmissionStats, TransmissionSummary};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

use crate::clock::Clock;
use crate::engine::{EngineStats, SyncEngine};

/// Loop timing and limits
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub poll_timeout: Duration,
    pub loop_sleep: Duration,
    pub dispatch_timeout: Duration,
    pub reconnect: bool,
    pub reconnect_delay: Duration,
    /// Stop after this many RX events
    pub max_rx: Option<u64>,
}

impl RunnerSettings {
    pub fn from_protocol(protocol: &ProtocolConfig) -> Self {
        Self {
            poll_timeout: protocol.poll_timeout(),
            loop_sleep: protocol.loop_sleep(),
            dispatch_timeout: protocol.dispatch_timeout(),
            reconnect: protocol.reconnect,
            reconnect_delay: protocol.reconnect_delay(),
            max_rx: None,
        }
    }

    pub fn with_max_rx(mut self, max_rx: Option<u64>) -> Self {
        self.max_rx = max_rx;
        self
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    TransportClosed,
    MaxRx,
}

/// Final report of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stop_reason: StopReason,
    pub sequence: u64,
    pub engine: EngineStats,
    pub reconnects: u64,
    pub events_dropped: u64,
    /// Online updates applied to the model over the whole run
    pub model_updates: u64,
    pub transmission: TransmissionSummary,
}

/// Drives a [`SyncEngine`] over a transport
pub struct ProtocolRunner<C, K> {
    connector: C,
    clock: K,
    engine: SyncEngine,
    events: mpsc::Sender<TransmissionEvent>,
    shutdown: watch::Receiver<bool>,
    settings: RunnerSettings,
    stats: TransmissionStats,
    reconnects: u64,
    events_dropped: u64,
}

enum LinkFailure {
    /// Give up, reconnect disabled or shutting down
    Stop(StopReason),
    Fatal(ContractError),
}

impl<C, K> ProtocolRunner<C, K>
where
    C: TransportConnector + Send + Sync,
    C::Link: Send,
    K: Clock,
{
    pub fn new(
        connector: C,
        clock: K,
        engine: SyncEngine,
        events: mpsc::Sender<TransmissionEvent>,
        shutdown: watch::Receiver<bool>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            connector,
            clock,
            engine,
            events,
            shutdown,
            settings,
            stats: TransmissionStats::new(),
            reconnects: 0,
            events_dropped: 0,
        }
    }

    /// Run until shutdown, EOF (without reconnect) or the RX limit.
    ///
    /// # Errors
    /// The initial connection fails, or a transport error occurs with
    /// reconnect disabled.
    #[instrument(name = "protocol_runner", skip(self), fields(endpoint = %self.connector.describe()))]
    pub async fn run(mut self) -> Result<RunReport, ContractError> {
        let mut link = self.connector.connect().await?;
        info!(endpoint = link.describe(), "transport connected");

        let stop_reason = loop {
            if self.shutdown_requested() {
                break StopReason::Shutdown;
            }

            let now = self.clock.now();
            self.engine.tick(now);
            if let Some(event) = self.engine.poll_estimate(now) {
                self.dispatch(event).await;
            }

            self.engine.await_line();
            let polled = tokio::select! {
                polled = link.poll_line(self.settings.poll_timeout) => polled,
                _ = self.shutdown.changed() => break StopReason::Shutdown,
            };

            let result = match polled {
                Ok(Some(line)) => self.process_line(&mut link, &line).await,
                Ok(None) => {
                    self.engine.poll_elapsed();
                    Ok(())
                }
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                match self.recover(&mut link, e).await {
                    Ok(()) => continue,
                    Err(LinkFailure::Stop(reason)) => break reason,
                    Err(LinkFailure::Fatal(e)) => {
                        let _ = link.close().await;
                        return Err(e);
                    }
                }
            }

            if let Some(max) = self.settings.max_rx {
                if self.engine.sequence() >= max {
                    break StopReason::MaxRx;
                }
            }

            if !self.settings.loop_sleep.is_zero() {
                tokio::select! {
                    _ = sleep(self.settings.loop_sleep) => {}
                    _ = self.shutdown.changed() => break StopReason::Shutdown,
                }
            }
        };

        if let Err(e) = link.close().await {
            warn!(error = %e, "transport close failed");
        }

        info!(
            ?stop_reason,
            sequence = self.engine.sequence(),
            reconnects = self.reconnects,
            "protocol loop stopped"
        );

        Ok(RunReport {
            stop_reason,
            sequence: self.engine.sequence(),
            engine: self.engine.stats(),
            reconnects: self.reconnects,
            events_dropped: self.events_dropped,
            model_updates: self.engine.predictor().update_count(),
            transmission: self.stats.summary(),
        })
    }

    async fn process_line(
        &mut self,
        link: &mut C::Link,
        line: &str,
    ) -> Result<(), ContractError> {
        let now = self.clock.now();
        let outcome = self.engine.handle_line(line, now);

        // The reading is already counted; its event goes out even if the reply fails
        let replied = match outcome.reply.as_deref() {
            Some(reply) => link.send_line(reply).await,
            None => Ok(()),
        };
        if let Some(event) = outcome.event {
            self.dispatch(event).await;
        }
        replied
    }

    /// Hand an event to the dispatcher within the dispatch timeout
    async fn dispatch(&mut self, event: TransmissionEvent) {
        self.stats.update(&event);
        observability::record_event(&event);
        if matches!(event, TransmissionEvent::Rx { .. }) {
            observability::record_transmission_summary(&self.stats.summary());
        }

        let kind = event.kind_label();
        match timeout(self.settings.dispatch_timeout, self.events.send(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                self.events_dropped += 1;
                observability::record_event_dropped("closed");
                warn!(kind, "dispatcher channel closed, event dropped");
            }
            Err(_) => {
                self.events_dropped += 1;
                observability::record_event_dropped("timeout");
                warn!(kind, "dispatcher busy, event dropped");
            }
        }
    }

    /// Reconnect after a transport error, keeping engine state
    async fn recover(&mut self, link: &mut C::Link, err: ContractError) -> Result<(), LinkFailure> {
        if !err.is_transport() {
            return Err(LinkFailure::Fatal(err));
        }

        if !self.settings.reconnect {
            return match err {
                ContractError::TransportClosed { .. } => {
                    info!("transport closed by peer");
                    Err(LinkFailure::Stop(StopReason::TransportClosed))
                }
                other => Err(LinkFailure::Fatal(other)),
            };
        }

        warn!(error = %err, "transport failure, reconnecting");
        if let Err(e) = link.close().await {
            debug!(error = %e, "close before reconnect failed");
        }

        loop {
            tokio::select! {
                _ = sleep(self.settings.reconnect_delay) => {}
                _ = self.shutdown.changed() => return Err(LinkFailure::Stop(StopReason::Shutdown)),
            }
            if self.shutdown_requested() {
                return Err(LinkFailure::Stop(StopReason::Shutdown));
            }

            match self.connector.connect().await {
                Ok(new_link) => {
                    *link = new_link;
                    self.reconnects += 1;
                    observability::record_reconnect(link.describe());
                    info!(
                        reconnects = self.reconnects,
                        sequence = self.engine.sequence(),
                        "transport reconnected, state preserved"
                    );
                    return Ok(());
                }
                Err(e) => error!(error = %e, "reconnect failed"),
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, FixedOffset, TimeZone};
    use contracts::Transport;
    use predictor::{reference_model_spec, Predictor};

    use crate::clock::ManualClock;

    fn start() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
            .unwrap()
    }

    /// Link replaying fixed lines, then reporting EOF
    struct ScriptedLink {
        lines: VecDeque<String>,
        fail_send: bool,
        replies: Arc<Mutex<Vec<String>>>,
    }

    impl Transport for ScriptedLink {
        fn describe(&self) -> &str {
            "script://sensor"
        }

        async fn poll_line(&mut self, _timeout: Duration) -> Result<Option<String>, ContractError> {
            match self.lines.pop_front() {
                Some(line) => Ok(Some(line)),
                None => Err(ContractError::TransportClosed {
                    endpoint: "script://sensor".into(),
                }),
            }
        }

        async fn send_line(&mut self, line: &str) -> Result<(), ContractError> {
            if self.fail_send {
                return Err(ContractError::transport_io("script://sensor", "write failed"));
            }
            self.replies.lock().unwrap().push(line.to_string());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// Hands out one scripted link per connect
    struct ScriptedConnector {
        links: Mutex<VecDeque<ScriptedLink>>,
    }

    impl ScriptedConnector {
        fn new(links: Vec<ScriptedLink>) -> Self {
            Self {
                links: Mutex::new(links.into()),
            }
        }
    }

    impl TransportConnector for ScriptedConnector {
        type Link = ScriptedLink;

        fn describe(&self) -> String {
            "script://sensor".into()
        }

        async fn connect(&self) -> Result<ScriptedLink, ContractError> {
            self.links
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ContractError::transport_open("script://sensor", "no more links"))
        }
    }

    fn link(lines: &[&str], fail_send: bool, replies: &Arc<Mutex<Vec<String>>>) -> ScriptedLink {
        ScriptedLink {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            fail_send,
            replies: replies.clone(),
        }
    }

    fn settings(max_rx: Option<u64>) -> RunnerSettings {
        RunnerSettings {
            poll_timeout: Duration::from_millis(10),
            loop_sleep: Duration::ZERO,
            dispatch_timeout: Duration::from_millis(100),
            reconnect: true,
            reconnect_delay: Duration::from_millis(1),
            max_rx,
        }
    }

    async fn run(
        connector: ScriptedConnector,
        settings: RunnerSettings,
    ) -> (Result<RunReport, ContractError>, Vec<TransmissionEvent>) {
        let protocol = ProtocolConfig {
            marker: None,
            ..ProtocolConfig::default()
        };
        let predictor = Predictor::from_spec(&reference_model_spec()).unwrap();
        let engine = SyncEngine::new(predictor, &protocol, start());
        let (tx, mut rx) = mpsc::channel(16);
        let (_shutdown, shutdown_rx) = watch::channel(false);

        let runner = ProtocolRunner::new(
            connector,
            ManualClock::new(start()),
            engine,
            tx,
            shutdown_rx,
            settings,
        );
        let result = timeout(Duration::from_secs(2), runner.run())
            .await
            .expect("runner did not stop");

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (result, events)
    }

    fn rx_sequences(events: &[TransmissionEvent]) -> Vec<u64> {
        events
            .iter()
            .filter_map(|e| match e {
                TransmissionEvent::Rx { sequence, .. } => Some(*sequence),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_rx_dispatched_when_reply_fails() {
        let replies = Arc::new(Mutex::new(Vec::new()));
        let connector = ScriptedConnector::new(vec![
            link(&["22.10,48.30"], true, &replies),
            link(&["22.20,48.10"], false, &replies),
        ]);

        let (result, events) = run(connector, settings(Some(2))).await;
        let report = result.unwrap();

        assert_eq!(report.stop_reason, StopReason::MaxRx);
        assert_eq!(report.sequence, 2);
        assert_eq!(report.reconnects, 1);
        assert_eq!(rx_sequences(&events), vec![1, 2]);
        assert_eq!(replies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_preserves_state() {
        let replies = Arc::new(Mutex::new(Vec::new()));
        let connector = ScriptedConnector::new(vec![
            link(&["22.10,48.30"], false, &replies),
            link(&["0.0,0.0", "22.20,48.10"], false, &replies),
        ]);

        let (result, events) = run(connector, settings(Some(2))).await;
        let report = result.unwrap();

        assert_eq!(report.stop_reason, StopReason::MaxRx);
        assert_eq!(report.sequence, 2);
        assert_eq!(report.reconnects, 1);
        assert_eq!(report.model_updates, 2);
        assert_eq!(report.engine.pings, 1);
        assert_eq!(rx_sequences(&events), vec![1, 2]);
        assert_eq!(replies.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_eof_without_reconnect_stops_cleanly() {
        let replies = Arc::new(Mutex::new(Vec::new()));
        let connector = ScriptedConnector::new(vec![link(&["22.10,48.30"], false, &replies)]);
        let settings = RunnerSettings {
            reconnect: false,
            ..settings(None)
        };

        let (result, events) = run(connector, settings).await;
        let report = result.unwrap();
        assert_eq!(report.stop_reason, StopReason::TransportClosed);
        assert_eq!(report.reconnects, 0);
        assert_eq!(rx_sequences(&events), vec![1]);
    }

    #[tokio::test]
    async fn test_initial_connect_failure_is_fatal() {
        let (result, events) = run(ScriptedConnector::new(Vec::new()), settings(None)).await;
        assert!(matches!(result, Err(ContractError::TransportOpen { .. })));
        assert!(events.is_empty());
    }
}
