use crate::core::bridge::backoff::Backoff;
use crate::core::bridge::state::{BridgeState, BridgeStatistics};
use crate::core::transport::{FrameSink, FrameSource};
use crate::domain::config::BridgeConfig;
use crate::domain::error::{BridgeError, BridgeResult};
use crate::domain::frame::RawFrame;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// Run loop settings derived from the configuration
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Pause after a read that returned no data
    pub idle_interval: Duration,
    /// Serial read timeout; bounds how long shutdown waits for an in-flight read
    pub read_timeout: Duration,
    /// Reconnection attempts before a lost link is fatal
    pub max_reconnect_attempts: u32,
    pub backoff: Backoff,
}

impl BridgeSettings {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            idle_interval: config.bridge.idle_interval(),
            read_timeout: config.serial.timeout(),
            max_reconnect_attempts: config.reconnect.max_attempts,
            backoff: Backoff::from_config(&config.reconnect),
        }
    }
}

type ReadOutcome<S> = (S, BridgeResult<Option<RawFrame>>);

enum ReadEvent {
    Frame(RawFrame),
    Idle,
    Lost(BridgeError),
    Interrupted,
}

/// Serial-to-UDP run loop.
///
/// Owns the frame source, the sink and the run statistics. The source is moved
/// onto the blocking pool for every read and handed back afterwards, so the
/// loop never shares it and an interrupt can be served while a read is blocked.
pub struct BridgeLoop<S: FrameSource, K: FrameSink> {
    settings: BridgeSettings,
    state: BridgeState,
    source: Option<S>,
    sink: Option<K>,
    in_flight: Option<JoinHandle<ReadOutcome<S>>>,
    stats: BridgeStatistics,
}

impl<S: FrameSource, K: FrameSink> BridgeLoop<S, K> {
    /// Open the source, then the sink. The sink is never opened if the source fails.
    pub async fn initialize<OpenSource, OpenSink, SinkFuture>(
        settings: BridgeSettings,
        open_source: OpenSource,
        open_sink: OpenSink,
    ) -> BridgeResult<Self>
    where
        OpenSource: FnOnce() -> BridgeResult<S>,
        OpenSink: FnOnce() -> SinkFuture,
        SinkFuture: Future<Output = BridgeResult<K>>,
    {
        info!(state = %BridgeState::Initializing, "Initializing bridge");

        let mut source = match open_source() {
            Ok(source) => source,
            Err(e) => {
                error!(error = %e, "Failed to open serial connection");
                return Err(e);
            }
        };

        let sink = match open_sink().await {
            Ok(sink) => sink,
            Err(e) => {
                error!(error = %e, "Failed to open UDP socket");
                source.close();
                return Err(e);
            }
        };

        info!(
            serial = source.name(),
            destination = %sink.destination(),
            "Bridge initialized"
        );

        Ok(Self {
            settings,
            state: BridgeState::Initializing,
            source: Some(source),
            sink: Some(sink),
            in_flight: None,
            stats: BridgeStatistics::default(),
        })
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn statistics(&self) -> &BridgeStatistics {
        &self.stats
    }

    /// Relay frames until `shutdown` turns true (or its sender is dropped) or a fatal error occurs.
    ///
    /// Both handles are released on every exit path.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> BridgeResult<BridgeStatistics> {
        let started = Instant::now();
        self.transition(BridgeState::Running);

        let outcome = self.supervise(&mut shutdown).await;
        if let Err(e) = &outcome {
            error!(error = %e, "Bridge stopping on fatal error");
        }

        self.transition(BridgeState::ShuttingDown);
        self.release().await;
        self.stats.uptime = started.elapsed();
        self.log_summary();

        outcome.map(|()| self.stats.clone())
    }

    async fn supervise(&mut self, shutdown: &mut watch::Receiver<bool>) -> BridgeResult<()> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            match self.next_read(shutdown).await? {
                ReadEvent::Frame(frame) => self.forward(frame).await,
                ReadEvent::Idle => {
                    self.stats.idle_polls += 1;
                    if sleep_or_shutdown(self.settings.idle_interval, shutdown).await {
                        return Ok(());
                    }
                }
                ReadEvent::Lost(cause) => {
                    self.stats.connection_losses += 1;
                    warn!(error = %cause, "Serial connection lost");
                    self.transition(BridgeState::Degraded);
                    if !self.recover(cause, shutdown).await? {
                        return Ok(());
                    }
                }
                ReadEvent::Interrupted => return Ok(()),
            }
        }
    }

    async fn next_read(&mut self, shutdown: &mut watch::Receiver<bool>) -> BridgeResult<ReadEvent> {
        let mut source = self.take_source()?;
        let mut read = tokio::task::spawn_blocking(move || {
            let result = source.read_frame();
            (source, result)
        });

        tokio::select! {
            joined = &mut read => {
                let (source, result) = joined.map_err(task_failed)?;
                self.stats.framing_errors = source.framing_errors();
                self.source = Some(source);

                match result {
                    Ok(Some(frame)) => Ok(ReadEvent::Frame(frame)),
                    Ok(None) => Ok(ReadEvent::Idle),
                    Err(e @ BridgeError::ConnectionLost { .. }) => Ok(ReadEvent::Lost(e)),
                    Err(e) => Err(e),
                }
            }
            _ = shutdown_requested(shutdown) => {
                debug!("Interrupt received during serial read");
                self.in_flight = Some(read);
                Ok(ReadEvent::Interrupted)
            }
        }
    }

    async fn forward(&mut self, frame: RawFrame) {
        self.stats.frames_received += 1;
        let sample = frame.decode();

        info!(
            can_id = sample.can_id,
            raw_value = sample.raw_millivolts,
            voltage = sample.voltage,
            frame = %frame,
            "Frame received"
        );

        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        match sink.send(&frame).await {
            Ok(()) => {
                self.stats.frames_forwarded += 1;
                debug!(
                    can_id = sample.can_id,
                    destination = %sink.destination(),
                    outcome = "forwarded",
                    "Frame forwarded"
                );
            }
            Err(e) => {
                self.stats.send_errors += 1;
                warn!(
                    can_id = sample.can_id,
                    error = %e,
                    outcome = "dropped",
                    "Failed to forward frame"
                );
            }
        }
    }

    /// Reconnect within the retry budget. `Ok(false)` means shutdown was requested meanwhile.
    async fn recover(
        &mut self,
        cause: BridgeError,
        shutdown: &mut watch::Receiver<bool>,
    ) -> BridgeResult<bool> {
        let max_attempts = self.settings.max_reconnect_attempts;
        let mut last_error = cause;

        for attempt in 1..=max_attempts {
            let delay = self.settings.backoff.delay(attempt);
            info!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Scheduling serial reconnection"
            );
            if sleep_or_shutdown(delay, shutdown).await {
                return Ok(false);
            }

            self.stats.reconnect_attempts += 1;
            let mut source = self.take_source()?;
            let (source, result) = tokio::task::spawn_blocking(move || {
                let result = source.reconnect();
                (source, result)
            })
            .await
            .map_err(task_failed)?;
            self.source = Some(source);

            match result {
                Ok(()) => {
                    self.stats.reconnects += 1;
                    info!(attempt, "Serial connection restored");
                    self.transition(BridgeState::Running);
                    return Ok(true);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Reconnection attempt failed");
                    last_error = e;
                }
            }
        }

        Err(BridgeError::ReconnectExhausted {
            attempts: max_attempts,
            last: Box::new(last_error),
        })
    }

    async fn release(&mut self) {
        if let Some(read) = self.in_flight.take() {
            match tokio::time::timeout(self.settings.read_timeout, read).await {
                Ok(Ok((source, _))) => self.source = Some(source),
                Ok(Err(e)) => warn!(error = %e, "Serial read task failed during shutdown"),
                Err(_) => warn!("Serial read still blocked; the port closes when it returns"),
            }
        }

        if let Some(mut source) = self.source.take() {
            self.stats.framing_errors = source.framing_errors();
            source.close();
        }

        if let Some(sink) = self.sink.take() {
            info!(destination = %sink.destination(), "UDP socket closed");
        }
    }

    fn take_source(&mut self) -> BridgeResult<S> {
        self.source.take().ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "serial source is not available",
            ))
        })
    }

    fn transition(&mut self, next: BridgeState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "Bridge state changed");
            self.state = next;
        }
    }

    fn log_summary(&self) {
        let stats = &self.stats;
        info!(
            frames_received = stats.frames_received,
            frames_forwarded = stats.frames_forwarded,
            send_errors = stats.send_errors,
            framing_errors = stats.framing_errors,
            connection_losses = stats.connection_losses,
            reconnects = stats.reconnects,
            errors = stats.total_errors(),
            uptime_ms = stats.uptime.as_millis() as u64,
            "Bridge stopped"
        );
    }
}

fn task_failed(e: JoinError) -> BridgeError {
    BridgeError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("serial task failed: {}", e),
    ))
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Sleep for `duration`; returns `true` if shutdown was requested first.
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown_requested(shutdown) => true,
    }
}
