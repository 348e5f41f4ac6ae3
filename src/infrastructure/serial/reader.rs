use crate::core::framing::{Alignment, FrameAligner};
use crate::core::transport::{ConnectionState, FrameSource};
use crate::domain::config::{FramingConfig, ResyncPolicy, SerialConfig};
use crate::domain::error::{BridgeError, BridgeResult};
use crate::domain::frame::RawFrame;
use crate::infrastructure::serial::port::{PortOpener, SystemPortOpener};
use std::io::{self, Read};
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 64;

/// Reads aligned 4-byte frames from a serial link.
///
/// Bytes that arrive before a read timeout but do not complete a frame stay
/// buffered for the next call, so a frame is never split or partially returned.
pub struct SerialFrameReader<O: PortOpener = SystemPortOpener> {
    opener: O,
    port_name: String,
    port: Option<O::Port>,
    state: ConnectionState,
    aligner: FrameAligner,
    scratch: [u8; READ_CHUNK],
    consecutive_errors: u32,
    max_consecutive_errors: u32,
}

impl SerialFrameReader<SystemPortOpener> {
    /// Open the configured serial device.
    pub fn open(serial: &SerialConfig, framing: &FramingConfig) -> BridgeResult<Self> {
        let opener = SystemPortOpener::new(serial.clone(), framing.discard_on_open)?;
        Self::with_opener(opener, framing, serial.max_consecutive_io_errors)
    }
}

impl<O: PortOpener> SerialFrameReader<O> {
    /// Open a link through a custom opener.
    pub fn with_opener(
        opener: O,
        framing: &FramingConfig,
        max_consecutive_errors: u32,
    ) -> BridgeResult<Self> {
        let port_name = opener.name().to_string();
        let mut reader = Self {
            opener,
            port_name,
            port: None,
            state: ConnectionState::Disconnected,
            aligner: FrameAligner::from_config(framing),
            scratch: [0u8; READ_CHUNK],
            consecutive_errors: 0,
            max_consecutive_errors: max_consecutive_errors.max(1),
        };
        reader.connect()?;
        Ok(reader)
    }

    pub fn policy(&self) -> ResyncPolicy {
        self.aligner.policy()
    }

    /// Bytes received but not yet part of a frame.
    pub fn pending_bytes(&self) -> usize {
        self.aligner.pending()
    }

    fn connect(&mut self) -> BridgeResult<()> {
        self.state = ConnectionState::Connecting;
        debug!(port = %self.port_name, "Opening serial port");

        match self.opener.open() {
            Ok(port) => {
                self.port = Some(port);
                self.state = ConnectionState::Connected;
                self.consecutive_errors = 0;
                info!(port = %self.port_name, policy = ?self.aligner.policy(), "Serial port opened");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                Err(BridgeError::Connection {
                    port: self.port_name.clone(),
                    source: e,
                })
            }
        }
    }

    fn lose_connection(&mut self, source: io::Error) -> BridgeError {
        self.port = None;
        self.state = ConnectionState::Error;
        BridgeError::ConnectionLost {
            port: self.port_name.clone(),
            source,
        }
    }

    /// Return the next frame the aligner accepts, logging every rejected candidate.
    fn next_aligned(&mut self) -> Option<RawFrame> {
        while let Some(step) = self.aligner.next_frame() {
            match step {
                Alignment::Frame(frame) => return Some(frame),
                Alignment::Rejected {
                    discarded,
                    candidate,
                    reason,
                } => {
                    let error = BridgeError::Framing(reason);
                    warn!(
                        port = %self.port_name,
                        candidate = %candidate,
                        discarded = format_args!("0x{:02X}", discarded),
                        error = %error,
                        "Discarded one byte to resynchronize"
                    );
                }
            }
        }
        None
    }
}

impl<O: PortOpener> FrameSource for SerialFrameReader<O> {
    fn name(&self) -> &str {
        &self.port_name
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn read_frame(&mut self) -> BridgeResult<Option<RawFrame>> {
        loop {
            if let Some(frame) = self.next_aligned() {
                return Ok(Some(frame));
            }

            let Some(port) = self.port.as_mut() else {
                return Err(self.lose_connection(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "serial port is not open",
                )));
            };

            let read = match port.read(&mut self.scratch) {
                Ok(0) => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial port reached end of stream",
                )),
                other => other,
            };

            match read {
                Ok(n) => {
                    self.consecutive_errors = 0;
                    self.aligner.push(&self.scratch[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    self.consecutive_errors = 0;
                    return Ok(None);
                }
                Err(e) => {
                    self.consecutive_errors += 1;
                    warn!(
                        port = %self.port_name,
                        error = %e,
                        consecutive = self.consecutive_errors,
                        "Serial read failed"
                    );
                    if self.consecutive_errors >= self.max_consecutive_errors {
                        return Err(self.lose_connection(e));
                    }
                }
            }
        }
    }

    fn reconnect(&mut self) -> BridgeResult<()> {
        self.port = None;
        self.aligner.clear();
        self.connect()
    }

    fn framing_errors(&self) -> u64 {
        self.aligner.discarded_bytes()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!(port = %self.port_name, "Serial port closed");
        }
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    enum Step {
        Data(Vec<u8>),
        Timeout,
        Fail(io::ErrorKind),
    }

    struct ScriptedPort {
        steps: VecDeque<Step>,
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                Some(Step::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push_front(Step::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
                Some(Step::Timeout) | None => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
            }
        }
    }

    struct ScriptedOpener {
        ports: VecDeque<io::Result<ScriptedPort>>,
    }

    impl ScriptedOpener {
        fn new(scripts: Vec<Vec<Step>>) -> Self {
            Self {
                ports: scripts
                    .into_iter()
                    .map(|steps| Ok(ScriptedPort { steps: steps.into() }))
                    .collect(),
            }
        }
    }

    impl PortOpener for ScriptedOpener {
        type Port = ScriptedPort;

        fn name(&self) -> &str {
            "/dev/scripted"
        }

        fn open(&mut self) -> io::Result<ScriptedPort> {
            self.ports
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::NotFound, "no such device")))
        }
    }

    fn resync_single_channel() -> FramingConfig {
        FramingConfig {
            allowed_can_ids: vec![0x0123],
            ..FramingConfig::default()
        }
    }

    #[test]
    fn test_open_failure_is_connection_error() {
        let result =
            SerialFrameReader::with_opener(ScriptedOpener::new(Vec::new()), &FramingConfig::default(), 3);
        assert!(matches!(result, Err(BridgeError::Connection { .. })));
    }

    #[test]
    fn test_frame_split_across_reads() {
        let opener = ScriptedOpener::new(vec![vec![
            Step::Data(vec![0x01, 0x23]),
            Step::Timeout,
            Step::Data(vec![0x0C, 0xE4]),
        ]]);
        let mut reader = SerialFrameReader::with_opener(opener, &FramingConfig::default(), 3).unwrap();
        assert_eq!(reader.state(), ConnectionState::Connected);

        assert_eq!(reader.read_frame().unwrap(), None);
        assert_eq!(reader.pending_bytes(), 2);
        assert_eq!(
            reader.read_frame().unwrap(),
            Some(RawFrame::new([0x01, 0x23, 0x0C, 0xE4]))
        );
        assert_eq!(reader.read_frame().unwrap(), None);
    }

    #[test]
    fn test_one_chunk_with_many_frames() {
        let mut data = Vec::new();
        for value in [100u16, 200, 300] {
            data.extend_from_slice(RawFrame::from_parts(0x0123, value).as_bytes());
        }
        let opener = ScriptedOpener::new(vec![vec![Step::Data(data)]]);
        let mut reader = SerialFrameReader::with_opener(opener, &resync_single_channel(), 3).unwrap();

        let values: Vec<u16> = std::iter::from_fn(|| reader.read_frame().unwrap())
            .map(|frame| frame.raw_value())
            .collect();
        assert_eq!(values, vec![100, 200, 300]);
    }

    #[test]
    fn test_resync_counts_discarded_bytes() {
        let opener = ScriptedOpener::new(vec![vec![Step::Data(vec![
            0x01, 0x23, 0x0C, 0xE4, 0x23, 0x01, 0x00, 0x01, 0x23, 0x07, 0xD0,
        ])]]);
        let mut reader = SerialFrameReader::with_opener(opener, &resync_single_channel(), 3).unwrap();

        assert_eq!(reader.read_frame().unwrap().map(|f| f.raw_value()), Some(3300));
        assert_eq!(reader.read_frame().unwrap().map(|f| f.raw_value()), Some(2000));
        assert_eq!(reader.framing_errors(), 3);
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let opener = ScriptedOpener::new(vec![vec![
            Step::Fail(io::ErrorKind::Interrupted),
            Step::Data(vec![0x00, 0x01, 0x00, 0x00]),
        ]]);
        let mut reader = SerialFrameReader::with_opener(opener, &FramingConfig::default(), 1).unwrap();
        assert_eq!(reader.read_frame().unwrap(), Some(RawFrame::from_parts(1, 0)));
    }

    #[test]
    fn test_sustained_failure_is_connection_lost() {
        let opener = ScriptedOpener::new(vec![vec![
            Step::Fail(io::ErrorKind::BrokenPipe),
            Step::Fail(io::ErrorKind::BrokenPipe),
            Step::Fail(io::ErrorKind::BrokenPipe),
        ]]);
        let mut reader = SerialFrameReader::with_opener(opener, &FramingConfig::default(), 3).unwrap();

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionLost { .. }));
        assert_eq!(reader.state(), ConnectionState::Error);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionLost { .. }));
    }

    #[test]
    fn test_end_of_stream_is_connection_lost() {
        let opener = ScriptedOpener::new(vec![(0..50).map(|_| Step::Data(Vec::new())).collect()]);
        let mut reader = SerialFrameReader::with_opener(opener, &FramingConfig::default(), 3).unwrap();

        match reader.read_frame() {
            Err(BridgeError::ConnectionLost { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(reader.state(), ConnectionState::Error);
    }

    #[test]
    fn test_single_failure_is_tolerated() {
        let opener = ScriptedOpener::new(vec![vec![
            Step::Fail(io::ErrorKind::Other),
            Step::Data(vec![0x00, 0x02, 0x0C, 0xE4]),
        ]]);
        let mut reader = SerialFrameReader::with_opener(opener, &FramingConfig::default(), 3).unwrap();
        assert_eq!(reader.read_frame().unwrap(), Some(RawFrame::from_parts(2, 3300)));
        assert_eq!(reader.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_reconnect_drops_stale_bytes() {
        let opener = ScriptedOpener::new(vec![
            vec![Step::Data(vec![0x01, 0x23]), Step::Fail(io::ErrorKind::BrokenPipe)],
            vec![Step::Data(vec![0x00, 0x02, 0x0C, 0xE4])],
        ]);
        let mut reader = SerialFrameReader::with_opener(opener, &FramingConfig::default(), 1).unwrap();

        assert!(reader.read_frame().is_err());
        reader.reconnect().unwrap();
        assert_eq!(reader.state(), ConnectionState::Connected);
        assert_eq!(reader.read_frame().unwrap(), Some(RawFrame::from_parts(2, 3300)));
    }

    #[test]
    fn test_failed_reconnect_and_close() {
        let opener = ScriptedOpener::new(vec![vec![]]);
        let mut reader = SerialFrameReader::with_opener(opener, &FramingConfig::default(), 3).unwrap();

        assert!(matches!(reader.reconnect(), Err(BridgeError::Connection { .. })));
        assert_eq!(reader.state(), ConnectionState::Error);

        reader.close();
        assert_eq!(reader.state(), ConnectionState::Disconnected);
    }
}
