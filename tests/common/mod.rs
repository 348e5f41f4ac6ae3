#![allow(dead_code)]

use canbridge::domain::config::DestinationConfig;
use canbridge::infrastructure::serial::PortOpener;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

/// What a scripted serial port does on each read
pub enum Step {
    Data(Vec<u8>),
    Timeout,
    Fail(io::ErrorKind),
}

/// Serial port stand-in that replays a script, then times out forever.
pub struct ScriptedPort {
    steps: VecDeque<Step>,
    read_timeout: Duration,
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
            Some(Step::Timeout) | None => {
                std::thread::sleep(self.read_timeout);
                Err(io::Error::new(io::ErrorKind::TimedOut, "Operation timed out"))
            }
        }
    }
}

/// Hands out one scripted port per open; opens fail once the scripts run out.
pub struct ScriptedOpener {
    scripts: VecDeque<Vec<Step>>,
    read_timeout: Duration,
    opens: Arc<AtomicUsize>,
}

impl ScriptedOpener {
    pub fn new(scripts: Vec<Vec<Step>>) -> Self {
        Self {
            scripts: scripts.into(),
            read_timeout: Duration::from_millis(5),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn single(steps: Vec<Step>) -> Self {
        Self::new(vec![steps])
    }

    /// Counter of successful opens, readable after the opener is moved.
    pub fn open_count(&self) -> Arc<AtomicUsize> {
        self.opens.clone()
    }
}

impl PortOpener for ScriptedOpener {
    type Port = ScriptedPort;

    fn name(&self) -> &str {
        "/dev/ttyTEST0"
    }

    fn open(&mut self) -> io::Result<ScriptedPort> {
        let steps = self
            .scripts
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedPort {
            steps: steps.into(),
            read_timeout: self.read_timeout,
        })
    }
}

/// Frames concatenated into one byte stream
pub fn stream(frames: &[(u16, u16)]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|&(can_id, raw)| {
            let mut bytes = can_id.to_be_bytes().to_vec();
            bytes.extend_from_slice(&raw.to_be_bytes());
            bytes
        })
        .collect()
}

/// Local UDP receiver plus a destination config pointing at it
pub async fn udp_receiver() -> (UdpSocket, DestinationConfig) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = DestinationConfig {
        host: "127.0.0.1".to_string(),
        port: socket.local_addr().unwrap().port(),
        bind_addr: None,
    };
    (socket, config)
}

/// Collect datagrams until none arrives within `quiet`.
pub async fn drain(socket: &UdpSocket, quiet: Duration) -> Vec<Vec<u8>> {
    let mut datagrams = Vec::new();
    let mut buf = [0u8; 64];
    while let Ok(Ok((len, _))) = tokio::time::timeout(quiet, socket.recv_from(&mut buf)).await {
        datagrams.push(buf[..len].to_vec());
    }
    datagrams
}
