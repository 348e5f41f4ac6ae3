//! Frame alignment on an undelimited byte stream.
//!
//! The serial protocol carries back-to-back 4-byte frames with no delimiter or
//! checksum. [`FrameAligner`] buffers incoming bytes and cuts them into frames
//! according to the configured [`ResyncPolicy`]:
//!
//! - `Strict` takes every 4 bytes as a frame. After a lost byte every later
//!   frame straddles two real frames until the link is reset.
//! - `Resync` checks each 4-byte candidate against [`PlausibilityCheck`]. An
//!   implausible candidate costs exactly one byte, then alignment is retried.

use crate::domain::config::{FramingConfig, ResyncPolicy};
use crate::domain::error::FramingError;
use crate::domain::frame::{RawFrame, FRAME_LEN};
use std::collections::{HashMap, VecDeque};

/// Value-range and rate-of-change limits a real frame must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlausibilityCheck {
    pub max_can_id: u16,
    pub max_raw_value: u16,
    pub allowed_can_ids: Vec<u16>,
    pub max_step: Option<u16>,
}

impl PlausibilityCheck {
    pub fn from_config(config: &FramingConfig) -> Self {
        Self {
            max_can_id: config.max_can_id,
            max_raw_value: config.max_raw_value,
            allowed_can_ids: config.allowed_can_ids.clone(),
            max_step: config.max_step,
        }
    }

    /// Check a candidate against the static limits and the previous value of its CAN id.
    pub fn check(&self, candidate: &RawFrame, previous: Option<u16>) -> Result<(), FramingError> {
        let can_id = candidate.can_id();
        let raw_value = candidate.raw_value();

        if can_id > self.max_can_id {
            return Err(FramingError::CanIdOutOfRange {
                can_id,
                max: self.max_can_id,
            });
        }
        if !self.allowed_can_ids.is_empty() && !self.allowed_can_ids.contains(&can_id) {
            return Err(FramingError::CanIdNotAllowed { can_id });
        }
        if raw_value > self.max_raw_value {
            return Err(FramingError::RawValueOutOfRange {
                raw_value,
                max: self.max_raw_value,
            });
        }
        if let (Some(max_step), Some(previous)) = (self.max_step, previous) {
            if previous.abs_diff(raw_value) > max_step {
                return Err(FramingError::StepTooLarge {
                    can_id,
                    previous,
                    current: raw_value,
                    max_step,
                });
            }
        }

        Ok(())
    }
}

/// Result of one alignment step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alignment {
    /// A frame was accepted and removed from the buffer.
    Frame(RawFrame),
    /// The candidate at the head of the buffer was rejected and its first byte dropped.
    Rejected {
        discarded: u8,
        candidate: RawFrame,
        reason: FramingError,
    },
}

/// Byte buffer that yields whole frames under a resync policy.
#[derive(Debug)]
pub struct FrameAligner {
    policy: ResyncPolicy,
    check: PlausibilityCheck,
    buffer: VecDeque<u8>,
    last_values: HashMap<u16, u16>,
    discarded: u64,
}

impl FrameAligner {
    pub fn new(policy: ResyncPolicy, check: PlausibilityCheck) -> Self {
        Self {
            policy,
            check,
            buffer: VecDeque::with_capacity(64),
            last_values: HashMap::new(),
            discarded: 0,
        }
    }

    pub fn from_config(config: &FramingConfig) -> Self {
        Self::new(config.policy, PlausibilityCheck::from_config(config))
    }

    pub fn policy(&self) -> ResyncPolicy {
        self.policy
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Bytes buffered but not yet part of a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes dropped by resynchronization so far.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Drop buffered bytes and per-id history, e.g. after the link was reopened.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_values.clear();
    }

    /// Take the next alignment step, or `None` while fewer than 4 bytes are buffered.
    pub fn next_frame(&mut self) -> Option<Alignment> {
        let candidate = self.peek()?;

        if self.policy == ResyncPolicy::Strict {
            self.buffer.drain(..FRAME_LEN);
            return Some(Alignment::Frame(candidate));
        }

        let previous = self.last_values.get(&candidate.can_id()).copied();
        match self.check.check(&candidate, previous) {
            Ok(()) => {
                self.buffer.drain(..FRAME_LEN);
                self.last_values
                    .insert(candidate.can_id(), candidate.raw_value());
                Some(Alignment::Frame(candidate))
            }
            Err(reason) => {
                // A genuine jump would otherwise be rejected forever.
                if let FramingError::StepTooLarge { can_id, .. } = &reason {
                    self.last_values.remove(can_id);
                }
                let discarded = self.buffer.pop_front()?;
                self.discarded += 1;
                Some(Alignment::Rejected {
                    discarded,
                    candidate,
                    reason,
                })
            }
        }
    }

    fn peek(&self) -> Option<RawFrame> {
        if self.buffer.len() < FRAME_LEN {
            return None;
        }
        let mut bytes = [0u8; FRAME_LEN];
        for (slot, byte) in bytes.iter_mut().zip(self.buffer.iter()) {
            *slot = *byte;
        }
        Some(RawFrame::new(bytes))
    }
}
