//! Scripted pump simulator for tests.
//!
//! [`MockTransport`] answers frames the way a P-Pump does, from an in-memory
//! register file, and records every frame with the (tokio) time it crossed
//! the link. Use the paired [`SimHandle`] to script faults and inspect the log.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::time::Instant;

use crate::error::{Error, FrameError, Result};
use crate::protocol::{FRAME_LEN, Frame, MessageType, Register, RunCommand, SYNC_BYTE};
use crate::transport::Transport;

const MODE_IDLE: u32 = 0;
const MODE_CONTROL: u32 = 1;
const MODE_TARING: u32 = 2;
const MODE_ERROR: u32 = 3;

/// Which way a frame travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    ToPump,
    FromPump,
}

/// One frame on the link.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Record {
    pub at: Instant,
    pub direction: Direction,
    pub frame: Frame,
}

#[derive(Default)]
struct PumpSim {
    registers: HashMap<u8, u32>,
    ignored: HashSet<u8>,
    fault: Option<u32>,
    tare_polls: u32,
    taring_for: Option<u32>,
    reject_writes: Option<u8>,
    rejected: HashMap<u8, u8>,
    silent: bool,
    corrupt_next: bool,
    rx: VecDeque<u8>,
    log: Vec<Record>,
}

impl PumpSim {
    fn reply(&mut self, kind: u8, byte3: u8, location: u8, value: u32) {
        let v = value.to_be_bytes();
        let frame = Frame::from_payload([
            SYNC_BYTE, 0, kind, byte3, location, 0, 0, v[0], v[1], v[2], v[3],
        ]);
        let mut bytes = *frame.as_bytes();
        if std::mem::take(&mut self.corrupt_next) {
            bytes[FRAME_LEN - 1] ^= 0xff;
        }
        self.rx.extend(bytes);
    }

    fn mode(&mut self) -> u32 {
        if self.fault.is_some() {
            return MODE_ERROR;
        }
        if let Some(remaining) = self.taring_for {
            if remaining == 0 {
                self.taring_for = None;
                self.registers.insert(Register::Mode.address(), MODE_IDLE);
            } else {
                self.taring_for = Some(remaining - 1);
            }
        }
        self.registers
            .get(&Register::Mode.address())
            .copied()
            .unwrap_or(MODE_IDLE)
    }

    fn write(&mut self, location: u8, value: u32) {
        if self.ignored.contains(&location) {
            return;
        }
        if location == Register::RunCommand.address() {
            let mode = match value as i32 {
                v if v == i32::from(RunCommand::Idle) => {
                    self.fault = None;
                    self.taring_for = None;
                    MODE_IDLE
                }
                v if v == i32::from(RunCommand::Control) => MODE_CONTROL,
                v if v == i32::from(RunCommand::Tare) => {
                    self.taring_for = Some(self.tare_polls);
                    MODE_TARING
                }
                _ => return,
            };
            self.registers.insert(Register::Mode.address(), mode);
        }
        self.registers.insert(location, value);
    }

    fn handle(&mut self, frame: Frame) {
        if self.silent {
            return;
        }
        let location = frame.location();
        match MessageType::from_byte(frame.message_type()) {
            Some(MessageType::Write) => {
                let rejected = self.rejected.get(&location).copied();
                if let Some(reason) = self.reject_writes.or(rejected) {
                    self.reply(0x03, reason, location, 0);
                    return;
                }
                self.write(location, frame.raw_value());
                self.reply(0x02, 0, location, 0);
            }
            Some(MessageType::Read) => {
                let value = if location == Register::Mode.address() {
                    self.mode()
                } else if location == Register::ErrorCode.address() {
                    self.fault.unwrap_or(0)
                } else {
                    self.registers.get(&location).copied().unwrap_or(0)
                };
                self.reply(0x01, 0, location, value);
            }
            _ => self.reply(0x03, 2, location, 0),
        }
    }
}

/// Test handle onto the simulator behind a [`MockTransport`].
#[derive(Clone)]
pub(crate) struct SimHandle(Arc<Mutex<PumpSim>>);

impl SimHandle {
    fn lock(&self) -> MutexGuard<'_, PumpSim> {
        self.0.lock().unwrap()
    }

    /// Presets a register value.
    pub fn set_register(&self, register: Register, value: u32) {
        self.lock().registers.insert(register.address(), value);
    }

    /// Acknowledges writes to `register` without applying them.
    pub fn ignore_writes(&self, register: Register) {
        self.lock().ignored.insert(register.address());
    }

    /// Puts the pump in error mode with `code` until it is set idle.
    pub fn raise_fault(&self, code: u32) {
        self.lock().fault = Some(code);
    }

    /// Number of mode reads that still report taring after a tare command.
    pub fn set_tare_polls(&self, polls: u32) {
        self.lock().tare_polls = polls;
    }

    /// Answers every write with an error frame carrying `reason`.
    pub fn reject_writes(&self, reason: u8) {
        self.lock().reject_writes = Some(reason);
    }

    /// Answers writes to `register` with an error frame carrying `reason`.
    pub fn reject_writes_to(&self, register: Register, reason: u8) {
        self.lock().rejected.insert(register.address(), reason);
    }

    /// Stops answering entirely.
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    /// Corrupts the checksum of the next reply.
    pub fn corrupt_next_reply(&self) {
        self.lock().corrupt_next = true;
    }

    /// Queues bytes as if left over from an earlier exchange.
    pub fn push_stale(&self, bytes: &[u8]) {
        self.lock().rx.extend(bytes);
    }

    /// Queues raw bytes as the pump's next output.
    pub fn push_reply(&self, bytes: &[u8]) {
        self.lock().rx.extend(bytes);
    }

    /// Every frame that crossed the link, in order.
    pub fn log(&self) -> Vec<Record> {
        self.lock().log.clone()
    }

    /// Frames sent to the pump.
    pub fn sent(&self) -> Vec<Frame> {
        self.log()
            .into_iter()
            .filter(|r| r.direction == Direction::ToPump)
            .map(|r| r.frame)
            .collect()
    }

    /// Values written to `register`, in order.
    pub fn writes_to(&self, register: Register) -> Vec<i32> {
        self.sent()
            .into_iter()
            .filter(|f| {
                f.message_type() == u8::from(MessageType::Write)
                    && f.location() == register.address()
            })
            .map(|f| f.value())
            .collect()
    }

    /// Number of read requests for `register`.
    pub fn reads_of(&self, register: Register) -> usize {
        self.sent()
            .into_iter()
            .filter(|f| {
                f.message_type() == u8::from(MessageType::Read)
                    && f.location() == register.address()
            })
            .count()
    }
}

/// In-memory [`Transport`] backed by the simulator.
pub(crate) struct MockTransport {
    sim: SimHandle,
    connected: bool,
}

impl MockTransport {
    pub fn new() -> (Self, SimHandle) {
        let sim = SimHandle(Arc::new(Mutex::new(PumpSim::default())));
        (
            Self {
                sim: sim.clone(),
                connected: true,
            },
            sim,
        )
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.connected = false;
            Ok(())
        })
    }

    fn discard_input(&mut self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let mut sim = self.sim.lock();
            let dropped = sim.rx.len();
            sim.rx.clear();
            Ok(dropped)
        })
    }

    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if !self.connected {
                return Err(Error::NotConnected);
            }
            let frame = Frame::parse(&data)?;
            let mut sim = self.sim.lock();
            sim.log.push(Record {
                at: Instant::now(),
                direction: Direction::ToPump,
                frame,
            });
            sim.handle(frame);
            Ok(())
        })
    }

    fn receive(&mut self, len: usize, timeout: Duration) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            let available = self.sim.lock().rx.len();
            if available == 0 {
                tokio::time::sleep(timeout).await;
                return Err(Error::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }

            let mut sim = self.sim.lock();
            let take = available.min(len);
            let bytes: Vec<u8> = sim.rx.drain(..take).collect();
            if take < len {
                return Err(FrameError::Incomplete {
                    expected: len,
                    got: take,
                }
                .into());
            }
            if len == FRAME_LEN {
                if let Ok(frame) = Frame::parse(&bytes) {
                    sim.log.push(Record {
                        at: Instant::now(),
                        direction: Direction::FromPump,
                        frame,
                    });
                }
            }
            Ok(Bytes::from(bytes))
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
