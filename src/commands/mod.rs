//! Register-level commands.
//!
//! This module turns register reads and writes into frame exchanges and
//! checks that the pump answered with the expected kind of frame.

use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher};
use crate::protocol::{Frame, MessageType, Register, ResponseOutcome, RunCommand, interpret};
use crate::transport::{Link, Transport};

/// Command handler for register operations.
pub struct CommandHandler<T> {
    link: Link<T>,
    dispatcher: EventDispatcher,
    pump_id: u8,
}

impl<T: Transport> CommandHandler<T> {
    /// Creates a new command handler addressing `pump_id` (0 for every pump).
    #[must_use]
    pub const fn new(link: Link<T>, dispatcher: EventDispatcher, pump_id: u8) -> Self {
        Self {
            link,
            dispatcher,
            pump_id,
        }
    }

    /// Target id stamped into outgoing frames.
    #[must_use]
    pub const fn pump_id(&self) -> u8 {
        self.pump_id
    }

    /// Returns the link.
    #[must_use]
    pub const fn link(&self) -> &Link<T> {
        &self.link
    }

    /// Returns the link mutably.
    pub fn link_mut(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    /// Sends a frame and reads the pump's reply, publishing both.
    ///
    /// A frame is only reported as sent once the transport accepted it.
    async fn exchange(&mut self, frame: &Frame) -> Result<(Frame, ResponseOutcome)> {
        self.link.send(frame).await?;
        self.dispatcher.dispatch(Event::FrameSent(*frame));

        let timeout = self.link.config().read_timeout;
        let reply = self.link.read(timeout).await?;
        Ok(self.publish(reply))
    }

    fn publish(&self, frame: Frame) -> (Frame, ResponseOutcome) {
        let outcome = interpret(&frame);
        tracing::debug!("pump response: {}", outcome);
        self.dispatcher.dispatch(Event::Response { frame, outcome });
        (frame, outcome)
    }

    /// Writes `value` to `register` and waits for the acknowledgment.
    pub async fn write_register(&mut self, register: Register, value: i32) -> Result<()> {
        let frame = Frame::build(MessageType::Write, register.address(), value, self.pump_id);
        tracing::debug!("write {:?} = {}", register, value);

        let (_, outcome) = self.exchange(&frame).await?;
        match outcome {
            ResponseOutcome::Ack => Ok(()),
            ResponseOutcome::ProtocolError(reason) => {
                tracing::warn!("pump rejected write to {:?}: {}", register, reason);
                Err(Error::Protocol(reason))
            }
            other => Err(Error::UnexpectedResponse {
                expected: "ack",
                outcome: other,
            }),
        }
    }

    /// Reads the raw 32-bit value of `register`.
    pub async fn read_register(&mut self, register: Register) -> Result<u32> {
        let frame = Frame::build(MessageType::Read, register.address(), 0, self.pump_id);
        let (reply, outcome) = self.exchange(&frame).await?;

        match outcome {
            ResponseOutcome::ReadValue(value) => {
                if reply.location() != register.address() {
                    tracing::warn!(
                        "read of {:?} answered for location {}",
                        register,
                        reply.location()
                    );
                }
                tracing::debug!("read {:?} = {}", register, value);
                Ok(value)
            }
            ResponseOutcome::ProtocolError(reason) => Err(Error::Protocol(reason)),
            other => Err(Error::UnexpectedResponse {
                expected: "read value",
                outcome: other,
            }),
        }
    }

    /// Writes a run command (register 78).
    pub async fn run(&mut self, command: RunCommand) -> Result<()> {
        self.write_register(Register::RunCommand, command.into())
            .await
    }
}
