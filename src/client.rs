//! Main [`PPump`] client implementation.
//!
//! This module provides the high-level [`PPump`] client that combines the
//! transport, event handling and register commands into pump operations.
//! Every state change is written, then read back, and repeated until the pump
//! confirms it or the attempt budget runs out.

use std::time::Duration;

use crate::commands::CommandHandler;
use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher, Subscription};
use crate::protocol::{BROADCAST_TARGET, Register, RunCommand};
use crate::transport::link::{DEFAULT_COMMAND_DELAY, DEFAULT_READ_TIMEOUT};
use crate::transport::{Link, LinkConfig, SerialConfig, SerialTransport, Transport};
use crate::types::sensor::TENTHS;
use crate::types::{ControlType, ErrorCode, Pressures, PumpMode, SensorDescriptor, Temperatures};
use crate::units::{FlowUnit, HoldDuration};

/// Default number of write-then-confirm attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Default interval between mode polls while taring.
pub const DEFAULT_TARE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a [`PPump`].
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Label used in log lines.
    pub name: String,
    /// Target id stamped into every frame (0 addresses every pump).
    pub pump_id: u8,
    /// Time to wait for each reply frame.
    pub read_timeout: Duration,
    /// Pause after each write before reading.
    pub command_delay: Duration,
    /// Write-then-confirm attempts before giving up.
    pub max_attempts: u32,
    /// Interval between mode polls while taring.
    pub tare_poll_interval: Duration,
    /// Reject replies with a bad checksum.
    pub verify_checksums: bool,
}

impl PumpConfig {
    /// Creates a configuration with default timings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the target id.
    #[must_use]
    pub const fn pump_id(mut self, id: u8) -> Self {
        self.pump_id = id;
        self
    }

    /// Sets the reply timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the pause after each write.
    #[must_use]
    pub const fn command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    /// Sets the attempt budget of the confirmation loops.
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the tare poll interval.
    #[must_use]
    pub const fn tare_poll_interval(mut self, interval: Duration) -> Self {
        self.tare_poll_interval = interval;
        self
    }

    /// Enables or disables reply checksum verification.
    #[must_use]
    pub const fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    const fn link_config(&self) -> LinkConfig {
        LinkConfig {
            read_timeout: self.read_timeout,
            command_delay: self.command_delay,
            verify_checksums: self.verify_checksums,
        }
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            name: "P-Pump".into(),
            pump_id: BROADCAST_TARGET,
            read_timeout: DEFAULT_READ_TIMEOUT,
            command_delay: DEFAULT_COMMAND_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            tare_poll_interval: DEFAULT_TARE_POLL_INTERVAL,
            verify_checksums: true,
        }
    }
}

/// State a confirmation read must observe.
#[derive(Debug, Clone, Copy)]
enum Desired {
    Mode(PumpMode),
    ControlType(ControlType),
    Target(i32),
}

/// Client for one P-Pump.
pub struct PPump<T> {
    config: PumpConfig,
    dispatcher: EventDispatcher,
    commands: CommandHandler<T>,
}

impl PPump<SerialTransport> {
    /// Creates a new client for a serial port.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0")
    ///
    /// # Returns
    ///
    /// A new client (not yet connected).
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        Self::with_serial_config(SerialConfig::new(port), PumpConfig::default())
    }

    /// Creates a new client with custom serial and pump configuration.
    #[must_use]
    pub fn with_serial_config(serial: SerialConfig, config: PumpConfig) -> Self {
        Self::new(SerialTransport::new(serial), config)
    }
}

impl<T: Transport> PPump<T> {
    /// Creates a new client over the given transport.
    #[must_use]
    pub fn new(transport: T, config: PumpConfig) -> Self {
        let dispatcher = EventDispatcher::default();
        let link = Link::new(transport, config.link_config());
        let commands = CommandHandler::new(link, dispatcher.clone(), config.pump_id);
        Self {
            config,
            dispatcher,
            commands,
        }
    }

    /// Opens the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened.
    pub async fn connect(&mut self) -> Result<()> {
        self.commands.link_mut().transport_mut().connect().await?;
        tracing::info!("{}: connected", self.config.name);
        self.dispatcher.dispatch(Event::Connected);
        Ok(())
    }

    /// Closes the transport. The pump keeps its current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to close.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.commands.link_mut().transport_mut().disconnect().await?;
        self.dispatcher.dispatch(Event::Disconnected);
        Ok(())
    }

    /// Returns true if the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.commands.link().transport().is_connected()
    }

    /// Returns the pump label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PumpConfig {
        &self.config
    }

    /// Subscribes to events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.dispatcher.subscribe()
    }

    // ========== Status ==========

    /// Reads the operating mode.
    ///
    /// If the pump reports [`PumpMode::Error`], the fault code is read, the
    /// pump is told to go idle once and the fault is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if the pump is in error mode, or any
    /// exchange error.
    pub async fn get_mode(&mut self) -> Result<PumpMode> {
        let value = self.commands.read_register(Register::Mode).await?;
        let mode = PumpMode::from_value(value).ok_or(Error::InvalidRegisterValue {
            register: Register::Mode,
            value,
        })?;
        if mode != PumpMode::Error {
            return Ok(mode);
        }

        let code = ErrorCode::from_value(self.commands.read_register(Register::ErrorCode).await?);
        self.dispatcher.dispatch(Event::DeviceFault(code));

        tracing::warn!("{}: pump error encountered: {}", self.config.name, code);
        self.force_idle().await;
        Err(Error::Device { code })
    }

    /// Writes the idle command once, without confirmation.
    ///
    /// Used on failure paths, so a failed write is only logged.
    async fn force_idle(&mut self) {
        match self.commands.run(RunCommand::Idle).await {
            Ok(()) => tracing::warn!("{}: pump set to idle", self.config.name),
            Err(e) => tracing::warn!("{}: failed to set pump idle: {}", self.config.name, e),
        }
        self.dispatcher.dispatch(Event::ForcedIdle);
    }

    /// Reads whether the pump controls pressure or flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the value is out of range.
    pub async fn get_control_type(&mut self) -> Result<ControlType> {
        let value = self.commands.read_register(Register::ControlType).await?;
        ControlType::from_value(value).ok_or(Error::InvalidRegisterValue {
            register: Register::ControlType,
            value,
        })
    }

    /// Reads the current target, pl/s in flow control or mbar gauge in
    /// pressure control.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub async fn get_target(&mut self) -> Result<i64> {
        let value = self.commands.read_register(Register::Target).await?;
        Ok(i64::from(value as i32))
    }

    /// Identifies the attached flow sensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub async fn get_sensor(&mut self) -> Result<SensorDescriptor> {
        let value = self.commands.read_register(Register::SensorId).await?;
        Ok(SensorDescriptor::from_value(value))
    }

    /// Reads the three pressure sensor temperatures.
    ///
    /// # Errors
    ///
    /// Returns an error if any exchange fails.
    pub async fn get_temperatures(&mut self) -> Result<Temperatures> {
        Ok(Temperatures {
            atmospheric: self.read_signed(Register::AtmosphericTemperature).await? / TENTHS,
            supply: self.read_signed(Register::SupplyTemperature).await? / TENTHS,
            chamber: self.read_signed(Register::ChamberTemperature).await? / TENTHS,
        })
    }

    /// Reads the three pressure sensors.
    ///
    /// # Errors
    ///
    /// Returns an error if any exchange fails.
    pub async fn get_pressures(&mut self) -> Result<Pressures> {
        Ok(Pressures {
            atmospheric_mbar: self.read_signed(Register::AtmosphericPressure).await? / TENTHS,
            supply_mbar: self.read_signed(Register::SupplyPressure).await?,
            chamber_mbar: self.read_signed(Register::ChamberPressure).await?,
        })
    }

    async fn read_signed(&mut self, register: Register) -> Result<f64> {
        let value = self.commands.read_register(register).await?;
        Ok(f64::from(value as i32))
    }

    // ========== State changes ==========

    /// Stops pumping and vents the chamber.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Convergence`] if the pump never reports idle.
    pub async fn set_idle(&mut self) -> Result<()> {
        self.converge(
            "set pump to idle",
            Register::RunCommand,
            RunCommand::Idle.into(),
            Desired::Mode(PumpMode::Idle),
        )
        .await
    }

    /// Enters control mode, pumping towards the current target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if the pump faults, or
    /// [`Error::Convergence`] if it never reports control mode.
    pub async fn start_flow(&mut self) -> Result<()> {
        self.converge(
            "set pump to control mode",
            Register::RunCommand,
            RunCommand::Control.into(),
            Desired::Mode(PumpMode::Control),
        )
        .await
    }

    /// Sets the target, pl/s in flow control or mbar gauge in pressure
    /// control.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Convergence`] if the pump never reports the target.
    pub async fn set_target(&mut self, target: i32) -> Result<()> {
        self.converge(
            "set target flow/pressure",
            Register::Target,
            target,
            Desired::Target(target),
        )
        .await
    }

    /// Selects flow control. Does not start pumping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Convergence`] if the pump never reports flow control.
    pub async fn set_flow_control(&mut self) -> Result<()> {
        self.converge(
            "set pump to flow control",
            Register::ControlType,
            ControlType::Flow.into(),
            Desired::ControlType(ControlType::Flow),
        )
        .await
    }

    /// Selects pressure control. Does not start pumping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Convergence`] if the pump never reports pressure
    /// control.
    pub async fn set_pressure_control(&mut self) -> Result<()> {
        self.converge(
            "set pump to pressure control",
            Register::ControlType,
            ControlType::Pressure.into(),
            Desired::ControlType(ControlType::Pressure),
        )
        .await
    }

    /// Runs the confirmation loop and, on exhaustion, forces the pump idle
    /// before failing.
    async fn converge(
        &mut self,
        operation: &'static str,
        register: Register,
        value: i32,
        desired: Desired,
    ) -> Result<()> {
        match self.attempt_loop(operation, register, value, desired).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            // get_mode already sent the pump idle
            Err(e @ Error::Device { .. }) => return Err(e),
            Err(e) => {
                tracing::error!("{}: could not {}: {}", self.config.name, operation, e);
                self.force_idle().await;
                return Err(e);
            }
        }

        let attempts = self.config.max_attempts;
        tracing::error!(
            "{}: could not {} after {} attempts, checking for errors",
            self.config.name,
            operation,
            attempts
        );

        if !matches!(desired, Desired::Mode(PumpMode::Idle)) {
            match self
                .attempt_loop(
                    "set pump to idle",
                    Register::RunCommand,
                    RunCommand::Idle.into(),
                    Desired::Mode(PumpMode::Idle),
                )
                .await
            {
                Ok(true) => {}
                Ok(false) => tracing::warn!("{}: pump did not confirm idle", self.config.name),
                Err(e @ Error::Device { .. }) => return Err(e),
                Err(e) => tracing::warn!("{}: forced idle failed: {}", self.config.name, e),
            }
            self.dispatcher.dispatch(Event::ForcedIdle);
        }

        match self.get_mode().await {
            Ok(PumpMode::Idle) => tracing::info!("{}: no pump errors", self.config.name),
            Ok(mode) => tracing::warn!("{}: pump left in {} mode", self.config.name, mode),
            Err(e @ Error::Device { .. }) => return Err(e),
            Err(e) => tracing::warn!("{}: mode check failed: {}", self.config.name, e),
        }

        Err(Error::Convergence {
            operation,
            attempts,
        })
    }

    /// Writes `value` and reads back until `desired` is observed.
    ///
    /// Returns `false` once every attempt has been spent.
    async fn attempt_loop(
        &mut self,
        operation: &'static str,
        register: Register,
        value: i32,
        desired: Desired,
    ) -> Result<bool> {
        for attempt in 1..=self.config.max_attempts {
            self.commands.write_register(register, value).await?;
            if self.confirm(desired).await? {
                tracing::info!("{}: {}", self.config.name, operation);
                self.dispatcher.dispatch(Event::StateConfirmed {
                    operation,
                    attempts: attempt,
                });
                return Ok(true);
            }

            tracing::warn!(
                "{}: {} not confirmed (attempt {} of {})",
                self.config.name,
                operation,
                attempt,
                self.config.max_attempts
            );
            if attempt < self.config.max_attempts {
                self.dispatcher
                    .dispatch(Event::RetryScheduled { operation, attempt });
            }
        }
        Ok(false)
    }

    async fn confirm(&mut self, desired: Desired) -> Result<bool> {
        Ok(match desired {
            Desired::Mode(mode) => self.get_mode().await? == mode,
            Desired::ControlType(kind) => {
                let value = self.commands.read_register(Register::ControlType).await?;
                ControlType::from_value(value) == Some(kind)
            }
            Desired::Target(target) => self.get_target().await? == i64::from(target),
        })
    }

    // ========== Operations ==========

    /// Tares the pump against atmospheric pressure.
    ///
    /// The supply must be disconnected and the chamber open. Polls the mode
    /// until the pump is idle again, which usually takes about 15 seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if the tare fails (e.g. supply still
    /// connected), or any exchange error.
    pub async fn tare(&mut self) -> Result<()> {
        self.commands.run(RunCommand::Tare).await?;
        tracing::info!("{}: performing tare", self.config.name);
        self.dispatcher.dispatch(Event::TareStarted);

        loop {
            tokio::time::sleep(self.config.tare_poll_interval).await;
            let mode = self.get_mode().await?;
            tracing::debug!("{}: tare poll, mode {}", self.config.name, mode);
            if mode == PumpMode::Idle {
                break;
            }
        }

        tracing::info!("{}: tare finished", self.config.name);
        self.dispatcher.dispatch(Event::TareFinished);
        Ok(())
    }

    /// Pumps at `speed` in `unit` for `hold` (`dd:hh:mm:ss`).
    ///
    /// A hold of `00:00:00:00` starts the flow and returns immediately;
    /// otherwise this waits out the hold and sets the pump idle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUnit`] or [`Error::InvalidDuration`] before
    /// anything is sent, or any error of the underlying operations.
    pub async fn set_flow(&mut self, speed: f64, unit: &str, hold: &str) -> Result<()> {
        let unit: FlowUnit = unit.parse()?;
        let hold: HoldDuration = hold.parse()?;
        self.set_flow_with(speed, unit, hold).await
    }

    /// Typed form of [`PPump::set_flow`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetOutOfRange`] before anything is sent, or any
    /// error of the underlying operations.
    pub async fn set_flow_with(
        &mut self,
        speed: f64,
        unit: FlowUnit,
        hold: HoldDuration,
    ) -> Result<()> {
        let target = unit.to_picoliters_per_second(speed)?;
        tracing::debug!(
            "{}: flow {} {} is {} pl/s",
            self.config.name,
            speed,
            unit,
            target
        );

        self.set_flow_control().await?;
        self.set_target(target).await?;
        self.start_flow().await?;
        self.hold(hold).await
    }

    /// Holds `pressure` (mbar gauge) for `hold` (`dd:hh:mm:ss`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDuration`] before anything is sent, or any
    /// error of the underlying operations.
    pub async fn set_pressure(&mut self, pressure: i32, hold: &str) -> Result<()> {
        let hold: HoldDuration = hold.parse()?;
        self.set_pressure_with(pressure, hold).await
    }

    /// Typed form of [`PPump::set_pressure`].
    ///
    /// The target is written once without a confirmation loop.
    ///
    /// # Errors
    ///
    /// Returns any error of the underlying operations.
    pub async fn set_pressure_with(&mut self, pressure: i32, hold: HoldDuration) -> Result<()> {
        self.set_pressure_control().await?;
        if let Err(e) = self
            .commands
            .write_register(Register::Target, pressure)
            .await
        {
            tracing::error!("{}: could not set target pressure: {}", self.config.name, e);
            self.force_idle().await;
            return Err(e);
        }
        self.start_flow().await?;
        self.hold(hold).await
    }

    async fn hold(&mut self, hold: HoldDuration) -> Result<()> {
        let Some(duration) = hold.duration() else {
            tracing::info!("{}: started with indefinite hold", self.config.name);
            return Ok(());
        };

        tracing::info!("{}: will pump for {}", self.config.name, hold);
        self.dispatcher.dispatch(Event::HoldStarted(duration));
        tokio::time::sleep(duration).await;
        tracing::info!("{}: pumped for {}", self.config.name, hold);
        self.dispatcher.dispatch(Event::HoldFinished);
        self.set_idle().await
    }
}
