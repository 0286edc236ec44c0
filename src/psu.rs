use embedded_io::{Read, ReadReady, Write};
use log::{debug, warn};
use strum::IntoEnumIterator;

use crate::{
    client::RegisterClient,
    clock::Clock,
    config::Config,
    error::{Contract, Error, Result, TransactionError, TransactionResult},
    registers::DpsRegister,
    scaling::ScalingFactors,
    types::{Freshness, RefreshStage, Snapshot, State},
};

/// A DPS power supply and the last known state read from it.
///
/// Getters such as [`Self::voltage_out`] only return cached values and never touch the
/// transport. The cache is updated by [`Self::refresh`] and by the setters, which write
/// to the device first.
///
/// Every method which talks to the device takes `&mut self`, so two transactions can
/// never be interleaved on the same connection. Share a `Dps` between threads by
/// wrapping it in a mutex.
pub struct Dps<S, C> {
    client: RegisterClient<S, C>,
    scaling: ScalingFactors,
    snapshot: Snapshot,
}

impl<S, C> Dps<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    /// Create an unconnected DPS with the default configuration.
    pub fn new(clock: C) -> Self {
        Self::with_config(clock, Config::default())
    }

    pub fn with_config(clock: C, config: Config) -> Self {
        Self {
            client: RegisterClient::new(clock, config.device_address, config.timing),
            scaling: config.scaling,
            snapshot: Snapshot::default(),
        }
    }

    /// Take ownership of an open transport and synchronise the cache with the device.
    ///
    /// If the initial refresh fails the transport stays connected, call
    /// [`Self::refresh`] again or [`Self::close`].
    pub fn connect(&mut self, interface: S) -> Result<(), S::Error> {
        self.client.connect(interface)?;
        let settle = self.client.timing().connect_settle;
        self.client.wait(settle);
        self.refresh()
    }

    /// Release the transport and hand it back.
    pub fn close(&mut self) -> Option<S> {
        self.client.close()
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Re-read every cached register from the device.
    ///
    /// Stages are applied as they are read. If one fails, the stages before it keep
    /// their new values, the snapshot is marked [`Freshness::Partial`] and
    /// [`Error::PartialRefresh`] is returned.
    pub fn refresh(&mut self) -> Result<(), S::Error> {
        if !self.client.is_connected() {
            return Err(Contract::NotConnected.into());
        }

        for stage in RefreshStage::iter() {
            let outcome = self
                .client
                .read_registers(stage.start_register(), stage.register_count())
                .and_then(|values| {
                    debug!("Refreshed {stage:?}: {values:?}");
                    self.snapshot
                        .apply(stage, &values, &self.scaling)
                        .map_err(TransactionError::from)
                });

            if let Err(cause) = outcome {
                warn!("Refresh stopped at {stage:?}: {cause}");
                self.snapshot.freshness = Freshness::Partial { failed: stage };
                return Err(Error::PartialRefresh {
                    failed: stage,
                    cause,
                });
            }
        }

        self.snapshot.freshness = Freshness::Fresh;
        Ok(())
    }

    /// Set the output target voltage in volts, then refresh the whole cache.
    ///
    /// The value is rounded to the nearest 10 mV step.
    pub fn set_voltage(&mut self, volts: f32) -> Result<(), S::Error> {
        let raw = self
            .scaling
            .volts_to_raw(volts)
            .ok_or(Contract::ValueOutOfRange)?;
        self.client.write_register(DpsRegister::USet, raw)?;
        // Output readings follow the new set-point, so everything is re-read.
        self.refresh()
    }

    /// Set the output current limit in amps, then refresh the whole cache.
    ///
    /// The value is rounded to the nearest 1 mA step.
    pub fn set_current(&mut self, amps: f32) -> Result<(), S::Error> {
        let raw = self
            .scaling
            .amps_to_raw(amps)
            .ok_or(Contract::ValueOutOfRange)?;
        self.client.write_register(DpsRegister::ISet, raw)?;
        self.refresh()
    }

    /// Enable/disable the output.
    ///
    /// Only the cached power state is updated, no other register changes with it.
    pub fn set_power_state(&mut self, state: impl Into<State>) -> Result<(), S::Error> {
        let state = state.into();
        let flag = u16::from(state);
        self.client.write_register(DpsRegister::OnOff, flag)?;
        self.snapshot.set_power_flag(flag);
        Ok(())
    }

    /// Flip the output based on the cached power state.
    ///
    /// On failure the cached state is left as it was.
    pub fn toggle_power_state(&mut self) -> Result<(), S::Error> {
        let next = !self.snapshot.power_state;
        self.set_power_state(next)
    }

    /// Read a register outside of the cached set. The cache is not touched.
    pub fn read_register_raw(
        &mut self,
        register: impl Into<u8>,
    ) -> TransactionResult<u16, S::Error> {
        self.client.read_register(register)
    }

    /// Write a raw value to any register. The cache is not touched, call
    /// [`Self::refresh`] afterwards if the write affects cached values.
    pub fn write_register_raw(
        &mut self,
        register: impl Into<u16>,
        value: u16,
    ) -> TransactionResult<(), S::Error> {
        self.client.write_register(register, value)
    }

    /// Copy of every cached value.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
    }

    pub fn freshness(&self) -> Freshness {
        self.snapshot.freshness
    }

    /// Cached target output voltage, volts.
    pub fn voltage_set(&self) -> f32 {
        self.snapshot.voltage_set
    }

    /// Cached output current limit, amps.
    pub fn current_set(&self) -> f32 {
        self.snapshot.current_set
    }

    /// Cached measured output voltage, volts.
    pub fn voltage_out(&self) -> f32 {
        self.snapshot.voltage_out
    }

    /// Cached measured output current, amps.
    pub fn current_out(&self) -> f32 {
        self.snapshot.current_out
    }

    /// Cached measured output power, watts.
    pub fn power_out(&self) -> f32 {
        self.snapshot.power_out
    }

    pub fn input_voltage(&self) -> f32 {
        self.snapshot.input_voltage
    }

    pub fn power_state(&self) -> State {
        self.snapshot.power_state
    }

    /// Cached power-on register as the device reported it.
    pub fn power_flag(&self) -> u16 {
        self.snapshot.power_flag
    }

    pub fn scaling(&self) -> &ScalingFactors {
        &self.scaling
    }
}
