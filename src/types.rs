//! This module contains the types making up the cached device state.

use core::ops::Not;

use log::warn;
use strum_macros::{EnumCount, EnumIter};

use crate::{error::ReplyFault, registers::DpsRegister, scaling::ScalingFactors};

/// Used to be less ambiguous and whether something is on or off.
#[repr(u16)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Disabled.
    #[default]
    Off = 0x00,
    /// Enabled.
    On = 0x01,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

impl From<State> for u16 {
    fn from(value: State) -> Self {
        value as u16
    }
}

impl From<u16> for State {
    /// Any non-zero register value counts as on. The raw value is kept in
    /// [`Snapshot::power_flag`].
    fn from(value: u16) -> Self {
        State::from(value != 0)
    }
}

impl Not for State {
    type Output = State;

    fn not(self) -> Self::Output {
        match self {
            State::Off => State::On,
            State::On => State::Off,
        }
    }
}

/// One read of the refresh cycle, in the order they are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCount)]
pub enum RefreshStage {
    /// Voltage and current set-points.
    SetPoints,
    /// Measured output voltage and current.
    Output,
    /// Output power and input voltage.
    PowerInput,
    /// Output on/off.
    PowerState,
}

impl RefreshStage {
    pub const fn start_register(self) -> DpsRegister {
        match self {
            RefreshStage::SetPoints => DpsRegister::USet,
            RefreshStage::Output => DpsRegister::UOut,
            RefreshStage::PowerInput => DpsRegister::Power,
            RefreshStage::PowerState => DpsRegister::OnOff,
        }
    }

    pub const fn register_count(self) -> usize {
        match self {
            RefreshStage::PowerState => 1,
            _ => 2,
        }
    }
}

/// How the cached snapshot relates to the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Freshness {
    /// Nothing has been read from the device yet.
    #[default]
    Unsynced,
    /// The last refresh completed every stage.
    Fresh,
    /// The last refresh stopped at `failed`. Earlier stages hold values from that
    /// refresh, `failed` and later stages hold older values.
    Partial { failed: RefreshStage },
}

/// Last known state of the device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    /// Target output voltage, volts.
    pub voltage_set: f32,
    /// Output current limit, amps.
    pub current_set: f32,
    /// Measured output voltage, volts.
    pub voltage_out: f32,
    /// Measured output current, amps.
    pub current_out: f32,
    /// Measured output power, watts.
    pub power_out: f32,
    /// Measured input voltage.
    pub input_voltage: f32,
    pub power_state: State,
    /// Power-on register exactly as the device reported it, normally 0 or 1.
    pub power_flag: u16,
    pub freshness: Freshness,
}

impl Snapshot {
    /// Overwrite the fields belonging to `stage` with freshly read raw values.
    ///
    /// Nothing is changed if `values` does not hold exactly the registers of `stage`.
    pub(crate) fn apply(
        &mut self,
        stage: RefreshStage,
        values: &[u16],
        scaling: &ScalingFactors,
    ) -> Result<(), ReplyFault> {
        match (stage, values) {
            (RefreshStage::SetPoints, &[voltage, current]) => {
                self.voltage_set = scaling.raw_to_volts(voltage);
                self.current_set = scaling.raw_to_amps(current);
            }
            (RefreshStage::Output, &[voltage, current]) => {
                self.voltage_out = scaling.raw_to_volts(voltage);
                self.current_out = scaling.raw_to_amps(current);
            }
            (RefreshStage::PowerInput, &[power, input]) => {
                self.power_out = scaling.raw_to_watts(power);
                self.input_voltage = scaling.raw_to_input_volts(input);
            }
            (RefreshStage::PowerState, &[flag]) => self.set_power_flag(flag),
            _ => {
                return Err(ReplyFault::ByteCountMismatch {
                    expected: 2 * stage.register_count(),
                    received: 2 * values.len(),
                });
            }
        }
        Ok(())
    }

    /// Record the raw power-on register and the state derived from it.
    pub(crate) fn set_power_flag(&mut self, flag: u16) {
        if flag > 1 {
            warn!("Unexpected power flag {flag}, treating it as on");
        }
        self.power_flag = flag;
        self.power_state = State::from(flag);
    }
}
