//! This module is used to define the registers on the DPS PSUs.
//!
//! The map is fixed, there is no way to discover it from the device.

use strum_macros::EnumIter;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
#[repr(u8)]
pub enum DpsRegister {
    /// __R/W__ - Voltage setting.
    ///
    /// Value is u16 in centi-volts. E.g. 5.0V => `500`.
    USet = 0x00,
    /// __R/W__ - Current setting.
    ///
    /// Value is u16 in milli-amps. E.g. 1.5A => `1500`.
    ISet = 0x01,
    /// __R__ - Output voltage display value, centi-volts.
    UOut = 0x02,
    /// __R__ - Output current display value, milli-amps.
    IOut = 0x03,
    /// __R__ - Output power display value, centi-watts.
    Power = 0x04,
    /// __R__ - Input voltage display value.
    UIn = 0x05,
    /// __R/W__ - Switched output.
    /// * `0` - Output off.
    /// * `1` - Output on.
    OnOff = 0x09,
}

impl From<DpsRegister> for u8 {
    fn from(value: DpsRegister) -> Self {
        value as u8
    }
}

impl From<DpsRegister> for u16 {
    fn from(value: DpsRegister) -> Self {
        value as u16
    }
}
