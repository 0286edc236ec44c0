//! Scaling factors for different PSU models
//!
//! Registers hold raw integers. Dividing by the factor for the quantity gives the
//! physical value (volts, amps, watts). The DPS3005 reports voltages and power in
//! hundredths and currents in thousandths.

use strum_macros::EnumIter;

/// Scaling factors for converting raw register values to standard units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingFactors {
    /// Divisor for voltage values (100 means raw value is in centivolts)
    pub voltage_divisor: u16,
    /// Divisor for current values (1000 means raw value is in milliamps)
    pub current_divisor: u16,
    /// Divisor for output power values
    pub power_divisor: u16,
    /// Divisor for the input voltage value
    pub input_voltage_divisor: u16,
}

impl Default for ScalingFactors {
    fn default() -> Self {
        Self::DPS3005
    }
}

impl ScalingFactors {
    pub const DPS3005: ScalingFactors = ScalingFactors::new(100, 1000, 100, 1);

    /// Create a new `ScalingFactors` instance with the specified divisor values.
    pub const fn new(
        voltage_divisor: u16,
        current_divisor: u16,
        power_divisor: u16,
        input_voltage_divisor: u16,
    ) -> Self {
        Self {
            voltage_divisor,
            current_divisor,
            power_divisor,
            input_voltage_divisor,
        }
    }

    /// Convert raw voltage register value to volts
    #[inline]
    pub fn raw_to_volts(&self, raw: u16) -> f32 {
        scale_down(raw, self.voltage_divisor)
    }

    /// Convert volts to raw voltage register value, rounding to the nearest step.
    ///
    /// Returns `None` if the value is negative, NaN, or too large for the register.
    #[inline]
    pub fn volts_to_raw(&self, volts: f32) -> Option<u16> {
        scale_up(volts, self.voltage_divisor)
    }

    /// Convert raw current register value to amps
    #[inline]
    pub fn raw_to_amps(&self, raw: u16) -> f32 {
        scale_down(raw, self.current_divisor)
    }

    /// Convert amps to raw current register value, rounding to the nearest step.
    #[inline]
    pub fn amps_to_raw(&self, amps: f32) -> Option<u16> {
        scale_up(amps, self.current_divisor)
    }

    /// Convert raw power register value to watts
    #[inline]
    pub fn raw_to_watts(&self, raw: u16) -> f32 {
        scale_down(raw, self.power_divisor)
    }

    /// Convert raw input voltage register value to volts
    #[inline]
    pub fn raw_to_input_volts(&self, raw: u16) -> f32 {
        scale_down(raw, self.input_voltage_divisor)
    }
}

fn scale_down(raw: u16, divisor: u16) -> f32 {
    raw as f32 / divisor as f32
}

fn scale_up(value: f32, divisor: u16) -> Option<u16> {
    let scaled = value * divisor as f32;
    // Written so that NaN fails the check too.
    if !(scaled >= 0.0 && scaled <= u16::MAX as f32) {
        return None;
    }
    // Round half up, `f32::round` is not available without std.
    Some((scaled + 0.5) as u16)
}

/// Known members of the DPS family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Model {
    DPS3005,
    DPS5005,
    DPS5015,
    DPS5020,
    DPS8005,
}

impl Model {
    /// Get scaling factors for this product model
    ///
    /// The high current models report current in centiamps.
    pub const fn scaling_factors(&self) -> ScalingFactors {
        match self {
            Model::DPS3005 | Model::DPS5005 | Model::DPS8005 => ScalingFactors::DPS3005,
            Model::DPS5015 | Model::DPS5020 => ScalingFactors::new(100, 100, 100, 1),
        }
    }
}
