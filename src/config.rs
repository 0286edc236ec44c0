//! Client configuration.

use crate::{
    clock::Millis,
    scaling::{Model, ScalingFactors},
};

/// Default Modbus address of the PSU.
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x01;

/// Waits and deadlines applied around each transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Minimum time between the end of one exchange and the next command.
    ///
    /// Commands sent sooner are not reliably served by the device.
    pub command_interval: Millis,
    /// How long to wait for a complete reply once a request has been sent.
    pub reply_deadline: Millis,
    /// Wait between installing a transport and the first refresh.
    pub connect_settle: Millis,
    /// How often to check the transport for reply bytes while waiting.
    pub poll_interval: Millis,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            command_interval: Millis::from_ticks(100),
            reply_deadline: Millis::from_ticks(1_000),
            connect_settle: Millis::from_ticks(60),
            poll_interval: Millis::from_ticks(5),
        }
    }
}

impl Timing {
    /// Default deadlines, but no settle waits.
    pub fn immediate() -> Self {
        Self {
            command_interval: Millis::from_ticks(0),
            connect_settle: Millis::from_ticks(0),
            ..Self::default()
        }
    }

    pub fn with_command_interval(mut self, interval: Millis) -> Self {
        self.command_interval = interval;
        self
    }

    pub fn with_reply_deadline(mut self, deadline: Millis) -> Self {
        self.reply_deadline = deadline;
        self
    }

    pub fn with_connect_settle(mut self, settle: Millis) -> Self {
        self.connect_settle = settle;
        self
    }

    pub fn with_poll_interval(mut self, interval: Millis) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Everything needed to talk to one PSU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Default for PSU is 0x01.
    pub device_address: u8,
    pub timing: Timing,
    pub scaling: ScalingFactors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_address: DEFAULT_DEVICE_ADDRESS,
            timing: Timing::default(),
            scaling: ScalingFactors::default(),
        }
    }
}

impl Config {
    /// Default configuration with the scaling of `model`.
    pub fn for_model(model: Model) -> Self {
        Self::default().with_scaling(model.scaling_factors())
    }

    pub fn with_device_address(mut self, address: u8) -> Self {
        self.device_address = address;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingFactors) -> Self {
        self.scaling = scaling;
        self
    }
}
