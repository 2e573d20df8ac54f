//! Public enums and driver error type.

use crate::power_supply::PropertyUnavailable;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Bus transaction failed (NACK or controller error).
    I2c(E),
    /// Bus transaction did not finish within the per-operation timeout.
    Timeout,
    /// Requested value lies below the lowest representable table step.
    OutOfRange,
    /// IC_INFO vendor code does not identify a Fairchild part.
    UnknownVendor(u8),
    /// A collaborator was absent or could not answer a property query.
    PropertyUnavailable,
}

impl<E> From<PropertyUnavailable> for Error<E> {
    fn from(_: PropertyUnavailable) -> Self {
        Error::PropertyUnavailable
    }
}

/// Charger state as reported to the battery supply.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeStatus {
    #[default]
    Unknown,
    Charging,
    Discharging,
    Full,
}

/// CONTROL0 fault vocabulary (3-bit field).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeFault {
    #[default]
    None,
    VbusOvp,
    SleepMode,
    PoorInput,
    BattOvp,
    ThermShutdown,
    TimerFault,
    NoBattery,
}

impl ChargeFault {
    /// Decode the CONTROL0 FAULT field (bits 2:0).
    pub const fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0x00 => Self::None,
            0x01 => Self::VbusOvp,
            0x02 => Self::SleepMode,
            0x03 => Self::PoorInput,
            0x04 => Self::BattOvp,
            0x05 => Self::ThermShutdown,
            0x06 => Self::TimerFault,
            _ => Self::NoBattery,
        }
    }
}

/// How the charger is currently delivering current.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeType {
    #[default]
    Unknown,
    None,
    /// Linear pre-charge below the weak-battery threshold.
    Trickle,
    /// Switched-mode constant-current charge.
    Fast,
}

/// Battery thermal condition, set by the external thermal policy.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BattHealth {
    #[default]
    Good,
    Overheat,
    Cold,
    Warm,
    Cool,
}

/// Battery chemistry reported to the host. This charger drives Li-ion packs.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Technology {
    #[default]
    LiIon,
}

/// Part number from IC_INFO bits 5:3.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PartNumber {
    Fan54040,
    Fan54041,
    Fan54042,
    Fan54045,
    Fan54046,
    Fan54047,
    Unknown,
}

impl PartNumber {
    /// Decode the PN field. The datasheet lists 54046 and 54047 under the
    /// same code; 7 is kept for parts that report it anyway.
    pub const fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0 => Self::Fan54040,
            1 => Self::Fan54041,
            2 => Self::Fan54042,
            5 => Self::Fan54045,
            6 => Self::Fan54046,
            7 => Self::Fan54047,
            _ => Self::Unknown,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Fan54040 => "fan54040",
            Self::Fan54041 => "fan54041",
            Self::Fan54042 => "fan54042",
            Self::Fan54045 => "fan54045",
            Self::Fan54046 => "fan54046",
            Self::Fan54047 => "fan54047",
            Self::Unknown => "unknown",
        }
    }
}
