//! Interfaces of the external power-supply collaborators.
//!
//! The host power-supply framework, the upstream (USB) source, the optional
//! fuel gauge, the factory-line VBUS ADC and the host power-off hook all
//! live outside this crate; the dispatcher only ever sees these traits.

/// A collaborator was absent or refused the property query.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PropertyUnavailable;

/// Upstream (input) power source, e.g. the USB supply object.
pub trait UpstreamSupply {
    /// Maximum input current the source can deliver, mA.
    fn current_max_ma(&self) -> Result<u32, PropertyUnavailable>;
    /// Whether input power is physically present.
    fn present(&self) -> Result<bool, PropertyUnavailable>;
    /// Whether the source reports itself online.
    fn online(&self) -> Result<bool, PropertyUnavailable>;
}

/// Fuel-gauge properties passed through to the battery supply.
///
/// Units follow the power-supply convention: voltages in µV, currents in
/// µA, charge in µAh, temperatures in deci-degrees, capacity in percent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GaugeProperty {
    Capacity,
    CycleCount,
    VoltageMax,
    VoltageMinDesign,
    VoltageNow,
    VoltageAvg,
    VoltageOcv,
    ChargeFull,
    ChargeCounter,
    Temp,
    TempHotspot,
    CurrentNow,
    CurrentAvg,
}

/// External battery monitor (fuel gauge), resolved by the host by name.
/// The monitor is optional; callers tolerate its absence.
pub trait BatteryMonitor {
    fn property(&self, prop: GaugeProperty) -> Result<i32, PropertyUnavailable>;
}

/// The VBUS ADC sample could not be taken.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcError;

/// One-shot VBUS voltage sampling. Used only by the factory power-down.
pub trait VbusSense {
    fn vbus_uv(&mut self) -> Result<u32, AdcError>;
}

/// Host power-off hook. Used only by the factory power-down.
pub trait SystemPower {
    fn power_off(&mut self);
}
