//! Shared channels and published state for the charge-manager tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::PubSubChannel;

use crate::power_supply::{BatteryMonitor, GaugeProperty};
use crate::types::{BattHealth, ChargeStatus, ChargeType, Technology};

/// Snapshot of every readable battery property, broadcast after each
/// dispatch round. Must be `Clone` to ride the PubSubChannel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryReadings {
    pub status: ChargeStatus,
    pub present: bool,
    pub charging_enabled: bool,
    pub charge_type: ChargeType,
    pub capacity_percent: u8,
    pub technology: Technology,
    pub health: BattHealth,
    /// Fuel-gauge pass-through block; `None` without a battery monitor.
    pub gauge: Option<GaugeReadings>,
}

/// Values passed through from the battery monitor, in power-supply units
/// (µV, µA, µAh, deci-degrees).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GaugeReadings {
    pub cycle_count: i32,
    pub voltage_max_uv: i32,
    pub voltage_min_design_uv: i32,
    pub voltage_now_uv: i32,
    pub voltage_avg_uv: i32,
    pub voltage_ocv_uv: i32,
    pub charge_full_uah: i32,
    pub charge_counter_uah: i32,
    pub temp_dc: i32,
    pub temp_hotspot_dc: i32,
    pub current_now_ua: i32,
    pub current_avg_ua: i32,
}

impl GaugeReadings {
    /// Collect every pass-through property. Properties the monitor cannot
    /// answer read as zero rather than poisoning the snapshot.
    pub fn collect<B: BatteryMonitor>(monitor: &B) -> Self {
        let get = |prop| monitor.property(prop).unwrap_or(0);
        Self {
            cycle_count: get(GaugeProperty::CycleCount),
            voltage_max_uv: get(GaugeProperty::VoltageMax),
            voltage_min_design_uv: get(GaugeProperty::VoltageMinDesign),
            voltage_now_uv: get(GaugeProperty::VoltageNow),
            voltage_avg_uv: get(GaugeProperty::VoltageAvg),
            voltage_ocv_uv: get(GaugeProperty::VoltageOcv),
            charge_full_uah: get(GaugeProperty::ChargeFull),
            charge_counter_uah: get(GaugeProperty::ChargeCounter),
            temp_dc: get(GaugeProperty::Temp),
            temp_hotspot_dc: get(GaugeProperty::TempHotspot),
            current_now_ua: get(GaugeProperty::CurrentNow),
            current_avg_ua: get(GaugeProperty::CurrentAvg),
        }
    }
}

/// The PubSubChannel for broadcasting battery readings.
///
/// Buffer of 2 messages, up to 3 subscribers, 1 publisher (the dispatcher).
pub static BATTERY_CHANNEL: PubSubChannel<CriticalSectionRawMutex, BatteryReadings, 2, 3, 1> =
    PubSubChannel::new();

/// Events consumed by the dispatcher task. Hardware edges, upstream power
/// notifications and host property writes all funnel through here, so all
/// register access stays on one execution path.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerEvent {
    /// Edge on the chip's STAT interrupt line.
    StatInterrupt,
    /// The upstream power source changed presence.
    ExternalPowerChanged,
    /// Republish current properties immediately.
    Republish,
    /// Test override of the reported capacity, percent.
    SetFakeCapacity(u8),
    /// Thermal-policy verdict for the battery.
    SetHealth(BattHealth),
    /// Accepted for interface compatibility; currently inert.
    SetChargingEnabled(bool),
}

/// The PubSubChannel feeding events to the dispatcher.
pub static CHARGER_EVENT_CHANNEL: PubSubChannel<CriticalSectionRawMutex, ChargerEvent, 2, 1, 3> =
    PubSubChannel::new();
