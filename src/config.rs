//! Compile-time knobs for the charge manager.
//! Edit these constants and rebuild.
use embassy_time::Duration;

/// Republish period of the dispatcher heartbeat. Also the reason the chip's
/// own T32 safety timer can stay disabled.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// Fast-charge current programmed at every charge start, mA.
pub const FAST_CHARGE_CURRENT_MA: u16 = 1550;

/// Output regulation voltage programmed at every charge start, mV.
pub const CHARGE_REGULATION_MV: u16 = 4350;

/// Capacity reported when no battery monitor is registered, percent.
pub const DEFAULT_BATT_CAPACITY: u8 = 50;

/// VBUS level below which the factory power-down proceeds, µV.
pub const VBUS_OFF_THRESHOLD_UV: u32 = 2_000_000;

/// Sampling interval of the factory VBUS poll.
pub const FACTORY_VBUS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on the factory VBUS poll; power-down proceeds on expiry.
pub const FACTORY_VBUS_POLL_TIMEOUT: Duration = Duration::from_secs(30);
