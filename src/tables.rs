//! Threshold tables mapping register codes to physical units.

/// Linear code table: code 0 is `min`, each code adds `step`, `steps` is
/// the highest valid code.
#[derive(Copy, Clone, Debug)]
pub struct StepRange {
    pub min: u16,
    pub step: u16,
    pub steps: u8,
}

impl StepRange {
    /// Physical value of a register code.
    pub const fn value(&self, code: u8) -> u16 {
        self.min + code as u16 * self.step
    }

    /// Largest code whose value does not exceed `request`, or `None` when
    /// the request is below the lowest step. Floor, never nearest: a limit
    /// must not be rounded up past the caller's cap.
    pub fn quantize_floor(&self, request: u16) -> Option<u8> {
        (0..=self.steps).rev().find(|&code| request >= self.value(code))
    }
}

/// Output regulation voltage (OREG.OREG), mV.
pub const OREG_MV: StepRange = StepRange { min: 3500, step: 20, steps: 48 };

/// Fast-charge current (IBAT.IOCHARGE), mA.
pub const IOCHARGE_MA: StepRange = StepRange { min: 550, step: 100, steps: 11 };

/// Marker value of the unbounded IBUSLIM slot.
pub const IBUSLIM_NO_LIMIT: u32 = u32::MAX;

/// Input current limit (CONTROL1.IBUSLIM), mA. Code 3 is "no limit".
pub const IBUSLIM_MA: [u32; 4] = [100, 500, 800, IBUSLIM_NO_LIMIT];

/// Largest IBUSLIM code whose limit does not exceed `request_ma`.
pub fn ibuslim_floor(request_ma: u32) -> Option<u8> {
    (0..IBUSLIM_MA.len() as u8).rev().find(|&code| request_ma >= IBUSLIM_MA[code as usize])
}

/// Limit represented by an IBUSLIM code, mA.
pub const fn ibuslim_ma(code: u8) -> u32 {
    IBUSLIM_MA[(code & 0x03) as usize]
}
