//! Pure decoders from register snapshots to semantic state.
//!
//! No side effects here: callers read the registers and pass the raw bytes
//! in. Hardware state can change between bus reads, so nothing derived
//! below is ever cached.

use crate::regs::*;
use crate::types::{BattHealth, ChargeFault, ChargeStatus, ChargeType};

/// Extract the CONTROL0 STAT field.
pub const fn stat_bits(control0: u8) -> u8 {
    (control0 & CONTROL0_STAT_MASK) >> CONTROL0_STAT_SHIFT
}

/// Extract and decode the CONTROL0 FAULT field.
pub const fn fault_from(control0: u8) -> ChargeFault {
    ChargeFault::from_code(control0 & CONTROL0_FAULT_MASK)
}

/// Battery status from the STAT field and CONTROL1.
///
/// CHARGE_DONE wins outright; a running PWM counts as charging only while
/// CE_N (the charge-enable inhibit) is clear.
pub const fn status_from(stat: u8, control1: u8) -> ChargeStatus {
    if stat == STAT_CHARGE_DONE {
        return ChargeStatus::Full;
    }
    if stat == STAT_PWM_ENABLED && control1 & CONTROL1_CE_N == 0 {
        return ChargeStatus::Charging;
    }
    ChargeStatus::Discharging
}

/// Charge type from the STAT field, MONITOR0 and CONTROL1. The linear
/// charge indicator takes precedence over the PWM state.
pub const fn charge_type_from(stat: u8, monitor0: u8, control1: u8) -> ChargeType {
    if monitor0 & MONITOR0_LINCHG != 0 {
        return ChargeType::Trickle;
    }
    if stat == STAT_PWM_ENABLED && control1 & CONTROL1_CE_N == 0 {
        return ChargeType::Fast;
    }
    ChargeType::None
}

/// MONITOR1.NOBAT has inverted sense: bit set means no battery.
pub const fn battery_present(monitor1: u8) -> bool {
    monitor1 & MONITOR1_NOBAT == 0
}

/// Thermal-flag precedence: hot > cold > warm > cool > good.
pub const fn health_from_flags(hot: bool, cold: bool, warm: bool, cool: bool) -> BattHealth {
    if hot {
        BattHealth::Overheat
    } else if cold {
        BattHealth::Cold
    } else if warm {
        BattHealth::Warm
    } else if cool {
        BattHealth::Cool
    } else {
        BattHealth::Good
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_done_is_full_regardless_of_other_bits() {
        let control0 = (STAT_CHARGE_DONE << CONTROL0_STAT_SHIFT) | CONTROL0_EN_STAT | 0x07;
        assert_eq!(stat_bits(control0), STAT_CHARGE_DONE);
        assert_eq!(status_from(stat_bits(control0), 0xFF), ChargeStatus::Full);
        assert_eq!(status_from(stat_bits(control0), 0x00), ChargeStatus::Full);
    }

    #[test]
    fn pwm_with_inhibit_clear_is_charging() {
        assert_eq!(status_from(STAT_PWM_ENABLED, 0x00), ChargeStatus::Charging);
    }

    #[test]
    fn pwm_with_inhibit_set_is_discharging() {
        assert_eq!(status_from(STAT_PWM_ENABLED, CONTROL1_CE_N), ChargeStatus::Discharging);
    }

    #[test]
    fn ready_and_fault_states_are_discharging() {
        assert_eq!(status_from(STAT_READY, 0x00), ChargeStatus::Discharging);
        assert_eq!(status_from(STAT_FAULT, 0x00), ChargeStatus::Discharging);
    }

    #[test]
    fn fault_vocabulary_is_complete() {
        let expected = [
            ChargeFault::None,
            ChargeFault::VbusOvp,
            ChargeFault::SleepMode,
            ChargeFault::PoorInput,
            ChargeFault::BattOvp,
            ChargeFault::ThermShutdown,
            ChargeFault::TimerFault,
            ChargeFault::NoBattery,
        ];
        for (code, fault) in expected.iter().enumerate() {
            assert_eq!(fault_from(code as u8), *fault);
        }
        // Bits above the field must not leak into the decode.
        assert_eq!(fault_from(0xF8 | 0x04), ChargeFault::BattOvp);
    }

    #[test]
    fn linear_charge_indicator_wins_over_pwm() {
        assert_eq!(
            charge_type_from(STAT_PWM_ENABLED, MONITOR0_LINCHG, 0x00),
            ChargeType::Trickle
        );
    }

    #[test]
    fn pwm_without_inhibit_is_fast() {
        assert_eq!(charge_type_from(STAT_PWM_ENABLED, 0x00, 0x00), ChargeType::Fast);
        assert_eq!(
            charge_type_from(STAT_PWM_ENABLED, 0x00, CONTROL1_CE_N),
            ChargeType::None
        );
        assert_eq!(charge_type_from(STAT_READY, 0x00, 0x00), ChargeType::None);
    }

    #[test]
    fn nobat_bit_means_absent() {
        assert!(battery_present(0x00));
        assert!(battery_present(MONITOR1_GATE | MONITOR1_VBAT));
        assert!(!battery_present(MONITOR1_NOBAT));
    }

    #[test]
    fn health_precedence_order() {
        assert_eq!(health_from_flags(true, true, true, true), BattHealth::Overheat);
        assert_eq!(health_from_flags(false, true, true, true), BattHealth::Cold);
        assert_eq!(health_from_flags(false, false, true, true), BattHealth::Warm);
        assert_eq!(health_from_flags(false, false, false, true), BattHealth::Cool);
        assert_eq!(health_from_flags(false, false, false, false), BattHealth::Good);
    }
}
