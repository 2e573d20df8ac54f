//! Register addresses and bit masks for the FAN5404x.

pub const I2C_ADDR: u8 = 0x6B;

// CONTROL0: timer reset, status and fault reporting
pub const REG_CONTROL0: u8 = 0x00;
pub const   CONTROL0_TMR_RST: u8 = 1 << 7; // self-clearing pulse bit
pub const   CONTROL0_EN_STAT: u8 = 1 << 6;
pub const   CONTROL0_STAT_MASK: u8 = 0b0011_0000; // <<4
pub const   CONTROL0_STAT_SHIFT: u8 = 4;
pub const     STAT_READY: u8 = 0x00;
pub const     STAT_PWM_ENABLED: u8 = 0x01;
pub const     STAT_CHARGE_DONE: u8 = 0x02;
pub const     STAT_FAULT: u8 = 0x03;
pub const   CONTROL0_BOOST: u8 = 1 << 3;
pub const   CONTROL0_FAULT_MASK: u8 = 0b0000_0111; // <<0

// CONTROL1: input current limit, weak-battery threshold, charge enables
pub const REG_CONTROL1: u8 = 0x01;
pub const   CONTROL1_IBUSLIM_MASK: u8 = 0b1100_0000; // <<6
pub const   CONTROL1_IBUSLIM_SHIFT: u8 = 6;
pub const   CONTROL1_VLOWV_MASK: u8 = 0b0011_0000; // <<4
pub const     VLOWV_3_4V: u8 = 0;
pub const     VLOWV_3_5V: u8 = 1;
pub const     VLOWV_3_6V: u8 = 2;
pub const     VLOWV_3_7V: u8 = 3;
pub const   CONTROL1_TE: u8 = 1 << 3;
pub const   CONTROL1_CE_N: u8 = 1 << 2; // charge-enable inhibit, active high
pub const   CONTROL1_HZ_MODE: u8 = 1 << 1;
pub const   CONTROL1_OPA_MODE: u8 = 1 << 0;

// OREG: output regulation voltage
pub const REG_OREG: u8 = 0x02;
pub const   OREG_OREG_MASK: u8 = 0b1111_1100; // <<2
pub const   OREG_OREG_SHIFT: u8 = 2;
pub const   OREG_DBAT_B: u8 = 1 << 1;
pub const   OREG_EOC: u8 = 1 << 0;

// IC INFO: vendor code, part number, silicon revision
pub const REG_IC_INFO: u8 = 0x03;
pub const   IC_INFO_VENDOR_MASK: u8 = 0b1100_0000;
pub const   VENDOR_FAIRCHILD: u8 = 0x80;
pub const   IC_INFO_PN_MASK: u8 = 0b0011_1000; // <<3
pub const   IC_INFO_PN_SHIFT: u8 = 3;
pub const   IC_INFO_REV_MASK: u8 = 0b0000_0111;

// IBAT: fast-charge and termination current
pub const REG_IBAT: u8 = 0x04;
pub const   IBAT_RESET: u8 = 1 << 7;
pub const   IBAT_IOCHARGE_MASK: u8 = 0b0111_1000; // <<3
pub const   IBAT_IOCHARGE_SHIFT: u8 = 3;
pub const   IBAT_ITERM_MASK: u8 = 0b0000_0111;

// VBUS CONTROL
pub const REG_VBUS_CONTROL: u8 = 0x05;
pub const   VBUS_PROD: u8 = 1 << 6;
pub const   VBUS_IO_LEVEL: u8 = 1 << 5;
pub const   VBUS_VBUS_CON: u8 = 1 << 4;
pub const   VBUS_SP: u8 = 1 << 3;
pub const   VBUS_VBUSLIM_MASK: u8 = 0b0000_0111;

// SAFETY: maximum charge current and regulation voltage
pub const REG_SAFETY: u8 = 0x06;
pub const   SAFETY_ISAFE_MASK: u8 = 0b1111_0000; // <<4
pub const   SAFETY_VSAFE_MASK: u8 = 0b0000_1111;

// POST CHARGING
pub const REG_POST_CHARGING: u8 = 0x07;
pub const   PC_BDET_MASK: u8 = 0b1100_0000; // <<6
pub const   PC_VBUS_LOAD_MASK: u8 = 0b0011_0000; // <<4
pub const   PC_PC_EN: u8 = 1 << 3;
pub const   PC_PC_IT_MASK: u8 = 0b0000_0111;

// MONITOR0: comparator outputs, linear-charge indicator
pub const REG_MONITOR0: u8 = 0x10;
pub const   MONITOR0_ITERM_CMP: u8 = 1 << 7;
pub const   MONITOR0_VBAT_CMP: u8 = 1 << 6;
pub const   MONITOR0_LINCHG: u8 = 1 << 5;
pub const   MONITOR0_T_120: u8 = 1 << 4;
pub const   MONITOR0_ICHG: u8 = 1 << 3;
pub const   MONITOR0_IBUS: u8 = 1 << 2;
pub const   MONITOR0_VBUS_VALID: u8 = 1 << 1;
pub const   MONITOR0_CV: u8 = 1 << 0;

// MONITOR1: gate state, battery detection
pub const REG_MONITOR1: u8 = 0x11;
pub const   MONITOR1_GATE: u8 = 1 << 7;
pub const   MONITOR1_VBAT: u8 = 1 << 6;
pub const   MONITOR1_POK_B: u8 = 1 << 5;
pub const   MONITOR1_DIS_LEVEL: u8 = 1 << 4;
pub const   MONITOR1_NOBAT: u8 = 1 << 3; // inverted sense: set means absent
pub const   MONITOR1_PC_ON: u8 = 1 << 2;

// NTC fault reporting
pub const REG_NTC: u8 = 0x12;

// WD CONTROL: T32 safety timer
pub const REG_WD_CONTROL: u8 = 0x13;
pub const   WD_CONTROL_EN_VREG: u8 = 1 << 2;
pub const   WD_CONTROL_WD_DIS: u8 = 1 << 1;

// REG RESTART
pub const REG_RESTART: u8 = 0xFA;

/// Register names for the diagnostic dump, in dump order.
pub const NAMED_REGS: &[(&str, u8)] = &[
    ("CONTROL0", REG_CONTROL0),
    ("CONTROL1", REG_CONTROL1),
    ("OREG", REG_OREG),
    ("IC INFO", REG_IC_INFO),
    ("IBAT", REG_IBAT),
    ("VBUS CONTROL", REG_VBUS_CONTROL),
    ("SAFETY", REG_SAFETY),
    ("POST CHARGING", REG_POST_CHARGING),
    ("MONITOR0", REG_MONITOR0),
    ("MONITOR1", REG_MONITOR1),
    ("NTC", REG_NTC),
    ("WD CONTROL", REG_WD_CONTROL),
];
