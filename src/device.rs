//! High-level driver API (async, owns the I²C device so it can live in a
//! Mutex).
//!
//! Every method takes `&mut self`, and the one device handle is shared
//! through a single `embassy_sync` mutex, so register transactions never
//! interleave: a masked read-modify-write completes under one exclusive
//! borrow or not at all.

use embassy_time::{with_timeout, Duration};
use embedded_hal_async::i2c::I2c;

use crate::config;
use crate::decode;
use crate::power_supply::{BatteryMonitor, GaugeProperty, UpstreamSupply};
use crate::regs::*;
use crate::shared_state::{BatteryReadings, GaugeReadings};
use crate::tables;
use crate::types::{BattHealth, ChargeFault, ChargeStatus, ChargeType, Error, PartNumber, Technology};

const BUS_OP_TIMEOUT: Duration = Duration::from_millis(30);

/// Run one bus transaction under the per-operation timeout.
async fn with_bus_timeout<F, T, E>(fut: F) -> Result<T, Error<E>>
where
    F: core::future::Future<Output = Result<T, Error<E>>>,
{
    match with_timeout(BUS_OP_TIMEOUT, fut).await {
        Ok(r) => r,
        Err(_) => Err(Error::Timeout),
    }
}

/// FAN5404x async driver over I²C.
pub struct Fan5404x<I2C> {
    i2c: I2C,
    addr: u8,
    write_inhibit: bool,
    pub(crate) charging: bool,
    pub(crate) chg_enabled: bool,
    pub(crate) usb_present: bool,
    pub(crate) batt_present: bool,
    pub(crate) chg_done_batt_full: bool,
    batt_hot: bool,
    batt_cold: bool,
    batt_warm: bool,
    batt_cool: bool,
    fake_capacity: Option<u8>,
}

impl<I2C> Fan5404x<I2C>
where
    I2C: I2c,
{
    /// Create a driver instance at the default 7-bit address, with normal
    /// control writes enabled.
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, I2C_ADDR)
    }

    /// Create a driver instance at an explicit 7-bit address.
    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        Self {
            i2c,
            addr,
            write_inhibit: false,
            charging: false,
            chg_enabled: false,
            usb_present: false,
            batt_present: false,
            chg_done_batt_full: false,
            batt_hot: false,
            batt_cold: false,
            batt_warm: false,
            batt_cool: false,
            fake_capacity: None,
        }
    }

    /// Factory-line variant: normal control writes are silently suppressed
    /// so stations cannot reconfigure the charger, while diagnostic writes
    /// still reach the chip.
    pub fn factory(i2c: I2C) -> Self {
        let mut dev = Self::new(i2c);
        dev.write_inhibit = true;
        info!("factory mode: operational writes disabled");
        dev
    }

    /// Consume the driver and return the owned I²C peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn factory_mode(&self) -> bool {
        self.write_inhibit
    }

    pub fn charging(&self) -> bool {
        self.charging
    }

    pub fn charging_enabled(&self) -> bool {
        self.chg_enabled
    }

    // ------------------ Raw register I/O ------------------

    /// Read a single register byte (write-read transaction).
    pub async fn read1(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        with_bus_timeout(async {
            let mut buf = [0u8; 1];
            self.i2c
                .write_read(self.addr, &[reg], &mut buf)
                .await
                .map_err(Error::I2c)?;
            Ok(buf[0])
        })
        .await
    }

    /// Write a single register byte. In factory mode this is a successful
    /// no-op that never touches the bus.
    pub async fn write1(&mut self, reg: u8, val: u8) -> Result<(), Error<I2C::Error>> {
        if self.write_inhibit {
            return Ok(());
        }
        self.write1_forced(reg, val).await
    }

    /// Write a single register byte regardless of factory mode.
    pub async fn write1_forced(&mut self, reg: u8, val: u8) -> Result<(), Error<I2C::Error>> {
        with_bus_timeout(async {
            self.i2c
                .write(self.addr, &[reg, val])
                .await
                .map_err(Error::I2c)
        })
        .await?;
        debug!("wrote 0x{:02x}=0x{:02x}", reg, val);
        Ok(())
    }

    /// Read-modify-write of the bits in `mask`; bits outside are preserved.
    /// A failed read aborts without writing anything.
    pub async fn masked_write(&mut self, reg: u8, mask: u8, val: u8) -> Result<(), Error<I2C::Error>> {
        let cur = self.read1(reg).await?;
        self.write1(reg, (cur & !mask) | (val & mask)).await
    }

    /// `masked_write` for diagnostic paths that bypass the factory-mode
    /// write inhibit.
    pub async fn masked_write_forced(
        &mut self,
        reg: u8,
        mask: u8,
        val: u8,
    ) -> Result<(), Error<I2C::Error>> {
        let cur = self.read1(reg).await?;
        self.write1_forced(reg, (cur & !mask) | (val & mask)).await
    }

    // ------------------ Identity ------------------

    /// Verify the IC_INFO vendor code and log part number and revision.
    /// Attaching to unrecognized silicon is refused outright.
    pub async fn probe(&mut self) -> Result<(), Error<I2C::Error>> {
        let info = self.read1(REG_IC_INFO).await?;
        if info & IC_INFO_VENDOR_MASK != VENDOR_FAIRCHILD {
            error!("unknown vendor in IC_INFO: 0x{:02x}", info);
            return Err(Error::UnknownVendor(info));
        }
        let pn = PartNumber::from_code((info & IC_INFO_PN_MASK) >> IC_INFO_PN_SHIFT);
        info!("found {} revision 1.{}", pn.name(), info & IC_INFO_REV_MASK);
        Ok(())
    }

    /// One-time hardware setup: disable the T32 safety timer. The
    /// dispatcher heartbeat takes over the watchdog role.
    pub async fn hw_init(&mut self) -> Result<(), Error<I2C::Error>> {
        self.masked_write(REG_WD_CONTROL, WD_CONTROL_WD_DIS, WD_CONTROL_WD_DIS)
            .await
    }

    // ------------------ Charge limits ------------------

    /// Program the output regulation voltage, floored onto the 20 mV grid.
    pub async fn set_oreg(&mut self, mv: u16) -> Result<(), Error<I2C::Error>> {
        let code = tables::OREG_MV.quantize_floor(mv).ok_or(Error::OutOfRange)?;
        self.masked_write(REG_OREG, OREG_OREG_MASK, code << OREG_OREG_SHIFT)
            .await
    }

    /// Program the input current limit, floored onto the IBUSLIM table.
    pub async fn set_ibuslim(&mut self, ma: u32) -> Result<(), Error<I2C::Error>> {
        let code = tables::ibuslim_floor(ma).ok_or(Error::OutOfRange)?;
        self.masked_write(REG_CONTROL1, CONTROL1_IBUSLIM_MASK, code << CONTROL1_IBUSLIM_SHIFT)
            .await
    }

    /// Program the fast-charge current, floored onto the 100 mA grid.
    pub async fn set_iocharge(&mut self, ma: u16) -> Result<(), Error<I2C::Error>> {
        let code = tables::IOCHARGE_MA.quantize_floor(ma).ok_or(Error::OutOfRange)?;
        // RESET shares the register and must stay low.
        self.masked_write(
            REG_IBAT,
            IBAT_IOCHARGE_MASK | IBAT_RESET,
            code << IBAT_IOCHARGE_SHIFT,
        )
        .await
    }

    // ------------------ Charge control ------------------

    /// Full charge-start sequence.
    ///
    /// `charging` flips only after every write succeeded. Writes made
    /// before a failure are not rolled back; the next event or heartbeat
    /// retries the whole sequence.
    pub async fn start_charging<U: UpstreamSupply>(
        &mut self,
        upstream: &U,
    ) -> Result<(), Error<I2C::Error>> {
        debug!("starting to charge");

        self.masked_write(REG_CONTROL0, CONTROL0_TMR_RST, CONTROL0_TMR_RST)
            .await?;

        let limit_ma = upstream.current_max_ma()?;
        self.set_ibuslim(limit_ma).await?;

        self.set_iocharge(config::FAST_CHARGE_CURRENT_MA).await?;

        // Clear IO_LEVEL so the IOCHARGE setting, not the IO pin, rules.
        self.masked_write(REG_VBUS_CONTROL, VBUS_IO_LEVEL, 0).await?;

        self.set_oreg(config::CHARGE_REGULATION_MV).await?;

        self.masked_write(REG_WD_CONTROL, WD_CONTROL_WD_DIS, WD_CONTROL_WD_DIS)
            .await?;

        // CE_N low enables the charger; TE low holds off early termination.
        self.masked_write(REG_CONTROL1, CONTROL1_TE | CONTROL1_CE_N, 0)
            .await?;

        self.charging = true;
        Ok(())
    }

    /// Inhibit charging by raising CE_N.
    pub async fn stop_charging(&mut self) -> Result<(), Error<I2C::Error>> {
        self.masked_write(REG_CONTROL1, CONTROL1_CE_N, CONTROL1_CE_N)
            .await?;
        self.charging = false;
        Ok(())
    }

    // ------------------ Decoded state ------------------

    /// STAT field from a fresh CONTROL0 read.
    pub async fn stat(&mut self) -> Result<u8, Error<I2C::Error>> {
        Ok(decode::stat_bits(self.read1(REG_CONTROL0).await?))
    }

    /// FAULT field from a fresh CONTROL0 read.
    pub async fn fault(&mut self) -> Result<ChargeFault, Error<I2C::Error>> {
        Ok(decode::fault_from(self.read1(REG_CONTROL0).await?))
    }

    /// Battery status from fresh CONTROL0/CONTROL1 reads. Bus glitches
    /// degrade to `Unknown`: status is polled again soon anyway.
    pub async fn status(&mut self) -> ChargeStatus {
        let stat = match self.stat().await {
            Ok(s) => s,
            Err(_) => return ChargeStatus::Unknown,
        };
        if stat == STAT_CHARGE_DONE {
            return ChargeStatus::Full;
        }
        match self.read1(REG_CONTROL1).await {
            Ok(ctrl1) => decode::status_from(stat, ctrl1),
            Err(_) => ChargeStatus::Unknown,
        }
    }

    /// Charge type from fresh CONTROL0/MONITOR0/CONTROL1 reads. An
    /// unreadable MONITOR0 reports `Trickle`, the conservative reading.
    pub async fn charge_type(&mut self) -> ChargeType {
        let stat = match self.stat().await {
            Ok(s) => s,
            Err(_) => return ChargeType::Unknown,
        };
        let mon0 = match self.read1(REG_MONITOR0).await {
            Ok(v) => v,
            Err(_) => return ChargeType::Trickle,
        };
        if mon0 & MONITOR0_LINCHG != 0 {
            return ChargeType::Trickle;
        }
        match self.read1(REG_CONTROL1).await {
            Ok(ctrl1) => decode::charge_type_from(stat, mon0, ctrl1),
            Err(_) => ChargeType::Unknown,
        }
    }

    /// Battery presence from a fresh MONITOR1 read; unreadable reports
    /// absent.
    pub async fn battery_present(&mut self) -> bool {
        match self.read1(REG_MONITOR1).await {
            Ok(mon1) => decode::battery_present(mon1),
            Err(_) => false,
        }
    }

    /// Health from the in-memory thermal flags.
    pub fn health(&self) -> BattHealth {
        decode::health_from_flags(self.batt_hot, self.batt_cold, self.batt_warm, self.batt_cool)
    }

    /// Apply a thermal-policy verdict. The flags are mutually exclusive:
    /// setting any one clears the other three.
    pub fn set_health(&mut self, health: BattHealth) {
        self.batt_hot = matches!(health, BattHealth::Overheat);
        self.batt_cold = matches!(health, BattHealth::Cold);
        self.batt_warm = matches!(health, BattHealth::Warm);
        self.batt_cool = matches!(health, BattHealth::Cool);
    }

    /// Reported capacity: the test override wins, then the battery
    /// monitor, then the fixed default.
    pub fn capacity<B: BatteryMonitor>(&self, monitor: Option<&B>) -> u8 {
        if let Some(soc) = self.fake_capacity {
            return soc;
        }
        match monitor.map(|m| m.property(GaugeProperty::Capacity)) {
            Some(Ok(soc)) => soc.clamp(0, 100) as u8,
            Some(Err(_)) => {
                warn!("could not get battery capacity");
                config::DEFAULT_BATT_CAPACITY
            }
            None => config::DEFAULT_BATT_CAPACITY,
        }
    }

    /// Override the reported capacity (test hook on the battery supply).
    pub fn set_fake_capacity(&mut self, soc: u8) {
        self.fake_capacity = Some(soc);
    }

    /// Assemble a full readings snapshot for publication.
    pub async fn snapshot<B: BatteryMonitor>(&mut self, monitor: Option<&B>) -> BatteryReadings {
        BatteryReadings {
            status: self.status().await,
            present: self.battery_present().await,
            charging_enabled: self.chg_enabled,
            charge_type: self.charge_type().await,
            capacity_percent: self.capacity(monitor),
            technology: Technology::LiIon,
            health: self.health(),
            gauge: monitor.map(GaugeReadings::collect),
        }
    }

    // ------------------ Diagnostics ------------------

    /// Raw byte read of any register address (inspection tooling).
    pub async fn read_register(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        self.read1(reg).await
    }

    /// Raw byte write of any register address; bypasses the factory-mode
    /// write inhibit.
    pub async fn force_write_register(&mut self, reg: u8, val: u8) -> Result<(), Error<I2C::Error>> {
        self.write1_forced(reg, val).await
    }

    /// Dump every named register as a `NAME - 0xAA = 0xVV` line. Registers
    /// that fail to read are skipped.
    pub async fn dump_registers<W: core::fmt::Write>(&mut self, out: &mut W) {
        for &(name, reg) in NAMED_REGS {
            if let Ok(val) = self.read1(reg).await {
                let _ = writeln!(out, "{} - 0x{:02x} = 0x{:02x}", name, reg, val);
            }
        }
    }

    /// [`dump_registers`](Self::dump_registers) into an owned buffer, for
    /// logging surfaces without one.
    pub async fn dump_registers_string(&mut self) -> heapless::String<512> {
        let mut out = heapless::String::new();
        self.dump_registers(&mut out).await;
        out
    }

    // ------------------ Factory-line controls ------------------

    /// Suspend or resume input power draw (HZ_MODE).
    pub async fn force_usb_suspend(&mut self, suspend: bool) -> Result<(), Error<I2C::Error>> {
        let val = if suspend { CONTROL1_HZ_MODE } else { 0 };
        self.masked_write_forced(REG_CONTROL1, CONTROL1_HZ_MODE, val).await
    }

    pub async fn usb_suspended(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.read1(REG_CONTROL1).await? & CONTROL1_HZ_MODE != 0)
    }

    /// Charger master enable: clear IO_LEVEL, then drive CE_N.
    pub async fn force_auto_enable(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.masked_write_forced(REG_VBUS_CONTROL, VBUS_IO_LEVEL, 0).await?;
        let val = if enable { 0 } else { CONTROL1_CE_N };
        self.masked_write_forced(REG_CONTROL1, CONTROL1_CE_N, val).await
    }

    pub async fn auto_enabled(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.read1(REG_CONTROL1).await? & CONTROL1_CE_N == 0)
    }

    /// Force the fast-charge current, floored onto the IOCHARGE grid.
    pub async fn force_ibatt_ma(&mut self, ma: u16) -> Result<(), Error<I2C::Error>> {
        let code = tables::IOCHARGE_MA.quantize_floor(ma).ok_or(Error::OutOfRange)?;
        // RESET shares the register and must stay low.
        self.masked_write_forced(
            REG_IBAT,
            IBAT_IOCHARGE_MASK | IBAT_RESET,
            code << IBAT_IOCHARGE_SHIFT,
        )
        .await
    }

    /// Read back the programmed fast-charge current, mA. Field codes above
    /// the table top decode as the top step.
    pub async fn forced_ibatt_ma(&mut self) -> Result<u16, Error<I2C::Error>> {
        let mut code = (self.read1(REG_IBAT).await? & IBAT_IOCHARGE_MASK) >> IBAT_IOCHARGE_SHIFT;
        if code > tables::IOCHARGE_MA.steps {
            code = tables::IOCHARGE_MA.steps;
        }
        Ok(tables::IOCHARGE_MA.value(code))
    }

    /// Force the input current limit, floored onto the IBUSLIM table.
    pub async fn force_iusb_ma(&mut self, ma: u32) -> Result<(), Error<I2C::Error>> {
        let code = tables::ibuslim_floor(ma).ok_or(Error::OutOfRange)?;
        self.masked_write_forced(REG_CONTROL1, CONTROL1_IBUSLIM_MASK, code << CONTROL1_IBUSLIM_SHIFT)
            .await
    }

    /// Read back the programmed input current limit, mA
    /// ([`tables::IBUSLIM_NO_LIMIT`] for the unbounded slot).
    pub async fn forced_iusb_ma(&mut self) -> Result<u32, Error<I2C::Error>> {
        let ctrl1 = self.read1(REG_CONTROL1).await?;
        Ok(tables::ibuslim_ma(
            (ctrl1 & CONTROL1_IBUSLIM_MASK) >> CONTROL1_IBUSLIM_SHIFT,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power_supply::PropertyUnavailable;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    struct TestSupply {
        ma: u32,
    }

    impl UpstreamSupply for TestSupply {
        fn current_max_ma(&self) -> Result<u32, PropertyUnavailable> {
            Ok(self.ma)
        }
        fn present(&self) -> Result<bool, PropertyUnavailable> {
            Ok(true)
        }
        fn online(&self) -> Result<bool, PropertyUnavailable> {
            Ok(true)
        }
    }

    struct TestMonitor {
        soc: Result<i32, PropertyUnavailable>,
    }

    impl BatteryMonitor for TestMonitor {
        fn property(&self, prop: GaugeProperty) -> Result<i32, PropertyUnavailable> {
            match prop {
                GaugeProperty::Capacity => self.soc,
                _ => Err(PropertyUnavailable),
            }
        }
    }

    #[tokio::test]
    async fn factory_mode_suppresses_operational_writes() {
        let mut dev = Fan5404x::factory(Mock::new(&[]));
        dev.write1(REG_OREG, 0xAA).await.unwrap();
        dev.release().done();
    }

    #[tokio::test]
    async fn forced_write_bypasses_inhibit() {
        let expectations = [Transaction::write(I2C_ADDR, vec![REG_OREG, 0xAA])];
        let mut dev = Fan5404x::factory(Mock::new(&expectations));
        dev.write1_forced(REG_OREG, 0xAA).await.unwrap();
        dev.release().done();
    }

    #[tokio::test]
    async fn masked_write_preserves_unmasked_bits() {
        let cur = 0b1010_0101;
        let expected = (cur & !OREG_OREG_MASK) | (0b0110_1000 & OREG_OREG_MASK);
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_OREG], vec![cur]),
            Transaction::write(I2C_ADDR, vec![REG_OREG, expected]),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        dev.masked_write(REG_OREG, OREG_OREG_MASK, 0b0110_1000).await.unwrap();
        dev.release().done();
    }

    #[tokio::test]
    async fn masked_write_aborts_on_read_failure() {
        let expectations = [Transaction::write_read(I2C_ADDR, vec![REG_OREG], vec![0])
            .with_error(ErrorKind::Other)];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(
            dev.masked_write(REG_OREG, OREG_OREG_MASK, 0xFF).await,
            Err(Error::I2c(ErrorKind::Other))
        );
        dev.release().done();
    }

    #[tokio::test]
    async fn factory_masked_write_reads_but_does_not_write() {
        let expectations = [Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0xFF])];
        let mut dev = Fan5404x::factory(Mock::new(&expectations));
        dev.masked_write(REG_CONTROL1, CONTROL1_CE_N, 0).await.unwrap();
        dev.release().done();
    }

    #[tokio::test]
    async fn probe_accepts_fairchild_part() {
        // Vendor 0b10, PN 6 (fan54046), revision 1.
        let expectations = [Transaction::write_read(I2C_ADDR, vec![REG_IC_INFO], vec![0b1011_0001])];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        dev.probe().await.unwrap();
        dev.release().done();
    }

    #[tokio::test]
    async fn probe_rejects_unknown_vendor() {
        let expectations = [Transaction::write_read(I2C_ADDR, vec![REG_IC_INFO], vec![0x31])];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(dev.probe().await, Err(Error::UnknownVendor(0x31)));
        dev.release().done();
    }

    /// The full start sequence against a 500 mA upstream source: timer
    /// reset, input limit code 1, 1550 mA fast charge (RESET held low),
    /// IO_LEVEL cleared, 4340 mV regulation (floor of 4350), T32 disabled,
    /// TE and CE_N cleared.
    fn start_sequence(ctrl1_initial: u8) -> Vec<Transaction> {
        let after_ibuslim = (ctrl1_initial & 0x3F) | 0x40;
        vec![
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![0x00]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL0, CONTROL0_TMR_RST]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![ctrl1_initial]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL1, after_ibuslim]),
            Transaction::write_read(I2C_ADDR, vec![REG_IBAT], vec![0x8F]),
            Transaction::write(I2C_ADDR, vec![REG_IBAT, 0x57]),
            Transaction::write_read(I2C_ADDR, vec![REG_VBUS_CONTROL], vec![0x30]),
            Transaction::write(I2C_ADDR, vec![REG_VBUS_CONTROL, 0x10]),
            Transaction::write_read(I2C_ADDR, vec![REG_OREG], vec![0x03]),
            Transaction::write(I2C_ADDR, vec![REG_OREG, 0xAB]),
            Transaction::write_read(I2C_ADDR, vec![REG_WD_CONTROL], vec![0x00]),
            Transaction::write(I2C_ADDR, vec![REG_WD_CONTROL, WD_CONTROL_WD_DIS]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![after_ibuslim]),
            Transaction::write(
                I2C_ADDR,
                vec![REG_CONTROL1, after_ibuslim & !(CONTROL1_TE | CONTROL1_CE_N)],
            ),
        ]
    }

    #[tokio::test]
    async fn start_charging_programs_full_sequence() {
        // Power-on CONTROL1 has TE and CE_N set; the sequence clears both.
        let mut dev = Fan5404x::new(Mock::new(&start_sequence(CONTROL1_TE | CONTROL1_CE_N)));
        dev.start_charging(&TestSupply { ma: 500 }).await.unwrap();
        assert!(dev.charging());
        dev.release().done();
    }

    #[tokio::test]
    async fn start_charging_failure_leaves_stopped() {
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![0x00]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL0, CONTROL0_TMR_RST]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0x00])
                .with_error(ErrorKind::Other),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert!(dev.start_charging(&TestSupply { ma: 500 }).await.is_err());
        assert!(!dev.charging());
        dev.release().done();
    }

    #[tokio::test]
    async fn start_charging_rejects_upstream_limit_below_table() {
        // Quantization fails before CONTROL1 is ever touched.
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![0x00]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL0, CONTROL0_TMR_RST]),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(
            dev.start_charging(&TestSupply { ma: 50 }).await,
            Err(Error::OutOfRange)
        );
        assert!(!dev.charging());
        dev.release().done();
    }

    #[tokio::test]
    async fn stop_charging_sets_inhibit() {
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0x40]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL1, 0x40 | CONTROL1_CE_N]),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        dev.stop_charging().await.unwrap();
        assert!(!dev.charging());
        dev.release().done();
    }

    /// start → stop → start must land on the same register configuration
    /// as the single start (the transient TMR_RST pulse aside). The second
    /// sequence reads back what the first one wrote and writes identical
    /// bytes.
    #[tokio::test]
    async fn restart_reproduces_configuration() {
        let mut expectations = start_sequence(CONTROL1_TE | CONTROL1_CE_N);
        expectations.extend([
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0x40]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL1, 0x44]),
        ]);
        expectations.extend([
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![0x00]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL0, CONTROL0_TMR_RST]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0x44]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL1, 0x44]),
            Transaction::write_read(I2C_ADDR, vec![REG_IBAT], vec![0x57]),
            Transaction::write(I2C_ADDR, vec![REG_IBAT, 0x57]),
            Transaction::write_read(I2C_ADDR, vec![REG_VBUS_CONTROL], vec![0x10]),
            Transaction::write(I2C_ADDR, vec![REG_VBUS_CONTROL, 0x10]),
            Transaction::write_read(I2C_ADDR, vec![REG_OREG], vec![0xAB]),
            Transaction::write(I2C_ADDR, vec![REG_OREG, 0xAB]),
            Transaction::write_read(I2C_ADDR, vec![REG_WD_CONTROL], vec![WD_CONTROL_WD_DIS]),
            Transaction::write(I2C_ADDR, vec![REG_WD_CONTROL, WD_CONTROL_WD_DIS]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0x44]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL1, 0x40]),
        ]);
        let supply = TestSupply { ma: 500 };
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        dev.start_charging(&supply).await.unwrap();
        dev.stop_charging().await.unwrap();
        dev.start_charging(&supply).await.unwrap();
        assert!(dev.charging());
        dev.release().done();
    }

    #[tokio::test]
    async fn status_charge_done_is_full_without_second_read() {
        let expectations = [Transaction::write_read(
            I2C_ADDR,
            vec![REG_CONTROL0],
            vec![STAT_CHARGE_DONE << CONTROL0_STAT_SHIFT],
        )];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(dev.status().await, ChargeStatus::Full);
        dev.release().done();
    }

    #[tokio::test]
    async fn status_follows_inhibit_bit() {
        let pwm = STAT_PWM_ENABLED << CONTROL0_STAT_SHIFT;
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![pwm]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0x00]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![pwm]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![CONTROL1_CE_N]),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(dev.status().await, ChargeStatus::Charging);
        assert_eq!(dev.status().await, ChargeStatus::Discharging);
        dev.release().done();
    }

    #[tokio::test]
    async fn status_degrades_to_unknown_on_bus_error() {
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![0]).with_error(ErrorKind::Other),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![STAT_PWM_ENABLED << 4]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0]).with_error(ErrorKind::Other),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(dev.status().await, ChargeStatus::Unknown);
        assert_eq!(dev.status().await, ChargeStatus::Unknown);
        dev.release().done();
    }

    #[tokio::test]
    async fn charge_type_trickle_on_linear_charge() {
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![STAT_PWM_ENABLED << 4]),
            Transaction::write_read(I2C_ADDR, vec![REG_MONITOR0], vec![MONITOR0_LINCHG]),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(dev.charge_type().await, ChargeType::Trickle);
        dev.release().done();
    }

    #[tokio::test]
    async fn charge_type_trickle_when_monitor_unreadable() {
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![STAT_PWM_ENABLED << 4]),
            Transaction::write_read(I2C_ADDR, vec![REG_MONITOR0], vec![0]).with_error(ErrorKind::Other),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(dev.charge_type().await, ChargeType::Trickle);
        dev.release().done();
    }

    #[tokio::test]
    async fn charge_type_fast_while_pwm_running() {
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL0], vec![STAT_PWM_ENABLED << 4]),
            Transaction::write_read(I2C_ADDR, vec![REG_MONITOR0], vec![0x00]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0x00]),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(dev.charge_type().await, ChargeType::Fast);
        dev.release().done();
    }

    #[tokio::test]
    async fn battery_present_inverted_bit_and_conservative_default() {
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_MONITOR1], vec![0x00]),
            Transaction::write_read(I2C_ADDR, vec![REG_MONITOR1], vec![MONITOR1_NOBAT]),
            Transaction::write_read(I2C_ADDR, vec![REG_MONITOR1], vec![0]).with_error(ErrorKind::Other),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert!(dev.battery_present().await);
        assert!(!dev.battery_present().await);
        assert!(!dev.battery_present().await);
        dev.release().done();
    }

    #[tokio::test]
    async fn health_setter_is_exclusive_in_both_orders() {
        let mut dev = Fan5404x::new(Mock::new(&[]));
        dev.set_health(BattHealth::Overheat);
        dev.set_health(BattHealth::Cool);
        assert_eq!(dev.health(), BattHealth::Cool);
        dev.set_health(BattHealth::Overheat);
        assert_eq!(dev.health(), BattHealth::Overheat);
        dev.set_health(BattHealth::Good);
        assert_eq!(dev.health(), BattHealth::Good);
        dev.release().done();
    }

    #[tokio::test]
    async fn capacity_prefers_override_then_monitor_then_default() {
        let mut dev = Fan5404x::new(Mock::new(&[]));
        let monitor = TestMonitor { soc: Ok(64) };
        assert_eq!(dev.capacity(Some(&monitor)), 64);
        assert_eq!(dev.capacity(None::<&TestMonitor>), 50);
        assert_eq!(dev.capacity(Some(&TestMonitor { soc: Err(PropertyUnavailable) })), 50);
        dev.set_fake_capacity(77);
        assert_eq!(dev.capacity(Some(&monitor)), 77);
        dev.release().done();
    }

    #[tokio::test]
    async fn dump_skips_unreadable_registers() {
        let expectations: Vec<Transaction> = NAMED_REGS
            .iter()
            .map(|&(_, reg)| {
                let t = Transaction::write_read(I2C_ADDR, vec![reg], vec![reg ^ 0x5A]);
                if reg == REG_MONITOR0 {
                    t.with_error(ErrorKind::Other)
                } else {
                    t
                }
            })
            .collect();
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        let mut out = String::new();
        dev.dump_registers(&mut out).await;
        assert!(out.contains("CONTROL0 - 0x00 = 0x5a"));
        assert!(out.contains("WD CONTROL - 0x13 = 0x49"));
        assert!(!out.contains("MONITOR0"));
        assert_eq!(out.lines().count(), NAMED_REGS.len() - 1);
        dev.release().done();
    }

    #[tokio::test]
    async fn forced_readbacks_decode_tables() {
        let expectations = [
            // IBUSLIM code 3 reads back as the unbounded slot.
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0xC0]),
            // IOCHARGE code 15 is above the table top and clamps to it.
            Transaction::write_read(I2C_ADDR, vec![REG_IBAT], vec![0x78]),
        ];
        let mut dev = Fan5404x::new(Mock::new(&expectations));
        assert_eq!(dev.forced_iusb_ma().await, Ok(tables::IBUSLIM_NO_LIMIT));
        assert_eq!(dev.forced_ibatt_ma().await, Ok(1650));
        dev.release().done();
    }

    #[tokio::test]
    async fn factory_controls_bypass_inhibit() {
        let expectations = [
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![0x00]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL1, CONTROL1_HZ_MODE]),
            Transaction::write_read(I2C_ADDR, vec![REG_VBUS_CONTROL], vec![VBUS_IO_LEVEL]),
            Transaction::write(I2C_ADDR, vec![REG_VBUS_CONTROL, 0x00]),
            Transaction::write_read(I2C_ADDR, vec![REG_CONTROL1], vec![CONTROL1_CE_N]),
            Transaction::write(I2C_ADDR, vec![REG_CONTROL1, 0x00]),
        ];
        let mut dev = Fan5404x::factory(Mock::new(&expectations));
        dev.force_usb_suspend(true).await.unwrap();
        dev.force_auto_enable(true).await.unwrap();
        dev.release().done();
    }
}
