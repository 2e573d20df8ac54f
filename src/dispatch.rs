//! Event dispatcher: reacts to STAT interrupt edges, upstream power
//! changes and host property writes, and republishes battery state after
//! every round. A self-pacing heartbeat fires when nothing else does —
//! an edge-triggered interrupt can be lost, and the chip's own watchdog
//! is disabled at init.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{with_timeout, Timer};
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::I2c;

use crate::config;
use crate::decode;
use crate::device::Fan5404x;
use crate::power_supply::{BatteryMonitor, SystemPower, UpstreamSupply, VbusSense};
use crate::regs::{REG_MONITOR1, REG_VBUS_CONTROL, STAT_CHARGE_DONE, STAT_PWM_ENABLED, VBUS_VBUS_CON};
use crate::shared_state::{ChargerEvent, BATTERY_CHANNEL, CHARGER_EVENT_CHANNEL};
use crate::types::Error;

/// The one lock serializing all register access for a device.
pub type SharedFan5404x<I2C> = Mutex<CriticalSectionRawMutex, Fan5404x<I2C>>;

/// Bring-up: identify the chip, apply hardware init, derive the initial
/// charging state from battery presence and upstream power.
///
/// A vendor mismatch is fatal; do not spawn [`run`] after an error here.
pub async fn bring_up<I2C, U>(
    dev: &SharedFan5404x<I2C>,
    upstream: &U,
) -> Result<(), Error<I2C::Error>>
where
    I2C: I2c,
    U: UpstreamSupply,
{
    let mut dev = dev.lock().await;

    dev.probe().await?;
    dev.hw_init().await?;

    let mon1 = dev.read1(REG_MONITOR1).await?;
    dev.batt_present = decode::battery_present(mon1);
    dev.chg_done_batt_full = matches!(dev.stat().await, Ok(STAT_CHARGE_DONE));

    dev.usb_present = upstream.present()?;
    if dev.usb_present {
        dev.start_charging(upstream).await?;
    } else {
        dev.stop_charging().await?;
    }

    debug!(
        "bring-up: batt={} usb={} done={}",
        dev.batt_present, dev.usb_present, dev.chg_done_batt_full
    );
    Ok(())
}

/// Dispatcher loop. Waits for an event or, failing that, the heartbeat,
/// handles it, then publishes a fresh readings snapshot. The heartbeat
/// timer is re-armed only after the handler completes, so the period
/// self-paces; drift under load is fine.
pub async fn run<I2C, U, B, V, S>(
    dev: &SharedFan5404x<I2C>,
    upstream: &U,
    monitor: Option<&B>,
    vbus: &mut V,
    system: &mut S,
) -> !
where
    I2C: I2c,
    U: UpstreamSupply,
    B: BatteryMonitor,
    V: VbusSense,
    S: SystemPower,
{
    let publisher = BATTERY_CHANNEL.publisher().unwrap();
    let mut events = CHARGER_EVENT_CHANNEL.subscriber().unwrap();

    loop {
        match select(events.next_message_pure(), Timer::after(config::HEARTBEAT_PERIOD)).await {
            Either::First(event) => handle_event(dev, upstream, vbus, system, event).await,
            Either::Second(()) => debug!("heartbeat"),
        }

        let readings = dev.lock().await.snapshot(monitor).await;
        if publisher.try_publish(readings).is_err() {
            debug!("readings dropped (queue full)");
        }
    }
}

async fn handle_event<I2C, U, V, S>(
    dev: &SharedFan5404x<I2C>,
    upstream: &U,
    vbus: &mut V,
    system: &mut S,
    event: ChargerEvent,
) where
    I2C: I2c,
    U: UpstreamSupply,
    V: VbusSense,
    S: SystemPower,
{
    match event {
        ChargerEvent::StatInterrupt => stat_interrupt(dev, upstream).await,
        ChargerEvent::ExternalPowerChanged => {
            external_power_changed(dev, upstream, vbus, system).await
        }
        ChargerEvent::Republish => {}
        ChargerEvent::SetFakeCapacity(soc) => dev.lock().await.set_fake_capacity(soc),
        ChargerEvent::SetHealth(health) => dev.lock().await.set_health(health),
        ChargerEvent::SetChargingEnabled(on) => {
            info!("charging-enabled write ({}) accepted but inert", on)
        }
    }
}

/// STAT edge: the chip may have bounced through a transient protection
/// state and reverted our limits; if we believe we are charging and the
/// PWM is back up, rerun the start sequence to restore them.
async fn stat_interrupt<I2C, U>(dev: &SharedFan5404x<I2C>, upstream: &U)
where
    I2C: I2c,
    U: UpstreamSupply,
{
    let mut dev = dev.lock().await;

    if dev.factory_mode() {
        match dev.read1(REG_VBUS_CONTROL).await {
            Ok(ctrl) if ctrl & VBUS_VBUS_CON == 0 => debug!("factory: VBUS connection dropped"),
            Ok(_) => {}
            Err(_) => warn!("unable to read VBUS_CONTROL"),
        }
    }

    let stat = dev.stat().await.ok();
    let fault = dev.fault().await.ok();
    if let (Some(stat), Some(fault)) = (stat, fault) {
        debug!("CONTROL0.STAT: {:02x} CONTROL0.FAULT: {:?}", stat, fault);
    }

    if dev.charging() && stat == Some(STAT_PWM_ENABLED) && dev.start_charging(upstream).await.is_err() {
        warn!("limit restore after STAT edge failed");
    }
}

/// Upstream presence drives start/stop. In factory mode, loss of both
/// presence and online status powers the unit down: manufacturing lines
/// park devices off between stations so fixed batteries do not drain.
async fn external_power_changed<I2C, U, V, S>(
    dev: &SharedFan5404x<I2C>,
    upstream: &U,
    vbus: &mut V,
    system: &mut S,
) where
    I2C: I2c,
    U: UpstreamSupply,
    V: VbusSense,
    S: SystemPower,
{
    let present = match upstream.present() {
        Ok(p) => p,
        Err(_) => {
            warn!("upstream presence unreadable, treating as absent");
            false
        }
    };
    debug!("external power changed: usb={}", present);

    let factory = {
        let mut dev = dev.lock().await;
        dev.usb_present = present;
        let res = if present {
            dev.start_charging(upstream).await
        } else {
            dev.stop_charging().await
        };
        if res.is_err() {
            warn!("charge transition failed; logical state unchanged");
        }
        dev.factory_mode()
    };

    // The poll below must not run under the register lock.
    if factory && !present && upstream.online() == Ok(false) {
        error!("factory: upstream absent and offline, powering down");
        factory_power_down(vbus, system).await;
    }
}

/// Wait for VBUS to decay below the off threshold, then power off the
/// host. The poll is bounded; an ADC failure or an expired deadline
/// proceeds to power-off rather than stranding the unit.
pub async fn factory_power_down<V, S>(vbus: &mut V, system: &mut S)
where
    V: VbusSense,
    S: SystemPower,
{
    let drained = async {
        loop {
            match vbus.vbus_uv() {
                Ok(uv) if uv <= config::VBUS_OFF_THRESHOLD_UV => break,
                Ok(uv) => info!("VBUS still up: {} uV", uv),
                Err(_) => {
                    error!("VBUS ADC read failed");
                    break;
                }
            }
            Timer::after(config::FACTORY_VBUS_POLL_INTERVAL).await;
        }
    };
    if with_timeout(config::FACTORY_VBUS_POLL_TIMEOUT, drained).await.is_err() {
        warn!("VBUS did not drop within the poll deadline");
    }
    system.power_off();
}

/// Forward STAT-pin edges into the event channel. The STAT output is
/// open-drain and signals on both directions.
pub async fn stat_irq_task<P: Wait>(mut pin: P) -> ! {
    let publisher = CHARGER_EVENT_CHANNEL.publisher().unwrap();
    loop {
        pin.wait_for_any_edge().await.ok();
        publisher.publish(ChargerEvent::StatInterrupt).await;
    }
}
