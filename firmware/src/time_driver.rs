//! SysTick-driven embassy time driver for CH32V203
//!
//! One tick per millisecond and a single alarm, which is all the generic
//! timer queue needs.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time_driver::{AlarmHandle, Driver};
use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::ch32v203_hardware::clear_systick_flag;

struct AlarmState {
    timestamp: Cell<u64>,
    callback: Cell<Option<(fn(*mut ()), *mut ())>>,
}

// Only touched inside critical sections on a single core.
unsafe impl Send for AlarmState {}

/// Tick counter plus one alarm slot
pub struct SysTickDriver {
    ticks: AtomicU64,
    alarm_taken: AtomicBool,
    alarm: Mutex<AlarmState>,
}

impl SysTickDriver {
    const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            alarm_taken: AtomicBool::new(false),
            alarm: Mutex::new(AlarmState {
                timestamp: Cell::new(u64::MAX),
                callback: Cell::new(None),
            }),
        }
    }

    /// Advance time and run the alarm callback when due
    fn on_tick(&self) {
        let now = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let due = critical_section::with(|cs| {
            let alarm = self.alarm.borrow(cs);
            if alarm.timestamp.get() > now {
                return None;
            }
            alarm.timestamp.set(u64::MAX);
            alarm.callback.get()
        });
        if let Some((callback, ctx)) = due {
            callback(ctx);
        }
    }
}

impl Driver for SysTickDriver {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    unsafe fn allocate_alarm(&self) -> Option<AlarmHandle> {
        if self.alarm_taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(AlarmHandle::new(0))
    }

    fn set_alarm_callback(&self, _alarm: AlarmHandle, callback: fn(*mut ()), ctx: *mut ()) {
        critical_section::with(|cs| {
            self.alarm.borrow(cs).callback.set(Some((callback, ctx)));
        });
    }

    fn set_alarm(&self, _alarm: AlarmHandle, timestamp: u64) -> bool {
        critical_section::with(|cs| {
            let alarm = self.alarm.borrow(cs);
            if timestamp <= self.now() {
                // Already due: the caller handles it without a callback
                alarm.timestamp.set(u64::MAX);
                false
            } else {
                alarm.timestamp.set(timestamp);
                true
            }
        })
    }
}

embassy_time_driver::time_driver_impl!(static DRIVER: SysTickDriver = SysTickDriver::new());

/// SysTick interrupt handler
#[no_mangle]
extern "C" fn SysTick() {
    clear_systick_flag();
    DRIVER.on_tick();
}

// Critical section implementation for single-core RISC-V
critical_section::set_impl!(RiscvCriticalSection);

struct RiscvCriticalSection;

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mstatus = riscv::register::mstatus::read();
        riscv::register::mstatus::clear_mie();
        mstatus.mie() as u8
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled != 0 {
            riscv::register::mstatus::set_mie();
        }
    }
}
