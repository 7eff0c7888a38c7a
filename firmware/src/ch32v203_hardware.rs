//! CH32V203 Hardware Implementation
//!
//! 64KB Flash / 20KB RAM. Register-level GPIO and TIM1 access for the two
//! beacon outputs: a status LED line and a buzzer carrier.

use core::convert::Infallible;

use beacon_core::{HalError, ToneConfig};
use embedded_hal::digital::{ErrorType as DigitalErrorType, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};

/// Core clock after reset: HSI, no PLL
pub const HCLK_HZ: u32 = 8_000_000;

const RCC_BASE: u32 = 0x4002_1000;
const GPIOA_BASE: u32 = 0x4001_0800;
const TIM1_BASE: u32 = 0x4001_2C00;
const STK_BASE: u32 = 0xE000_F000;
const PFIC_BASE: u32 = 0xE000_E000;

const RCC_APB2PCENR: u32 = 0x18;

const GPIO_CRL: u32 = 0x00;
const GPIO_CRH: u32 = 0x04;
const GPIO_BSHR: u32 = 0x10;

const TIM_CR1: u32 = 0x00;
const TIM_CCMR1: u32 = 0x18;
const TIM_CCER: u32 = 0x20;
const TIM_PSC: u32 = 0x28;
const TIM_ARR: u32 = 0x2C;
const TIM_CCR1: u32 = 0x34;
const TIM_BDTR: u32 = 0x44;

const STK_CTLR: u32 = 0x00;
const STK_SR: u32 = 0x04;
const STK_CMPLR: u32 = 0x10;

const PFIC_IENR1: u32 = 0x100;
const SYSTICK_IRQ: u32 = 12;

/// CH32V203 pin assignment
pub mod pins {
    /// Status LED, push-pull
    pub const LED_PIN: u8 = 1; // PA1

    /// Buzzer, TIM1_CH1 alternate function
    pub const BUZZER_PIN: u8 = 8; // PA8
}

unsafe fn modify(addr: u32, f: impl FnOnce(u32) -> u32) {
    let reg = addr as *mut u32;
    core::ptr::write_volatile(reg, f(core::ptr::read_volatile(reg)));
}

/// Enable GPIOA, AFIO and TIM1 clocks
pub fn enable_peripheral_clocks() {
    unsafe {
        // Bit 0 = AFIO, Bit 2 = GPIOA, Bit 11 = TIM1
        modify(RCC_BASE + RCC_APB2PCENR, |v| v | (1 << 0) | (1 << 2) | (1 << 11));
    }
}

/// Configure a 1 kHz SysTick compare interrupt for the time driver
pub fn configure_systick() {
    unsafe {
        core::ptr::write_volatile((STK_BASE + STK_CMPLR) as *mut u32, HCLK_HZ / 1_000 - 1);
        core::ptr::write_volatile((STK_BASE + STK_SR) as *mut u32, 0);
        // STE | STIE | STCLK (HCLK) | STRE (auto-reload)
        core::ptr::write_volatile((STK_BASE + STK_CTLR) as *mut u32, (1 << 0) | (1 << 1) | (1 << 2) | (1 << 5));
        modify(PFIC_BASE + PFIC_IENR1, |v| v | (1 << SYSTICK_IRQ));
    }
}

/// Acknowledge the SysTick compare flag
pub fn clear_systick_flag() {
    unsafe {
        core::ptr::write_volatile((STK_BASE + STK_SR) as *mut u32, 0);
    }
}

/// Status LED on a GPIOA push-pull output
pub struct LedPin {
    pin: u8,
}

impl LedPin {
    pub fn new(pin: u8) -> Self {
        unsafe {
            // CNF=00 (push-pull), MODE=11 (50MHz output)
            let shift = (pin as u32 % 8) * 4;
            let cr = if pin < 8 { GPIO_CRL } else { GPIO_CRH };
            modify(GPIOA_BASE + cr, |v| (v & !(0xF << shift)) | (0x3 << shift));
        }
        let mut led = Self { pin };
        led.write(false);
        led
    }

    fn write(&mut self, high: bool) {
        // BSHR: low half sets, high half resets
        let bit = if high { 1 << self.pin } else { 1 << (self.pin + 16) };
        unsafe {
            core::ptr::write_volatile((GPIOA_BASE + GPIO_BSHR) as *mut u32, bit);
        }
    }
}

impl DigitalErrorType for LedPin {
    type Error = Infallible;
}

impl OutputPin for LedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

/// Buzzer carrier on TIM1 channel 1 (PA8).
///
/// The period is fixed at construction from the tone frequency; keying only
/// moves the compare value.
pub struct BuzzerPwm {
    reload: u16,
}

impl BuzzerPwm {
    /// Configure TIM1 for PWM mode 1 at `tone.frequency_hz`, output silent
    pub fn new(tone: &ToneConfig) -> Result<Self, HalError> {
        let params = tone.timer_params(HCLK_HZ).ok_or(HalError::InvalidConfig)?;

        unsafe {
            // PA8: CNF=10 (AF push-pull), MODE=11 (50MHz output)
            let shift = (pins::BUZZER_PIN as u32 - 8) * 4;
            modify(GPIOA_BASE + GPIO_CRH, |v| (v & !(0xF << shift)) | (0xB << shift));

            core::ptr::write_volatile((TIM1_BASE + TIM_PSC) as *mut u32, params.prescaler as u32);
            core::ptr::write_volatile((TIM1_BASE + TIM_ARR) as *mut u32, params.reload as u32);
            core::ptr::write_volatile((TIM1_BASE + TIM_CCR1) as *mut u32, 0);
            // PWM mode 1, preload enable
            core::ptr::write_volatile((TIM1_BASE + TIM_CCMR1) as *mut u32, (0x6 << 4) | (1 << 3));
            // CC1E
            core::ptr::write_volatile((TIM1_BASE + TIM_CCER) as *mut u32, 1);
            // MOE, required on the advanced timer
            core::ptr::write_volatile((TIM1_BASE + TIM_BDTR) as *mut u32, 1 << 15);
            // ARPE | CEN
            core::ptr::write_volatile((TIM1_BASE + TIM_CR1) as *mut u32, (1 << 7) | 1);
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "TIM1 carrier {} Hz: psc={} arr={}",
            tone.frequency_hz,
            params.prescaler,
            params.reload
        );

        Ok(Self { reload: params.reload })
    }
}

impl PwmErrorType for BuzzerPwm {
    type Error = Infallible;
}

impl SetDutyCycle for BuzzerPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.reload
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        unsafe {
            core::ptr::write_volatile((TIM1_BASE + TIM_CCR1) as *mut u32, duty as u32);
        }
        Ok(())
    }
}
