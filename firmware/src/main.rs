#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;

// RISC-V runtime
use riscv_rt as _;

// Panic handler
use panic_halt as _;

use embassy_executor::Spawner;
use static_cell::StaticCell;

use rustybeacon_firmware::*;

/// Messages keyed on the status LED, in rotation
static LED_MESSAGES: [&str; 2] = ["Hello giant world `ar`", "vvv de beacon `sk`"];

/// Messages keyed on the buzzer
static BUZZER_MESSAGES: [&str; 1] = ["cq cq de beacon ~k"];

static LED_SIGNAL: AlarmSignal = AlarmSignal::new();
static BUZZER_SIGNAL: AlarmSignal = AlarmSignal::new();

static LED_BEACON: StaticCell<LedBeacon> = StaticCell::new();
static BUZZER_BEACON: StaticCell<BuzzerBeacon> = StaticCell::new();

/// Main firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    #[cfg(feature = "defmt")]
    defmt::info!("Rusty Beacon Firmware {} starting", VERSION);

    enable_peripheral_clocks();
    configure_systick();

    // Status LED: 10 WPM after a three second pause
    let led = KeyedLine::new(LedPin::new(pins::LED_PIN), false);
    let led_beacon = LED_BEACON.init(Transmitter::new(
        led,
        SignalScheduler::new(&LED_SIGNAL),
        default_config(),
    ));

    spawner.must_spawn(led_alarm_task(led_beacon, &LED_SIGNAL));
    spawner.must_spawn(led_beacon_task(led_beacon, &LED_MESSAGES));

    // Buzzer: 18 WPM with a one second pause. Runs only if TIM1 can
    // produce the carrier.
    let tone = ToneConfig::default();
    let buzzer = BuzzerPwm::new(&tone).and_then(|pwm| KeyedTone::new(pwm, &tone));
    let config = BeaconConfig::new(18, 1_000);
    match (buzzer, config) {
        (Ok(buzzer), Ok(config)) => {
            let buzzer_beacon = BUZZER_BEACON.init(Transmitter::new(
                buzzer,
                SignalScheduler::new(&BUZZER_SIGNAL),
                config,
            ));
            spawner.must_spawn(buzzer_alarm_task(buzzer_beacon, &BUZZER_SIGNAL));
            spawner.must_spawn(buzzer_beacon_task(buzzer_beacon, &BUZZER_MESSAGES));
        }
        _ => {
            #[cfg(feature = "defmt")]
            defmt::warn!("Buzzer beacon disabled: carrier setup failed");
        }
    }

    #[cfg(feature = "defmt")]
    defmt::info!("Beacon firmware ready");

    // Main supervision loop
    loop {
        embassy_time::Timer::after(Duration::from_secs(1)).await;
        #[cfg(feature = "defmt")]
        defmt::trace!("Heartbeat");
    }
}
