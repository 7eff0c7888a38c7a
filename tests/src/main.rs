// Host demo: key the beacon message on the Tokio runtime and print the result

use beacon_core::timing::message_duration;
use beacon_core::BeaconConfig;
use beacon_tests::Harness;

const MESSAGE: &str = "Hello giant world `ar`";

#[tokio::main(flavor = "current_thread", start_paused = true)]
async fn main() {
    println!("Beacon host demo (beacon-core {})", beacon_core::VERSION);

    let config = match BeaconConfig::new(20, 500) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid config: {e}");
            return;
        }
    };
    let unit = config.unit();
    println!(
        "Keying {:?} at {} WPM, expected {} ms",
        MESSAGE,
        config.wpm,
        message_duration(MESSAGE, unit).as_millis()
    );

    let harness = Harness::start(config);
    if !harness.tx.start(MESSAGE) {
        eprintln!("message rejected");
        return;
    }
    harness.wait_idle().await;

    let timeline = harness.output.timeline();
    println!("{}", timeline.to_morse_string(unit));
    println!(
        "{} key-downs over {} ms, outcome {:?}",
        timeline.key_downs(),
        timeline.total().as_millis(),
        harness.tx.last_outcome()
    );
}
