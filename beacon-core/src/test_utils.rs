//! Test utilities for beacon core functionality

pub mod virtual_time {
    //! Virtual time simulation for deterministic testing

    use crate::controller::Transmitter;
    use crate::hal::{Duration, HalError, Instant, OutputBackend, Scheduler};
    use crate::types::Wake;
    use std::cmp::{Ordering, Reverse};
    use std::collections::BinaryHeap;
    use std::sync::{Arc, Mutex};

    /// Virtual clock and one-shot timer queue.
    ///
    /// Clones share the same clock, so one copy can live inside a
    /// transmitter while the test drives another.
    #[derive(Clone)]
    pub struct VirtualTime {
        inner: Arc<Mutex<VirtualTimeInner>>,
    }

    struct VirtualTimeInner {
        current_time: u64, // milliseconds since start
        next_id: u64,
        scheduled_events: BinaryHeap<Reverse<ScheduledEvent>>,
    }

    #[derive(Debug)]
    struct ScheduledEvent {
        time: u64,
        id: u64,
        wake: Wake,
    }

    // Ties on time resolve in scheduling order.
    impl PartialEq for ScheduledEvent {
        fn eq(&self, other: &Self) -> bool {
            (self.time, self.id) == (other.time, other.id)
        }
    }

    impl Eq for ScheduledEvent {}

    impl PartialOrd for ScheduledEvent {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for ScheduledEvent {
        fn cmp(&self, other: &Self) -> Ordering {
            (self.time, self.id).cmp(&(other.time, other.id))
        }
    }

    impl VirtualTime {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(VirtualTimeInner {
                    current_time: 0,
                    next_id: 0,
                    scheduled_events: BinaryHeap::new(),
                })),
            }
        }

        /// Get current virtual time
        pub fn now(&self) -> Instant {
            let inner = self.inner.lock().unwrap();
            Instant::from_millis(inner.current_time)
        }

        /// Number of wake-ups not yet fired
        pub fn pending(&self) -> usize {
            self.inner.lock().unwrap().scheduled_events.len()
        }

        /// Get delay until the next scheduled event
        pub fn next_event_time(&self) -> Option<Duration> {
            let inner = self.inner.lock().unwrap();
            inner.scheduled_events.peek().map(|event| {
                Duration::from_millis(event.0.time - inner.current_time)
            })
        }

        /// Advance to next scheduled event and hand back its wake token
        pub fn advance_to_next_event(&self) -> Option<Wake> {
            let mut inner = self.inner.lock().unwrap();
            let Reverse(event) = inner.scheduled_events.pop()?;
            inner.current_time = event.time;
            Some(event.wake)
        }

        /// Pop the next event and fire it into `tx`
        pub fn fire_next<B, const N: usize>(&self, tx: &Transmitter<B, VirtualTime, N>) -> Option<Wake>
        where
            B: OutputBackend,
        {
            // The lock is released before firing: the transmitter schedules
            // its next step from inside `fire`.
            let wake = self.advance_to_next_event()?;
            tx.fire(wake);
            Some(wake)
        }

        /// Fire events until the queue drains or `max_events` have fired
        pub fn run_until_idle<B, const N: usize>(
            &self,
            tx: &Transmitter<B, VirtualTime, N>,
            max_events: usize,
        ) -> usize
        where
            B: OutputBackend,
        {
            let mut fired = 0;
            while fired < max_events && self.fire_next(tx).is_some() {
                fired += 1;
            }
            fired
        }

        /// Fire every event due within `duration`, then move the clock to
        /// exactly `now + duration`
        pub fn run_for<B, const N: usize>(&self, tx: &Transmitter<B, VirtualTime, N>, duration: Duration)
        where
            B: OutputBackend,
        {
            let target = self.now().as_millis() + duration.as_millis();
            while let Some(delay) = self.next_event_time() {
                if self.now().as_millis() + delay.as_millis() > target {
                    break;
                }
                self.fire_next(tx);
            }
            self.inner.lock().unwrap().current_time = target;
        }
    }

    impl Default for VirtualTime {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Scheduler for VirtualTime {
        type Handle = u64;

        fn schedule_once(&mut self, delay: Duration, wake: Wake) -> Result<u64, HalError> {
            let mut inner = self.inner.lock().map_err(|_| HalError::TimingError)?;
            let time = inner.current_time + delay.as_millis();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.scheduled_events.push(Reverse(ScheduledEvent { time, id, wake }));
            Ok(id)
        }
    }
}

pub mod output_capture {
    //! Output capture and analysis for testing

    use super::virtual_time::VirtualTime;
    use crate::hal::{Duration, HalError, Instant, OutputBackend};
    use std::string::String;
    use std::sync::{Arc, Mutex};
    use std::vec::Vec;

    /// One `set_output` call
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct OutputEvent {
        pub time: Instant,
        pub on: bool,
    }

    /// A run of constant output level
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Interval {
        pub keyed: bool,
        pub start: Instant,
        pub duration: Duration,
    }

    /// Output backend timestamping every level write against a virtual clock
    #[derive(Clone)]
    pub struct RecordingOutput {
        clock: VirtualTime,
        events: Arc<Mutex<Vec<OutputEvent>>>,
    }

    impl RecordingOutput {
        pub fn new(clock: &VirtualTime) -> Self {
            Self {
                clock: clock.clone(),
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Current output level
        pub fn is_on(&self) -> bool {
            self.events.lock().unwrap().last().map(|e| e.on).unwrap_or(false)
        }

        pub fn events(&self) -> Vec<OutputEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Clear capture buffer
        pub fn clear(&self) {
            self.events.lock().unwrap().clear();
        }

        pub fn timeline(&self) -> Timeline {
            Timeline::from_events(&self.events())
        }
    }

    impl OutputBackend for RecordingOutput {
        type Error = HalError;

        fn set_output(&mut self, on: bool) -> Result<(), Self::Error> {
            let time = self.clock.now();
            self.events.lock().map_err(|_| HalError::GpioError)?.push(OutputEvent { time, on });
            Ok(())
        }
    }

    /// Level changes folded into keyed and silent intervals, from the first
    /// key-down to the last key-up
    #[derive(Debug, Clone, Default)]
    pub struct Timeline {
        intervals: Vec<Interval>,
    }

    impl Timeline {
        pub fn from_events(events: &[OutputEvent]) -> Self {
            let mut intervals = Vec::new();
            let mut current: Option<(bool, Instant)> = None;

            for event in events {
                match current {
                    None if event.on => current = Some((true, event.time)),
                    None => {}
                    Some((level, start)) if level != event.on => {
                        intervals.push(Interval {
                            keyed: level,
                            start,
                            duration: event.time.duration_since(start),
                        });
                        current = Some((event.on, event.time));
                    }
                    Some(_) => {}
                }
            }

            // Drop the trailing silence
            while intervals.last().map(|i| !i.keyed).unwrap_or(false) {
                intervals.pop();
            }
            Self { intervals }
        }

        pub fn intervals(&self) -> &[Interval] {
            &self.intervals
        }

        pub fn key_downs(&self) -> usize {
            self.intervals.iter().filter(|i| i.keyed).count()
        }

        /// Keyed durations in milliseconds
        pub fn keyed_durations(&self) -> Vec<u64> {
            self.intervals
                .iter()
                .filter(|i| i.keyed)
                .map(|i| i.duration.as_millis())
                .collect()
        }

        /// Silent gaps between keyed intervals, in milliseconds
        pub fn gaps(&self) -> Vec<u64> {
            self.intervals
                .iter()
                .filter(|i| !i.keyed)
                .map(|i| i.duration.as_millis())
                .collect()
        }

        /// Time from the first key-down to the last key-up
        pub fn total(&self) -> Duration {
            match (self.intervals.first(), self.intervals.last()) {
                (Some(first), Some(last)) => {
                    (last.start + last.duration).duration_since(first.start)
                }
                _ => Duration::from_millis(0),
            }
        }

        /// Render as Morse text: `.`/`-` for elements, a space between
        /// characters and ` / ` between words. Anything off-grid is `?`.
        pub fn to_morse_string(&self, unit: Duration) -> String {
            let unit = unit.as_millis();
            let mut out = String::new();
            for interval in &self.intervals {
                let units = interval.duration.as_millis() as f64 / unit as f64;
                let rounded = units.round() as u64;
                let on_grid = (units - rounded as f64).abs() < 0.01;
                match (interval.keyed, rounded, on_grid) {
                    (true, 1, true) => out.push('.'),
                    (true, 3, true) => out.push('-'),
                    (false, 1, true) => {}
                    (false, 3, true) => out.push(' '),
                    (false, 7, true) => out.push_str(" / "),
                    _ => out.push('?'),
                }
            }
            out
        }
    }
}
