//! Element scheduler: the state machine walking a session
//!
//! Every method here runs inside the transmitter's critical section, either
//! from `start` (to schedule the settling pause) or from a fired wake-up.
//! The stop check happens in [`MorseFsm::on_wake`] before anything touches
//! the session or the scheduler, and [`MorseFsm::release`] is the only
//! place a session is dropped.

use heapless::String;

use crate::code::{encode, PROSIGN_MARKER, SKIP_MARKER};
use crate::controller::TxStatus;
use crate::hal::{Duration, OutputBackend, Scheduler};
use crate::session::{Session, MESSAGE_CAPACITY};
use crate::types::{Element, Step, TxOutcome, TxState, Wake};

/// Main transmitter FSM, generic over output backend and timer service
pub struct MorseFsm<B, S, const N: usize = MESSAGE_CAPACITY> {
    backend: B,
    scheduler: S,
    session: Option<Session<N>>,
    state: TxState,
    generation: u32,
    last_outcome: Option<TxOutcome>,
}

impl<B, S, const N: usize> MorseFsm<B, S, N>
where
    B: OutputBackend,
    S: Scheduler,
{
    pub fn new(backend: B, scheduler: S) -> Self {
        Self {
            backend,
            scheduler,
            session: None,
            state: TxState::Idle,
            generation: 0,
            last_outcome: None,
        }
    }

    /// Get current FSM state
    pub fn current_state(&self) -> TxState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<TxOutcome> {
        self.last_outcome
    }

    pub fn session(&self) -> Option<&Session<N>> {
        self.session.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Create a session and schedule the settling pause.
    /// The caller has already checked that no session is active.
    pub fn begin(&mut self, message: String<N>, pre_tx_pause: Duration, status: &TxStatus) {
        self.generation = self.generation.wrapping_add(1);
        self.set_output(false);
        self.session = Some(Session::new(message, self.generation));
        self.state = TxState::PreTxPause;
        info!("Session {} accepted", self.generation);
        self.schedule(pre_tx_pause, Step::PreTxPause, status);
    }

    /// Advance the machine for a fired wake-up
    pub fn on_wake(&mut self, wake: Wake, unit: Duration, status: &TxStatus) {
        let accepted = match self.session.as_mut() {
            Some(session) => session.accept(wake),
            None => false,
        };
        if !accepted {
            trace!("Ignoring stale wake {:?}", wake);
            return;
        }

        if status.stop_requested() {
            self.release(TxOutcome::Stopped, status);
            return;
        }

        match wake.step() {
            Step::PreTxPause => self.walk_character(unit, status),
            Step::ElementEnd => self.element_elapsed(unit, status),
            Step::GapEnd => self.gap_elapsed(unit, status),
        }
    }

    /// Consume control markers until a symbol is found or the message ends
    fn walk_character(&mut self, unit: Duration, status: &TxStatus) {
        self.state = TxState::WalkCharacter;
        loop {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            match session.current_char() {
                None => {
                    self.release(TxOutcome::Completed, status);
                    return;
                }
                Some(SKIP_MARKER) => session.advance(),
                Some(PROSIGN_MARKER) => {
                    session.toggle_digraph();
                    session.advance();
                }
                Some(c) => {
                    let code = encode(c);
                    if code.is_word_space() && !session.keyed_symbol_follows() {
                        // Nothing left to key: no trailing silence
                        self.release(TxOutcome::Completed, status);
                        return;
                    }
                    session.begin_symbol(code, unit);
                    break;
                }
            }
        }
        self.emit_element(unit, status);
    }

    fn emit_element(&mut self, unit: Duration, status: &TxStatus) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let symbol_unit = session.unit();

        if session.code().is_word_space() {
            self.set_output(false);
            self.state = TxState::WordGap;
            status.set_transmitting(true);
            self.schedule(Element::WordSpace.duration(symbol_unit), Step::ElementEnd, status);
            return;
        }

        let Some(element) = session.current_element() else {
            // Only an empty code gets here; treat it as finished
            self.symbol_finished(unit, status);
            return;
        };
        if !status.is_transmitting() {
            debug!("Keying started");
        }
        status.set_transmitting(true);
        self.set_output(true);
        self.state = TxState::EmitElement;
        self.schedule(element.duration(symbol_unit), Step::ElementEnd, status);
    }

    fn element_elapsed(&mut self, unit: Duration, status: &TxStatus) {
        self.set_output(false);
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.code().is_word_space() {
            // The word gap was the whole symbol; no character gap follows
            session.advance();
            self.walk_character(unit, status);
            return;
        }

        session.next_element();
        if session.has_more_elements() {
            let gap = Element::ElementSpace.duration(session.unit());
            self.state = TxState::ElementGap;
            self.schedule(gap, Step::GapEnd, status);
        } else {
            self.symbol_finished(unit, status);
        }
    }

    /// Pick the gap after the last element of a character
    fn symbol_finished(&mut self, unit: Duration, status: &TxStatus) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if !session.keyed_symbol_follows() {
            self.release(TxOutcome::Completed, status);
            return;
        }

        if session.upcoming_symbol() == Some(' ') {
            // The word-space symbol carries the whole 7-unit gap
            session.advance();
            self.walk_character(unit, status);
            return;
        }

        let (gap, state) = if session.digraph() {
            (Element::ElementSpace, TxState::ElementGap)
        } else {
            (Element::CharSpace, TxState::CharacterGap)
        };
        let delay = gap.duration(session.unit());
        self.state = state;
        self.schedule(delay, Step::GapEnd, status);
    }

    fn gap_elapsed(&mut self, unit: Duration, status: &TxStatus) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.has_more_elements() {
            self.emit_element(unit, status);
        } else {
            session.advance();
            self.walk_character(unit, status);
        }
    }

    fn schedule(&mut self, delay: Duration, step: Step, status: &TxStatus) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let wake = Wake::new(session.generation(), step);
        match self.scheduler.schedule_once(delay, wake) {
            Ok(_) => session.set_pending(step),
            Err(_) => {
                warn!("Scheduler refused {:?}", step);
                self.release(TxOutcome::Faulted, status);
            }
        }
    }

    /// Single teardown path: unkey, drop the session, clear status
    fn release(&mut self, outcome: TxOutcome, status: &TxStatus) {
        self.set_output(false);
        self.session = None;
        self.state = TxState::Idle;
        self.last_outcome = Some(outcome);
        status.clear();
        info!("Session {} released: {:?}", self.generation, outcome);
    }

    fn set_output(&mut self, on: bool) {
        if self.backend.set_output(on).is_err() {
            warn!("Output fault while setting {}", on);
        }
    }
}
