/// ==============================================================================================
/// ======================================= Scheduled Events ======================================
/// ==============================================================================================
//
// Events are integer-timed discrete changes applied at tick boundaries, between SSA phases.
// `spec.md` §4.4 defines the four kinds and their semantics; this module is the data type plus
// construction-time validation. Application lives in `node::apply_event` (it needs mutable access
// to node state and a worker RNG, which this module deliberately does not hold).

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    Exit = 0,
    Enter = 1,
    InternalTransfer = 2,
    ExternalTransfer = 3,
}

impl EventKind {
    pub fn from_code(code: u8) -> Result<Self, SimError> {
        match code {
            0 => Ok(EventKind::Exit),
            1 => Ok(EventKind::Enter),
            2 => Ok(EventKind::InternalTransfer),
            3 => Ok(EventKind::ExternalTransfer),
            other => Err(SimError::invalid_input(format!(
                "unknown event kind code {other}"
            ))),
        }
    }
}

/// One scheduled event. `node`/`dest` are 0-based internally (the external interface's 1-based
/// `node >= 1` convention from `spec.md` §6 is translated at `Model::new` time).
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub time: i64,
    pub node: usize,
    pub dest: Option<usize>,
    pub n: u64,
    pub proportion: f64,
    pub select: usize,
    pub shift: Option<usize>,
}

impl Event {
    pub fn validate(&self, n_nodes: usize, n_select: usize, n_shift: usize) -> Result<(), SimError> {
        if self.time <= 0 {
            return Err(SimError::invalid_input(format!(
                "event time must be a positive integer, got {}",
                self.time
            )));
        }
        if self.node >= n_nodes {
            return Err(SimError::invalid_input(format!(
                "event references node {} but there are only {n_nodes} nodes",
                self.node
            )));
        }
        if self.select >= n_select {
            return Err(SimError::invalid_input(format!(
                "event select column {} out of range (Nselect={n_select})",
                self.select
            )));
        }
        if !(0.0..=1.0).contains(&self.proportion) {
            return Err(SimError::invalid_input(format!(
                "event proportion must be in [0, 1], got {}",
                self.proportion
            )));
        }
        match self.kind {
            EventKind::ExternalTransfer => {
                let Some(dest) = self.dest else {
                    return Err(SimError::invalid_input(
                        "EXTERNAL_TRANSFER event requires a dest node",
                    ));
                };
                if dest >= n_nodes {
                    return Err(SimError::invalid_input(format!(
                        "event dest node {dest} out of range ({n_nodes} nodes)"
                    )));
                }
            }
            EventKind::InternalTransfer => {
                let Some(shift) = self.shift else {
                    return Err(SimError::invalid_input(
                        "INTERNAL_TRANSFER event requires a shift column",
                    ));
                };
                if shift >= n_shift {
                    return Err(SimError::invalid_input(format!(
                        "event shift column {shift} out of range (Nshift={n_shift})"
                    )));
                }
            }
            EventKind::Exit | EventKind::Enter => {
                if self.shift.is_some() {
                    return Err(SimError::invalid_input(
                        "shift must be unset unless kind is INTERNAL_TRANSFER",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Sort events by `(time, kind, select)`, the order `spec.md` §4.4 mandates within a tick.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.time
            .cmp(&b.time)
            .then(a.kind.cmp(&b.kind))
            .then(a.select.cmp(&b.select))
    });
}
