//! One-shot start gate for the poll loop.

use std::sync::atomic::{AtomicBool, Ordering};

/// Lets exactly one caller start the poll loop. The supervisor owns it,
/// typically as a process-wide `static`.
#[derive(Debug, Default)]
pub struct StartGate {
    started: AtomicBool,
}

impl StartGate {
    pub const fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
        }
    }

    /// `true` for the first caller only.
    pub fn try_start(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_second_start_is_refused() {
        let gate = StartGate::new();
        assert!(gate.try_start());
        assert!(!gate.try_start());
    }

    #[test]
    fn test_one_winner_across_threads() {
        let gate = Arc::new(StartGate::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.try_start())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|started| *started)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_static_gate() {
        static GATE: StartGate = StartGate::new();
        assert!(GATE.try_start());
        assert!(!GATE.try_start());
    }
}
