//! Halting service escalating repeated cycle failures

use crate::strategy::data::CycleReport;

/// Halt struct containing reasoning and status
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Halt {
    /// The current halt status
    pub status: HaltStatus,
    /// Failing cycles in a row tolerated before halting. `0` never halts.
    pub max_consecutive_failures: u32,
    /// The halt message (if the status is not `Functional`)
    pub message: Option<String>,
}

/// Halt Status enum determining the stage the harvester is at
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HaltStatus {
    /// Functioning as expected
    Functional,
    /// The last cycles failed but the bound is not reached yet.
    /// The loop keeps running normally in this stage.
    HaltingInProgress { failing_cycles: u32 },
    /// Fully halted
    Halted { failing_cycles: u32 },
}

impl Halt {
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self {
            status: HaltStatus::Functional,
            max_consecutive_failures,
            message: None,
        }
    }

    /// Returns `true` if the harvester is not `Halted`
    pub fn is_functional(&self) -> bool {
        !matches!(self.status, HaltStatus::Halted { .. })
    }

    /// Updates the status with the outcome of the last cycle
    pub fn record(&mut self, report: &CycleReport) -> &HaltStatus {
        if !self.is_functional() {
            return &self.status;
        }

        if !report.has_failures() {
            self.status = HaltStatus::Functional;
            self.message = None;
            return &self.status;
        }

        let failing_cycles = match self.status {
            HaltStatus::HaltingInProgress { failing_cycles } => failing_cycles.saturating_add(1),
            _ => 1,
        };
        let message = report
            .failures
            .last()
            .map(|(stage, err)| format!("last failure in the {}: {}", stage, err));

        if self.max_consecutive_failures != 0 && failing_cycles >= self.max_consecutive_failures {
            self.status = HaltStatus::Halted { failing_cycles };
            self.message = Some(format!(
                "{} consecutive cycles failed, {}",
                failing_cycles,
                message.unwrap_or_default()
            ));
        } else {
            self.status = HaltStatus::HaltingInProgress { failing_cycles };
            self.message = message;
        }
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{strategy::data::Stage, utils::error::HarvesterError};

    fn failing() -> CycleReport {
        let mut report = CycleReport::default();
        report.failed(
            Stage::PoolCount,
            HarvesterError::Transport("connection refused".to_string()),
        );
        report
    }

    #[test]
    fn halts_after_the_bound() {
        let mut halt = Halt::new(3);

        assert_eq!(
            halt.record(&failing()),
            &HaltStatus::HaltingInProgress { failing_cycles: 1 }
        );
        halt.record(&failing());
        assert!(halt.is_functional());
        assert_eq!(halt.record(&failing()), &HaltStatus::Halted { failing_cycles: 3 });
        assert!(!halt.is_functional());
        assert!(halt.message.as_deref().unwrap().contains("pool count"));
    }

    #[test]
    fn a_clean_cycle_resets_the_count() {
        let mut halt = Halt::new(2);
        halt.record(&failing());
        assert_eq!(halt.record(&CycleReport::default()), &HaltStatus::Functional);
        assert_eq!(
            halt.record(&failing()),
            &HaltStatus::HaltingInProgress { failing_cycles: 1 }
        );
        assert!(halt.is_functional());
    }

    #[test]
    fn zero_never_halts() {
        let mut halt = Halt::new(0);
        for _ in 0..100 {
            halt.record(&failing());
        }
        assert!(halt.is_functional());
        assert_eq!(
            halt.status,
            HaltStatus::HaltingInProgress {
                failing_cycles: 100
            }
        );
    }

    #[test]
    fn halted_is_final() {
        let mut halt = Halt::new(1);
        halt.record(&failing());
        assert_eq!(
            halt.record(&CycleReport::default()),
            &HaltStatus::Halted { failing_cycles: 1 }
        );
    }
}
