use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::debug;

use super::context::Context;
use super::traits::{Detector, DetectorError};
use crate::finding::{CheckResult, CheckType};
use crate::input::Input;

/// Outcome of running one detector.
#[derive(Debug)]
pub struct DetectorRun {
    pub name: String,
    pub check_type: CheckType,
    pub outcome: Result<CheckResult, DetectorError>,
}

/// Registry that holds detectors keyed by name and runs them against inputs.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Register a detector. A detector with the same name is replaced in place.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        match self
            .detectors
            .iter_mut()
            .find(|d| d.name() == detector.name())
        {
            Some(slot) => *slot = detector,
            None => self.detectors.push(detector),
        }
    }

    /// Register multiple detectors at once
    pub fn register_all(&mut self, detectors: Vec<Box<dyn Detector>>) {
        for detector in detectors {
            self.register(detector);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Detector> {
        self.detectors
            .iter()
            .find(|d| d.name() == name)
            .map(|d| d.as_ref())
    }

    /// List all registered detector names, in registration order
    pub fn list_detectors(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector whose check type is in `enabled`, in parallel.
    /// Results come back in registration order. Panics are contained per detector.
    pub fn run_enabled(
        &self,
        enabled: &[CheckType],
        input: &Input,
        context: Option<&Context>,
    ) -> Vec<DetectorRun> {
        self.detectors
            .par_iter()
            .filter(|d| enabled.contains(&d.check_type()))
            .map(|d| run_one(d.as_ref(), input, context))
            .collect()
    }
}

pub(crate) fn run_one(detector: &dyn Detector, input: &Input, context: Option<&Context>) -> DetectorRun {
    debug!(detector = detector.name(), "running detector");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(input, context)))
        .unwrap_or_else(|_| {
            Err(DetectorError::Panicked {
                detector: detector.name().to_string(),
            })
        });
    DetectorRun {
        name: detector.name().to_string(),
        check_type: detector.check_type(),
        outcome,
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
