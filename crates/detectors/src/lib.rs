pub mod anomaly;
pub mod input_validator;
pub mod mock_usage;
pub mod security;

use std::sync::Arc;

use riskguard::config::Config;
use riskguard::detector::Detector;
use riskguard::history::HistoryStore;
use riskguard::scorer::Scorer;
use riskguard::ConfigError;

pub use anomaly::AnomalyDetector;
pub use input_validator::InputValidator;
pub use mock_usage::MockUsageDetector;
pub use security::SecurityDetector;

/// Returns all built-in detectors
pub fn all_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(InputValidator),
        Box::new(SecurityDetector),
        Box::new(MockUsageDetector),
        Box::new(AnomalyDetector::new()),
    ]
}

/// Built-in detectors, with the anomaly detector using the given history store.
pub fn all_detectors_with_history(history: Arc<dyn HistoryStore>) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(InputValidator),
        Box::new(SecurityDetector),
        Box::new(MockUsageDetector),
        Box::new(AnomalyDetector::with_history(history)),
    ]
}

/// A scorer with every built-in detector registered.
pub fn default_scorer(config: Config) -> Result<Scorer, ConfigError> {
    Scorer::with_detectors(config, all_detectors())
}
