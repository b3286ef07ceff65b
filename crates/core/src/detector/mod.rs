pub mod context;
pub mod registry;
pub mod traits;

pub use context::Context;
pub use registry::{DetectorRegistry, DetectorRun};
pub use traits::{Detector, DetectorError};
