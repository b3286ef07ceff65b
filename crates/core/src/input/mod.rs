pub mod extract;
pub mod graph;
pub mod walk;

pub use extract::{extract_text, ContentExtractor, DEFAULT_EXTRACTORS};
pub use graph::{Input, InputBuilder, InputError, Node, NodeId};
pub use walk::{has_cycle, measure_depth, numeric_leaves, property_count, DepthReport};
