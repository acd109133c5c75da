//! Resource implementations

pub mod segment_port;

pub use segment_port::{SegmentPortResource, SegmentPortResourceModel};
