//! Data source implementations

pub mod segment_ports;

pub use segment_ports::{SegmentPortsDataSource, SegmentPortsDataSourceModel};
