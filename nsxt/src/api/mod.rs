//! NSX-T Policy API

pub mod client;
pub mod error;
pub mod response;
pub mod segment_ports;
pub mod session;

pub use client::{
    BasicAuth, Client, ClientBuilder, HttpRequestDoer, RequestEditor, SessionAuth,
};
pub use error::ApiError;
pub use segment_ports::{
    AdminState, AttachmentType, ListSegmentPortsResponse, PortAddressBindingEntry,
    PortAttachment, SegmentPort, SegmentPortsApi,
};
pub use session::SessionInfo;
