//! Provider data structure passed to resources and data sources

use crate::api::Client;

/// `Client` is already a shared handle, so cloning this is cheap
#[derive(Clone)]
pub struct NsxtProviderData {
    pub client: Client,
}

impl NsxtProviderData {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}
