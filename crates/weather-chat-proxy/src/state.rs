//! Proxy application state.

use std::sync::Arc;

use crate::config::ProxyConfig;
use crate::genai::InteractionsApi;

/// Shared application state for the proxy.
pub struct ProxyState<A>
where
    A: InteractionsApi,
{
    /// The interactions backend.
    pub api: Arc<A>,
    /// Proxy configuration.
    pub config: ProxyConfig,
}

impl<A> ProxyState<A>
where
    A: InteractionsApi,
{
    /// Create a new proxy state.
    #[must_use]
    pub fn new(api: Arc<A>, config: ProxyConfig) -> Self {
        Self { api, config }
    }
}

impl<A> Clone for ProxyState<A>
where
    A: InteractionsApi,
{
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            config: self.config.clone(),
        }
    }
}
