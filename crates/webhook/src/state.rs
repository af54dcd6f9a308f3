use std::sync::Arc;

use crate::config::WebhookConfig;
use crate::upstream::ApiClient;

/// Shared state for webhook handlers. Cheaply cloneable.
#[derive(Clone)]
pub struct WebhookState {
    /// Client for the API gateway.
    pub api: Arc<ApiClient>,
    pub config: Arc<WebhookConfig>,
}
