//! Event sink port.

use std::sync::Arc;

use crate::domain::PaymentEvent;
use crate::error::DispatchError;

/// Accepts domain events and either records/forwards them or fails.
#[async_trait::async_trait]
pub trait EventDispatcher: Send + Sync + 'static {
    async fn dispatch(&self, event: &PaymentEvent) -> Result<(), DispatchError>;
}

#[async_trait::async_trait]
impl<T: EventDispatcher + ?Sized> EventDispatcher for Arc<T> {
    async fn dispatch(&self, event: &PaymentEvent) -> Result<(), DispatchError> {
        (**self).dispatch(event).await
    }
}
