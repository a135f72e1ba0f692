//! Dispatch capability trait
//!
//! The one contract every provider adapter implements. An adapter owns
//! its wire protocol end to end: encoding the payload, talking to the
//! backend (directly or through the job poller), and decoding the
//! remote result. It surfaces every failure as a classified
//! [`UnmarkError`](crate::error::UnmarkError).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DispatchRequest, ImagePayload, ProviderId};
use crate::utils::CancelHandle;

/// A provider adapter that removes watermarks from an image through a
/// remote backend.
///
/// Implementations hold only their HTTP client and configuration and no
/// per-request state, so a single adapter value serves any number of
/// concurrent dispatch calls without interference.
#[async_trait]
pub trait WatermarkRemover: Send + Sync {
    /// Identifier this adapter is registered under.
    fn provider_id(&self) -> ProviderId;

    /// Process one image. Returns the processed payload, or a
    /// classified error; never a partial or zero-length success.
    ///
    /// The `cancel` handle is observed at every network round-trip and
    /// poll wait; once it fires, no further requests are issued.
    async fn remove_watermark(
        &self,
        request: &DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<ImagePayload>;
}
