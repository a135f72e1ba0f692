//! WatermarkRemover.io (PixelBin) adapter
//!
//! PixelBin's upload flow needs a server-side step this client cannot
//! perform: a backend holding the admin credentials must issue a signed
//! upload URL before the image can be stored and the `wm.remove()`
//! transformation applied. Without that backend there is nothing to
//! call, so the adapter fails immediately; it never touches the
//! network.

use async_trait::async_trait;

use crate::error::{Result, UnmarkError};
use crate::traits::WatermarkRemover;
use crate::types::{DispatchRequest, ImagePayload, ProviderId};
use crate::utils::CancelHandle;

use super::require_api_key;

const KEY_GUIDANCE: &str =
    "Create a token in the PixelBin dashboard under Settings > Tokens.";

/// PixelBin adapter
#[derive(Debug, Clone, Default)]
pub struct PixelbinRemover;

impl PixelbinRemover {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WatermarkRemover for PixelbinRemover {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Pixelbin
    }

    async fn remove_watermark(
        &self,
        request: &DispatchRequest,
        _cancel: &CancelHandle,
    ) -> Result<ImagePayload> {
        require_api_key(&request.config, KEY_GUIDANCE)?;

        Err(UnmarkError::InfrastructureRequired(
            "PixelBin needs a backend service: signed upload URLs can only be issued with \
             the admin SDK, after which the image is uploaded and the wm.remove() \
             transformation applied server-side. Use the picwish or segmind provider for a \
             client-only setup."
                .to_string(),
        ))
    }
}
