//! unmark
//!
//! A unified watermark-removal API interface library. One dispatch
//! contract fronts a set of remote image-processing providers with
//! wildly different wire protocols (multipart submit with numeric
//! job states, poll-URL workflows, prediction resources, and chat
//! surfaces that can only describe what they see) and normalizes
//! every outcome into a processed [`ImagePayload`](types::ImagePayload)
//! or one classified [`UnmarkError`](error::UnmarkError).
#![deny(unsafe_code)]

pub mod codec;
pub mod error;
pub mod poller;
pub mod providers;
pub mod registry;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::{ErrorCategory, UnmarkError};
pub use registry::ProviderRegistry;
pub use traits::WatermarkRemover;
pub use types::{DispatchRequest, ImagePayload, Job, JobStatus, ProviderConfig, ProviderId};
pub use utils::CancelHandle;
