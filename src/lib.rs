//! frame-delivery - localized content delivery
//!
//! Turns schema-described documents from the content and menu services into
//! API-shaped, localized records.
//!
//! ## Subsystems
//!
//! - **Projection**: field-type driven value shaping through a projector registry
//! - **Rich text**: stored markup to a block/leaf node tree
//! - **Translation**: best-effort overlay fetching and pure, identity-keyed merging
//! - **Tree**: depth-bounded section and menu trees, following menu references
//! - **Delivery**: entry pages, section trees and menu trees as served over HTTP

pub mod config;
pub mod context;
pub mod delivery;
pub mod projection;
pub mod rich_text;
pub mod server;
pub mod translation;
pub mod tree;
pub mod types;
pub mod upstream;

pub use config::Args;
pub use context::{RequestContext, Scope};
pub use delivery::{Delivery, DeliveryConfig};
pub use server::{run, AppState};
pub use types::{DeliveryError, Result};
