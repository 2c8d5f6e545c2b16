//! Translation overlays
//!
//! Overlays are per-language partial patches stored next to the documents.
//! [`Merger`] applies them to a projected document without touching it, and
//! [`Localizer`] fetches them for one subject on a best-effort basis.

pub mod localizer;
pub mod merge;
pub mod overlay;

pub use localizer::Localizer;
pub use merge::Merger;
pub use overlay::{Localized, OverlaySet, Subject, SubjectRef, TranslationOverlay};
