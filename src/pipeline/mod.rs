//! Pipeline stages for intake submissions.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap a projection (e.g. change the remote schema) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! raw ──▶ normalize ──▶ record ─────▶ create record
//! (flat)   (typed)   └▶ markup ────▶ render ▶ attach
//! ```
//!
//! 1. [`normalize`] — recover the typed submission from the flat key space,
//!    including the index-suffixed family group
//! 2. [`record`]    — project the submission onto the record store's schema
//!    (`{"value": …}` wrappers, joined checklists, nested family rows)
//! 3. [`markup`]    — project the same submission onto printable HTML for
//!    the PDF renderer
//!
//! All three stages are pure functions; every network and process boundary
//! lives behind the capability traits in [`crate::store`], [`crate::render`]
//! and [`crate::mail`].

pub mod markup;
pub mod normalize;
pub mod record;
