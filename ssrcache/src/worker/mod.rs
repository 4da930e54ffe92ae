//! The default [`RenderWorker`](crate::pool::RenderWorker).
//!
//! [`PageWorker`] owns the write side of the tier protocol:
//!
//! ```text
//! publish:     write Raw ──► transform ──► write Fresh ──► remove Raw, Renewing
//! revalidate:  Fresh ──rename──► Renewing ──► render ──► publish
//!                                   └── render failed: Renewing ──rename──► Fresh
//! ```
//!
//! HTML comes from a [`Renderer`]; [`ExternalRenderer`] shells out to a
//! configured command.

mod page;
mod renderer;

pub use page::{delete_resource, PageWorker};
pub use renderer::{ExternalRenderer, Renderer, DEFAULT_RENDER_TIMEOUT, URL_PLACEHOLDER};
