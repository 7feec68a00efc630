//! Debounced live preview.
//!
//! [`RenderScheduler`] holds the decisions (debounce, single flight, staleness)
//! as a pure state machine over explicit instants. [`LivePreview`] runs it on
//! tokio: it owns the debounce timer and the one in-flight render task, and
//! forwards results to a [`PreviewDisplay`] and failures to the notification
//! sink.

mod display;
mod driver;
mod scheduler;

pub use display::{preview_document, FileDisplay};
pub use driver::{LivePreview, PreviewBackend, PreviewDisplay, PreviewHandle};
pub use scheduler::{
    PreviewState, PreviewStats, RenderScheduler, RenderTicket, Settled, TimerOutcome,
    DEFAULT_DEBOUNCE,
};
