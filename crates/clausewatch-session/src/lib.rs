//! One user's analysis session: state, transitions and rendering.
//!
//! [`SessionController`] owns the [`Session`] and is the only thing that
//! mutates it. Submitting runs [`AnalysisPipeline`] (select a model, build the
//! prompt, complete, parse) and moves the session to its result view.

mod controller;
mod pipeline;
mod state;
pub mod view;

pub use controller::SessionController;
pub use pipeline::{Analysis, AnalysisPipeline};
pub use state::{ResultStep, Session, View};
