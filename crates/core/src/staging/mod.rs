//! Local staging area for uploaded files.
//!
//! Files land here when the client sends them and are removed once the
//! flow that consumed them has finished. Files a flow could not remove are
//! collected later by [`LocalStaging::sweep`].

mod error;
mod local;

pub use error::StagingError;
pub use local::{LocalStaging, SweepReport};
