//! Shared data model and document formats for `SmartDo`.

pub mod codec;
pub mod incoming;
pub mod task;
