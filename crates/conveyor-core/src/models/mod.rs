//! File metadata records and the durable transfer tasks that mirror their
//! bytes to the remote object store.

mod file;
mod task;

pub use file::*;
pub use task::*;
