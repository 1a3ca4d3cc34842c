//! Dispatch engine: lane bookkeeping, flush scheduling, and the server loop.

pub(crate) mod lanes;
pub(crate) mod schedule;
pub(crate) mod server;
