//! Application layer orchestrating domain logic and infrastructure.

pub mod locator;
pub mod reconcile;
pub mod report;
pub mod scan;
pub mod session;
pub mod watch;
