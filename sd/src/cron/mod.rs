//! Timer-driven background tasks
//!
//! Three independent interval loops: the periodic enqueuer (worklist →
//! queued tasks), the retention sweeper (evicts old terminal records),
//! and the health monitor (statistics + long-running-job warnings).
//! Faults inside a cycle are logged; the timer continues on its next
//! cycle.

mod enqueuer;
mod monitor;
mod sweeper;

pub use enqueuer::PeriodicEnqueuer;
pub use monitor::HealthMonitor;
pub use sweeper::RetentionSweeper;
