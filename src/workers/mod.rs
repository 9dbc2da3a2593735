mod dispatcher;
mod retention;

pub use dispatcher::{WorkQueue, dispatch_loop};
pub use retention::retention_sweep_loop;
