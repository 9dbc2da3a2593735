mod message;
mod query;
mod session;
mod task;

pub use message::*;
pub use query::*;
pub use session::*;
pub use task::*;
