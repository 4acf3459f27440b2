pub mod registry;
pub mod session;

pub use registry::{Bus, SessionId};
pub use session::{Delivery, Mailbox};
