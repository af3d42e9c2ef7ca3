//! va-events: the low-priority domain-event broadcaster (§4.10).

mod event;
mod manager;

pub use event::*;
pub use manager::{EventHandler, EventManager};
</content>
