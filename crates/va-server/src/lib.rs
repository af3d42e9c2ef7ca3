//! va-server: the core facade tying every manager together (§2 component
//! 12) plus the two pieces of state it alone owns — global (unversioned)
//! state and the RAII scene transaction guard.

mod global;
mod server;
mod transaction;

pub use global::GlobalState;
pub use server::VaServer;
pub use transaction::SceneTransaction;
