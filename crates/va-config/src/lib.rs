//! va-config: layered INI-style configuration with macro substitution and
//! include resolution (§4.11, §6).

mod ini;
mod loader;
mod macros;
mod model;

pub use ini::{parse, RawConfig, RawSection};
pub use loader::{load, ConfigSource, FsConfigSource};
pub use macros::MacroTable;
pub use model::*;
</content>
