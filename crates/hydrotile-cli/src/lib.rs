//! The `hydrotile` command: fetch the terrain tiles covering an area
//! of interest and run the hydrological pipeline over them.

pub mod args;
pub mod products;
pub mod run;
pub mod toolchain;

pub use args::Args;
pub use run::{run, CliError};
pub use toolchain::ExternalToolchain;
