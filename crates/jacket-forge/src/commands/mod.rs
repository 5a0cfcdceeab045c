mod allocate;
mod build;
mod config;
mod inspect;
mod register;

pub use allocate::{allocate_ids, AllocateArgs};
pub use build::{build_jackets, BuildArgs};
pub use config::{init_config, show_config};
pub use inspect::{inspect_package, InspectArgs};
pub use register::{register_ids, RegisterArgs};
