//! Command implementations.

mod discover;
mod info;
mod run;
mod validate;

pub use discover::run_discover;
pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;
