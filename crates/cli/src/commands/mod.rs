//! Command implementations.

mod audit;
mod info;
mod run;
mod validate;

pub use audit::run_audit;
pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;
