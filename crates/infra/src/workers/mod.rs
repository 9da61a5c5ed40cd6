//! Background runners. Failures are logged and retried; they never propagate
//! into request handling.

mod nightly_import;

pub use nightly_import::{NightlyImportHandle, NightlyImportRunner, RunOutcome};
