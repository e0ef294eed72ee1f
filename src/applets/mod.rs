// High-level operations behind the CLI subcommands
pub mod export;
pub mod import;
pub mod read;
pub mod write;

use crate::codec::Warnings;

fn log_warnings(warnings: &Warnings) {
    for message in warnings.iter() {
        tracing::warn!("{}", message);
    }
}
