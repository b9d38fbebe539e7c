mod connection;
mod dry_run;
pub mod postgres;

pub use connection::{ConnectionError, StagingConnection};
pub use dry_run::DryRunConnection;
