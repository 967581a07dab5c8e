//! The worker process (spec §4.7): pulls jobs from the master, fetches and
//! classifies each one, and pushes the resulting document plus any
//! harvested follow-up jobs back.

pub mod fetch;
pub mod master_client;
pub mod run;

pub use master_client::MasterClient;
pub use run::{run_worker, WorkerOptions};
