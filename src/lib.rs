pub mod error;
pub mod event;
pub mod hand;
pub mod ledger;
pub mod record;
pub mod render;
pub mod report;
pub mod summary;
pub mod web;

pub use error::LedgerError;
pub use ledger::{Ledger, LedgerConfig};
pub use render::OutputFormat;
