pub mod database;
pub mod error;
pub mod members;
pub mod row_helpers;
pub mod schema;

pub use database::Database;
pub use error::StoreError;
pub use members::{AttachOutcome, Downline, MemberRepo, MemberRow, MemberSummary};
