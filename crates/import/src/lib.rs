pub mod ledger;
pub mod retention;
pub mod statement;
pub(crate) mod util;

pub use ledger::{assign_documents, LedgerError, LedgerProfile, LedgerRow};
pub use retention::{split_retentions, RetentionProfile};
pub use statement::{StatementParser, StatementProfile};
