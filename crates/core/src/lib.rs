pub mod money;
pub mod record;
pub mod text;

pub use money::Money;
pub use record::{DocPolicy, Record, Side, DOC_FEES, DOC_MISMATCH, DOC_NOT_FOUND, DOC_UNKNOWN};
