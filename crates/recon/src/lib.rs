pub mod group;
pub mod matcher;
pub mod predicate;
pub mod result;

pub use group::{group_and_sum, Group};
pub use matcher::{DateRule, MatchSettings, Matcher, TieBreak};
pub use predicate::{MonthMentionCompatible, PaidOnOrAfter, PairFilter};
pub use result::{GroupedRow, MatchTier, MatchedPair, Reconciliation, ResidualRecord};
