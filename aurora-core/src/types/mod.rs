mod key;
mod receiver;

pub use key::{Key, RouteKey, Sequence};
pub(crate) use key::value_kind;
pub use receiver::{DnaRecord, Outcome, Priority};
