//! Custom extractors that render failures as the standard error envelope.

pub mod prefixed_id;
pub mod validated_json;

pub use prefixed_id::{IdPrefix, PrefixedId};
pub use validated_json::ValidatedJson;
