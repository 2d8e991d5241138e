pub mod clock;
pub mod data_bag;
pub mod error;
pub mod field_value;
pub mod file_ref;
pub mod ids;
pub mod records;
pub mod sort_key;

pub use clock::{Clock, Timestamp};
pub use data_bag::DataBag;
pub use error::CoreError;
pub use field_value::{FieldType, FieldValue};
pub use file_ref::FileRef;
pub use ids::*;
pub use records::*;
pub use sort_key::{SortKey, allocate_key, fits_between};
