pub mod scenario;
pub mod util;

pub use util::{csv_field, split_csv};
