//! Various unsorted logical operators.

pub use self::weighted_value::WeightedValue;

mod weighted_value;
