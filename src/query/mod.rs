mod field_sum;

pub use field_sum::compute_field_sum;
