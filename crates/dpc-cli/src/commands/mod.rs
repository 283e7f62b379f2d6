pub mod analyze;
pub mod lint;
pub mod load;
pub mod requires;
pub mod suggest;
