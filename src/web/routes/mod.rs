pub mod apartments;
pub mod lookup;
