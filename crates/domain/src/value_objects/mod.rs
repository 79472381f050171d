//! Value objects - Immutable objects defined by their attributes

mod direction;
mod vitals;

pub use direction::Direction;
pub use vitals::Vitals;
