pub mod basic;
pub mod interface;
pub mod ordered;
pub mod row;
pub mod visualize;

pub use basic::IncidenceMatrix;
pub use interface::*;
pub use ordered::{Ordered, SpanInfo};
pub use row::BitRow;
pub use visualize::{VizTable, VizTrait};
