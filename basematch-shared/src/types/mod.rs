pub mod api;
pub mod identity;
pub mod pagination;

pub use api::*;
pub use identity::*;
pub use pagination::*;
