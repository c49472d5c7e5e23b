mod dto;
pub mod handlers;

pub use handlers::{private_routes, public_routes};
