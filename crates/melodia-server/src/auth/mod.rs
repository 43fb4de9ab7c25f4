pub mod jwt;
pub mod role;

pub use role::{CallerRole, Role};
