pub mod ai;
pub mod error;
pub mod password;
pub mod publisher;
pub mod session;
