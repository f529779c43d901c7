pub mod policy;
pub mod resource;
pub mod session;
