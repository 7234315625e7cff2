pub mod access;
pub mod lifecycle;
