pub mod admin;
pub mod auth;
pub mod billing;
pub mod gate;
pub mod horses;
pub mod stripe;
