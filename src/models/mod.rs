pub mod account;
pub mod admin_unlock;
pub mod billing_event;
pub mod horse;
