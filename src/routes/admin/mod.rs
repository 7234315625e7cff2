pub mod accounts;
pub mod billing_events;
pub mod unlock;
