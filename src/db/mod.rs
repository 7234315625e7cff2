pub mod account_repository;
pub mod admin_unlock_repository;
pub mod billing_event_repository;
pub mod horse_repository;
pub mod mock_db;
pub mod postgres_account_repository;
pub mod postgres_admin_unlock_repository;
pub mod postgres_billing_event_repository;
pub mod postgres_horse_repository;
