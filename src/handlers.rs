pub mod appointments;
pub mod businesses;
pub mod catalog;
pub mod customers;
pub mod portal;
pub mod reports;
pub mod sales;
