pub mod business;
pub mod customer;
pub mod catalog;
pub mod appointment;
pub mod sale;
pub mod report;
