pub mod auth;
pub use auth::AuthService;

pub mod business_service;
pub use business_service::BusinessService;
pub mod customer_service;
pub use customer_service::CustomerService;
pub mod catalog_service;
pub use catalog_service::CatalogService;
pub mod booking_service;
pub use booking_service::BookingService;
pub mod sales_service;
pub use sales_service::SalesService;
pub mod report_service;
pub use report_service::ReportService;
