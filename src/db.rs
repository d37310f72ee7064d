pub mod store;
pub use store::PetshopStore;

pub mod business_repo;
pub use business_repo::BusinessRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod appointment_repo;
pub use appointment_repo::AppointmentRepository;
pub mod sale_repo;
pub use sale_repo::SaleRepository;

pub mod pg_store;
pub use pg_store::PgStore;
pub mod memory_store;
pub use memory_store::MemoryStore;
