pub mod store;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod dept_repo;
pub use dept_repo::DeptRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod api_key_repo;
pub use api_key_repo::ApiKeyRepository;
