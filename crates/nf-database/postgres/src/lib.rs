pub mod connection;
pub mod models;
pub mod resolver;
pub mod schema;

// Re-export commonly used items
pub use connection::establish_connection;
pub use resolver::{Resolution, ResolvableEntity, Resolver};
