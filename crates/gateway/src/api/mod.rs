pub mod chat;
pub mod models;
pub mod router;

pub use router::router;
