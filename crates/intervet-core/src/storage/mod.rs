pub mod schema;
pub mod scorer_cache;
pub mod store;

pub use store::Store;
