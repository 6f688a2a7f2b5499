pub mod filter;
pub mod mongo;

pub use filter::condition_to_filter;
pub use mongo::MongoPersistenceProvider;
