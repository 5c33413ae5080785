pub mod client;
pub mod config;
pub mod editor;
pub mod error;
pub mod map;
pub mod mock_api;
pub mod peak;
pub mod repository;
pub mod store;
pub mod sync;

#[cfg(test)]
pub mod test_support;
