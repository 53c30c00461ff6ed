pub mod offline;
pub mod store_api;

pub use offline::OfflineStore;
pub use store_api::TimeSeriesStore;
