pub mod catalog_fetcher;
pub mod catalog_source;
