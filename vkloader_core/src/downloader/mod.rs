pub mod item_downloader;
pub mod worker_pool;
