// State management and watermark tracking

pub mod storage;
pub mod store;
pub mod watermark;

pub use storage::{JsonFileStorage, MemoryStorage, StateStorage};
pub use store::WatermarkStore;
pub use watermark::{RunStatus, Watermark, WatermarkBuilder};
