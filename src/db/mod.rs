pub mod memory;
pub mod redis;
pub mod store;

pub use memory::MemoryStore;
pub use self::redis::{create_redis_client, RedisStore, StoreWriterHandle};
pub use store::{load_theme, save_theme, ThemeStore, THEME_STORAGE_KEY};
