//! 基础设施层 - 持有存储资源，只暴露表级能力

pub mod memory_store;
pub mod store;
pub mod supabase_store;

pub use memory_store::MemoryStore;
pub use store::{insert_many_as, insert_one_as, upsert_as, Store, Table};
pub use supabase_store::SupabaseStore;
