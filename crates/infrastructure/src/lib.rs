//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod appwrite_auth_provider;
mod appwrite_client;
mod appwrite_record_store;
mod http_errors;
mod in_memory_auth_provider;
mod in_memory_record_store;
mod supabase_auth_provider;
mod supabase_client;
mod supabase_record_store;
mod tracing_notifier;

pub use appwrite_auth_provider::AppwriteAuthProvider;
pub use appwrite_client::AppwriteClient;
pub use appwrite_record_store::{APPWRITE_DATABASE_ID, AppwriteRecordStore};
pub use in_memory_auth_provider::InMemoryAuthProvider;
pub use in_memory_record_store::InMemoryRecordStore;
pub use supabase_auth_provider::SupabaseAuthProvider;
pub use supabase_client::SupabaseClient;
pub use supabase_record_store::SupabaseRecordStore;
pub use tracing_notifier::TracingNotifier;
