use std::sync::Arc;

use celoris_application::{AuthProvider, RecordStore};
use celoris_core::AppError;
use celoris_infrastructure::{
    AppwriteAuthProvider, AppwriteClient, AppwriteRecordStore, InMemoryAuthProvider,
    InMemoryRecordStore, SupabaseAuthProvider, SupabaseClient, SupabaseRecordStore,
};
use tracing::info;

use crate::console_config::{BackendConfig, ConsoleConfig};

/// Auth and record adapters for one BaaS backend, sharing one session.
pub struct ConsoleBackend {
    pub auth_provider: Arc<dyn AuthProvider>,
    pub record_store: Arc<dyn RecordStore>,
}

impl ConsoleBackend {
    pub fn connect(config: &ConsoleConfig) -> Result<Self, AppError> {
        match &config.backend {
            BackendConfig::Appwrite {
                endpoint,
                project_id,
            } => {
                info!(endpoint = %endpoint, project_id = %project_id, "using appwrite backend");
                let client = AppwriteClient::new(endpoint, project_id, config.http_timeout)?;
                Ok(Self {
                    auth_provider: Arc::new(AppwriteAuthProvider::new(client.clone())),
                    record_store: Arc::new(AppwriteRecordStore::new(client)),
                })
            }
            BackendConfig::Supabase { url, anon_key } => {
                info!(url = %url, "using supabase backend");
                let client = SupabaseClient::new(url, anon_key, config.http_timeout)?;
                Ok(Self {
                    auth_provider: Arc::new(SupabaseAuthProvider::new(
                        client.clone(),
                        config.verification_redirect_url(),
                    )),
                    record_store: Arc::new(SupabaseRecordStore::new(client)),
                })
            }
            BackendConfig::InMemory => {
                info!("using in-memory backend");
                Ok(Self {
                    auth_provider: Arc::new(InMemoryAuthProvider::new()),
                    record_store: Arc::new(InMemoryRecordStore::new()),
                })
            }
        }
    }
}
