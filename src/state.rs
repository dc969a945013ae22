//! Application state shared across handlers.

use crate::asaas::AsaasClient;
use crate::supabase::SupabaseAuth;
use crate::web::auth::session::SessionCache;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub asaas: Arc<AsaasClient>,
    pub auth: Arc<SupabaseAuth>,
    pub session_cache: SessionCache,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        asaas: Arc<AsaasClient>,
        auth: Arc<SupabaseAuth>,
        session_cache: SessionCache,
    ) -> Self {
        Self {
            db_pool,
            asaas,
            auth,
            session_cache,
        }
    }
}
