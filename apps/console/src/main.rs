//! Celoris headless console.
//!
//! Restores the session, optionally signs in, and logs what the shell
//! would do for the configured route on every session change.

#![forbid(unsafe_code)]

mod console_backend;
mod console_config;

use std::sync::Arc;

use celoris_application::{
    AuthService, LiveList, ProfileReconciler, RecordQuery, RecordStore, RouteGuard, SessionStore,
};
use celoris_core::AppError;
use celoris_domain::{Collection, Navigation, Session};
use celoris_infrastructure::TracingNotifier;
use tracing::{info, warn};

use crate::console_backend::ConsoleBackend;
use crate::console_config::{ConsoleConfig, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ConsoleConfig::load()?;
    let backend = ConsoleBackend::connect(&config)?;

    let session_store = SessionStore::new(backend.auth_provider.clone());
    let auth_service = AuthService::new(
        backend.auth_provider.clone(),
        backend.record_store.clone(),
        session_store.clone(),
        Arc::new(TracingNotifier::new()),
        config.verification_redirect_url(),
    );

    let subscription =
        session_store.subscribe_to_changes(ProfileReconciler::new(backend.record_store.clone()));
    session_store.initialize().await;

    if let Some(credentials) = &config.credentials
        && !session_store.snapshot().is_authenticated()
        && let Err(error) = auth_service
            .login(&credentials.email, &credentials.password)
            .await
    {
        warn!(error = %error, "configured login failed");
    }

    let mut guard = RouteGuard::new(session_store.watch(), config.route);
    let mut leads = load_leads(backend.record_store.as_ref(), &session_store.snapshot()).await;
    let mut lead_changes = backend.record_store.subscribe(Collection::Leads, None);
    log_navigation(&guard, &session_store.snapshot());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            decision = guard.changed() => {
                if decision.is_none() {
                    break;
                }
                log_navigation(&guard, &session_store.snapshot());
            }
            Some(change) = lead_changes.next() => {
                if leads.apply(&change) {
                    info!(lead_count = leads.records().len(), "leads updated");
                }
            }
            signal = &mut shutdown => {
                if let Err(error) = signal {
                    warn!(error = %error, "failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    subscription.unsubscribe();
    info!("celoris-console stopped");
    Ok(())
}

async fn load_leads(record_store: &dyn RecordStore, session: &Session) -> LiveList {
    if !session.is_authenticated() {
        return LiveList::new(Collection::Leads, Vec::new());
    }

    let query = RecordQuery::new().order_desc("created_at").limit(50);
    match LiveList::load(record_store, Collection::Leads, &query).await {
        Ok(leads) => {
            info!(lead_count = leads.records().len(), "leads loaded");
            leads
        }
        Err(error) => {
            warn!(error = %error, "failed to load leads");
            LiveList::new(Collection::Leads, Vec::new())
        }
    }
}

fn log_navigation(guard: &RouteGuard, session: &Session) {
    let route = guard.route();
    match guard.navigation() {
        Navigation::Placeholder => info!(route = ?route, "session loading"),
        Navigation::Redirect(target) => {
            info!(route = ?route, redirect = target.path(), "redirecting");
        }
        Navigation::Render => info!(
            route = ?route,
            role = session.role().as_str(),
            user = session.display_name(),
            email = session.email(),
            "rendering"
        ),
    }
}
