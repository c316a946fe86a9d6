use celoris_application::{AuthChange, AuthProvider, SignUpRequest};
use celoris_core::{AppError, Identity, MetadataMap};
use serde_json::{Value, json};

use super::InMemoryAuthProvider;

fn sign_up_request(email: &str, password: &str) -> SignUpRequest {
    let mut metadata = MetadataMap::new();
    metadata.insert("role".to_owned(), Value::String("tutor".to_owned()));

    SignUpRequest {
        email: email.to_owned(),
        password: password.to_owned(),
        name: "Ana".to_owned(),
        metadata,
    }
}

#[tokio::test]
async fn sign_in_emits_change_and_sets_current_identity() {
    let provider = InMemoryAuthProvider::new();
    provider
        .insert_account("secret-pw", Identity::new("u1", "Ana", "ana@example.com"))
        .await;
    let mut changes = provider.subscribe();

    let signed_in = provider.sign_in("ana@example.com", "secret-pw").await;
    assert!(signed_in.is_ok());

    let current = provider.current_identity().await;
    assert_eq!(current.map(|identity| identity.id().to_owned()).ok().as_deref(), Some("u1"));
    assert!(matches!(
        changes.recv().await,
        Ok(AuthChange::SignedIn(identity)) if identity.id() == "u1"
    ));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let provider = InMemoryAuthProvider::new();
    provider
        .insert_account("secret-pw", Identity::new("u1", "Ana", "ana@example.com"))
        .await;

    let result = provider.sign_in("ana@example.com", "nope").await;
    assert!(matches!(result, Err(AppError::Auth(_))));
    assert!(provider.current_identity().await.is_err_and(|error| error.is_not_found()));
}

#[tokio::test]
async fn sign_up_keeps_metadata_and_stays_signed_out() {
    let provider = InMemoryAuthProvider::new();

    let created = provider
        .sign_up(&sign_up_request("new@example.com", "long-enough"))
        .await;
    let Ok(identity) = created else {
        panic!("sign-up should succeed");
    };

    assert_eq!(identity.metadata_str("role"), Some("tutor"));
    assert!(provider.current_identity().await.is_err());

    let duplicate = provider
        .sign_up(&sign_up_request("new@example.com", "long-enough"))
        .await;
    assert!(matches!(duplicate, Err(AppError::Auth(_))));
}

#[tokio::test]
async fn short_password_fails_validation() {
    let provider = InMemoryAuthProvider::new();

    let result = provider.sign_up(&sign_up_request("new@example.com", "short")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn metadata_patch_merges_into_existing() {
    let provider = InMemoryAuthProvider::new();
    let identity = Identity::new("u1", "Ana", "ana@example.com").with_metadata(
        json!({ "role": "admin", "bio": "maths" })
            .as_object()
            .cloned()
            .unwrap_or_default(),
    );
    provider.insert_account("secret-pw", identity).await;
    assert!(provider.sign_in("ana@example.com", "secret-pw").await.is_ok());

    let mut patch = MetadataMap::new();
    patch.insert("bio".to_owned(), Value::String("physics".to_owned()));
    let updated = provider.update_metadata(patch).await;

    let Ok(updated) = updated else {
        panic!("metadata update should succeed");
    };
    assert_eq!(updated.metadata_str("role"), Some("admin"));
    assert_eq!(updated.metadata_str("bio"), Some("physics"));
}

#[tokio::test]
async fn metadata_update_requires_session() {
    let provider = InMemoryAuthProvider::new();

    let result = provider.update_metadata(MetadataMap::new()).await;
    assert!(matches!(result, Err(AppError::Auth(_))));
}

#[tokio::test]
async fn sign_out_clears_session_and_emits_change() {
    let provider = InMemoryAuthProvider::new();
    provider
        .insert_account("secret-pw", Identity::new("u1", "Ana", "ana@example.com"))
        .await;
    assert!(provider.sign_in("ana@example.com", "secret-pw").await.is_ok());
    let mut changes = provider.subscribe();

    assert!(provider.sign_out().await.is_ok());
    assert!(provider.current_identity().await.is_err());
    assert!(matches!(changes.recv().await, Ok(AuthChange::SignedOut)));
}

#[tokio::test]
async fn session_changes_without_subscribers_still_apply() {
    let provider = InMemoryAuthProvider::new();
    provider
        .insert_account("secret-pw", Identity::new("u1", "Ana", "ana@example.com"))
        .await;

    assert!(provider.sign_in("ana@example.com", "secret-pw").await.is_ok());
    assert!(provider.current_identity().await.is_ok());

    assert!(provider.sign_out().await.is_ok());
    assert!(matches!(
        provider.current_identity().await,
        Err(AppError::NotFound(_))
    ));
}
