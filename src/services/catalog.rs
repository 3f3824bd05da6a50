//! Design catalog service.
//!
//! CRUD over an artist's portfolio of designs. Mutations are artist-only
//! and ownership-checked; a foreign design reads as absent to its
//! would-be editor.

use serde::Deserialize;
use std::sync::Arc;

use crate::api::{Design, DesignId, DesignPatch, NewDesign, Role, UserId};
use crate::db::repository::{FullRepository, RepositoryError};
use crate::scheduler::Caller;

/// Creation payload as received from the API. The owning artist is the
/// caller, never a field of the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct DesignDraft {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<i64>,
}

/// Errors produced by the catalog service.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Malformed input (HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Design absent, or not visible to the caller (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller's role does not allow the operation (HTTP 403).
    #[error("permission denied: {0}")]
    Permission(String),

    /// Storage failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => CatalogError::NotFound(err.to_string()),
            RepositoryError::Validation { .. } => CatalogError::Validation(err.to_string()),
            other => CatalogError::Repository(other),
        }
    }
}

/// The catalog service.
pub struct CatalogService {
    repository: Arc<dyn FullRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self { repository }
    }

    /// List designs, newest first, optionally restricted to one artist.
    /// Public; no caller required.
    pub async fn list_designs(
        &self,
        artist_id: Option<UserId>,
    ) -> Result<Vec<Design>, CatalogError> {
        Ok(self.repository.list_designs(artist_id).await?)
    }

    /// Fetch a single design. Public.
    pub async fn get_design(&self, id: DesignId) -> Result<Design, CatalogError> {
        self.repository
            .get_design(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("design {} not found", id)))
    }

    /// Publish a new design owned by the calling artist.
    pub async fn create_design(
        &self,
        caller: Caller,
        draft: DesignDraft,
    ) -> Result<Design, CatalogError> {
        self.require_artist(caller)?;

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(CatalogError::Validation(
                "title must not be empty".to_string(),
            ));
        }
        if let Some(price) = draft.price {
            if price < 0 {
                return Err(CatalogError::Validation(format!(
                    "price must not be negative, got {}",
                    price
                )));
            }
        }

        let design = self
            .repository
            .create_design(NewDesign {
                title: title.to_string(),
                description: draft.description,
                image_url: draft.image_url,
                price: draft.price,
                artist_id: caller.id,
            })
            .await?;
        log::info!("artist {} published design {}", caller.id, design.id);
        Ok(design)
    }

    /// Patch a design the caller owns.
    pub async fn update_design(
        &self,
        caller: Caller,
        id: DesignId,
        patch: DesignPatch,
    ) -> Result<Design, CatalogError> {
        self.require_artist(caller)?;
        self.require_owned(caller, id).await?;

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(CatalogError::Validation(
                    "title must not be empty".to_string(),
                ));
            }
        }
        if let Some(price) = patch.price {
            if price < 0 {
                return Err(CatalogError::Validation(format!(
                    "price must not be negative, got {}",
                    price
                )));
            }
        }

        Ok(self.repository.update_design(id, patch).await?)
    }

    /// Remove a design the caller owns.
    pub async fn delete_design(&self, caller: Caller, id: DesignId) -> Result<(), CatalogError> {
        self.require_artist(caller)?;
        self.require_owned(caller, id).await?;
        Ok(self.repository.delete_design(id).await?)
    }

    fn require_artist(&self, caller: Caller) -> Result<(), CatalogError> {
        if caller.role != Role::Artist {
            return Err(CatalogError::Permission(
                "only artists can manage designs".to_string(),
            ));
        }
        Ok(())
    }

    /// Ownership check. A design owned by someone else reads as `NotFound`,
    /// which masks existence.
    async fn require_owned(&self, caller: Caller, id: DesignId) -> Result<(), CatalogError> {
        self.repository
            .get_design(id)
            .await?
            .filter(|d| d.artist_id == caller.id)
            .map(|_| ())
            .ok_or_else(|| CatalogError::NotFound(format!("design {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NewUser;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::UserRepository;

    async fn setup() -> (CatalogService, Caller, Caller) {
        let repo = Arc::new(LocalRepository::new());
        let artist = repo
            .create_user(NewUser {
                email: "ink@studio.example".to_string(),
                password_hash: "0".repeat(64),
                role: Role::Artist,
                name: "Marta".to_string(),
            })
            .await
            .unwrap();
        let client = repo
            .create_user(NewUser {
                email: "ana@example.com".to_string(),
                password_hash: "1".repeat(64),
                role: Role::Client,
                name: "Ana".to_string(),
            })
            .await
            .unwrap();

        let service = CatalogService::new(repo as Arc<dyn FullRepository>);
        (
            service,
            Caller::new(artist.id, Role::Artist),
            Caller::new(client.id, Role::Client),
        )
    }

    fn draft(title: &str) -> DesignDraft {
        DesignDraft {
            title: title.to_string(),
            description: Some("fine-line".to_string()),
            image_url: None,
            price: Some(90_000),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_caller_as_owner() {
        let (service, artist, _) = setup().await;
        let design = service.create_design(artist, draft("Koi")).await.unwrap();
        assert_eq!(design.artist_id, artist.id);
        assert_eq!(design.title, "Koi");
    }

    #[tokio::test]
    async fn test_client_cannot_publish() {
        let (service, _, client) = setup().await;
        let err = service.create_design(client, draft("Koi")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Permission(_)));
    }

    #[tokio::test]
    async fn test_create_validates_title_and_price() {
        let (service, artist, _) = setup().await;

        let err = service
            .create_design(artist, draft("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let mut negative = draft("Koi");
        negative.price = Some(-1);
        let err = service.create_design(artist, negative).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_patches_only_given_fields() {
        let (service, artist, _) = setup().await;
        let design = service.create_design(artist, draft("Koi")).await.unwrap();

        let patch = DesignPatch {
            price: Some(120_000),
            ..DesignPatch::default()
        };
        let updated = service
            .update_design(artist, design.id, patch)
            .await
            .unwrap();
        assert_eq!(updated.title, "Koi");
        assert_eq!(updated.price, Some(120_000));
        assert_eq!(updated.description.as_deref(), Some("fine-line"));
    }

    #[tokio::test]
    async fn test_foreign_design_reads_as_absent() {
        let (service, artist, _) = setup().await;
        let design = service.create_design(artist, draft("Koi")).await.unwrap();

        let stranger = Caller::new(UserId::new(999), Role::Artist);
        let err = service
            .update_design(stranger, design.id, DesignPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));

        let err = service.delete_design(stranger, design.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_design() {
        let (service, artist, _) = setup().await;
        let design = service.create_design(artist, draft("Koi")).await.unwrap();

        service.delete_design(artist, design.id).await.unwrap();
        let err = service.get_design(design.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_artist() {
        let (service, artist, _) = setup().await;
        service.create_design(artist, draft("Koi")).await.unwrap();
        service.create_design(artist, draft("Dragon")).await.unwrap();

        let all = service.list_designs(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let none = service
            .list_designs(Some(UserId::new(999)))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
