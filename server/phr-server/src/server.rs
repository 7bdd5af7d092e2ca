use std::sync::Arc;

use anyhow::{Context, Result};
use crypto::FieldCipher;
use logger_redacted::{PiiRedactor, RedactionConfig};
use sqlx::PgPool;

use crate::auth::{JwtService, PasswordService};
use crate::config::AppConfig;
use crate::models::{Role, User};
use crate::services::{FileStorage, InsightService, LocalFileStorage, OpenAiClient, TextGenerator};
use crate::storage::{StoreError, Stores};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct PhrServer {
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Record stores, Postgres or in-memory
    pub stores: Stores,
    /// Access/refresh token issuer
    pub tokens: Arc<JwtService>,
    pub passwords: Arc<PasswordService>,
    /// Uploaded document storage
    pub files: Arc<dyn FileStorage>,
    pub insights: InsightService,
    /// Field cipher for report diagnosis and test results, when a key is set
    pub cipher: Option<Arc<FieldCipher>>,
    /// Scrubs emails and phone numbers before they reach the logs
    pub redactor: Arc<PiiRedactor>,
    /// Present when backed by Postgres; used by the health check
    pub db_pool: Option<PgPool>,
}

impl PhrServer {
    /// Build the state from configuration around already-constructed stores
    pub fn new(config: AppConfig, stores: Stores, db_pool: Option<PgPool>) -> Result<Self> {
        let generator: Arc<dyn TextGenerator> =
            Arc::new(OpenAiClient::new(&config.llm_base_url, config.openai_api_key.clone()));
        Self::with_generator(config, stores, db_pool, generator)
    }

    /// Same as [`PhrServer::new`] with a caller-supplied text generator
    pub fn with_generator(
        config: AppConfig,
        stores: Stores,
        db_pool: Option<PgPool>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        let tokens = JwtService::from_config(&config).context("invalid token configuration")?;
        let passwords = PasswordService::new().context("invalid password hashing parameters")?;

        let cipher = match config.encryption_key.as_deref().filter(|key| !key.trim().is_empty()) {
            Some(key) => Some(Arc::new(
                FieldCipher::from_base64(key.trim()).context("ENCRYPTION_KEY must be 32 bytes of base64")?,
            )),
            None => None,
        };
        if cipher.is_none() {
            tracing::warn!("ENCRYPTION_KEY not set; report diagnosis and test results are stored in clear text");
        }
        if config.uses_dev_secret() {
            tracing::warn!("SECRET_KEY is the development default; set a real secret outside development");
        }

        let files: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(
            &config.upload_dir,
            config.allowed_extensions(),
            config.max_file_size,
        ));
        let insights = InsightService::new(generator, config.insight_model.clone(), config.chat_model.clone());
        let redactor = PiiRedactor::new(RedactionConfig::default()).context("failed to build PII redactor")?;

        Ok(Self {
            config: Arc::new(config),
            stores,
            tokens: Arc::new(tokens),
            passwords: Arc::new(passwords),
            files,
            insights,
            cipher,
            redactor: Arc::new(redactor),
            db_pool,
        })
    }

    /// Replace the upload storage backend
    pub fn with_file_storage(mut self, files: Arc<dyn FileStorage>) -> Self {
        self.files = files;
        self
    }

    pub fn cipher(&self) -> Option<&FieldCipher> {
        self.cipher.as_deref()
    }

    /// `true` when no database is configured or `SELECT 1` succeeds
    pub async fn database_healthy(&self) -> bool {
        match &self.db_pool {
            Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
            None => true,
        }
    }

    /// Create the bootstrap admin account unless that email already exists
    pub async fn seed_admin(&self) -> Result<bool> {
        let email = self.config.admin_email.trim().to_lowercase();
        if self.stores.users.find_by_email(&email).await?.is_some() {
            tracing::debug!(email = %self.redactor.redact_email(&email), "Admin account already present");
            return Ok(false);
        }

        let hashed = self.passwords.hash(&self.config.admin_password).await?;
        let mut admin = User::new(email.clone(), hashed, self.config.admin_full_name.clone(), None, Role::Admin);
        admin.is_verified = true;

        match self.stores.users.create(admin).await {
            Ok(_) => {
                tracing::info!(email = %self.redactor.redact_email(&email), "Seeded admin account");
                Ok(true)
            }
            // Another instance seeded it first
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.admin_password = "admin-password".into();
        config
    }

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let server = PhrServer::new(test_config(), Stores::in_memory(), None).unwrap();

        assert!(server.seed_admin().await.unwrap());
        assert!(!server.seed_admin().await.unwrap());

        let admin = server
            .stores
            .users
            .find_by_email(&server.config.admin_email.to_lowercase())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(server.passwords.verify("admin-password", &admin.hashed_password).await);
    }

    #[tokio::test]
    async fn test_in_memory_is_healthy() {
        let server = PhrServer::new(test_config(), Stores::in_memory(), None).unwrap();
        assert!(server.database_healthy().await);
        assert!(server.cipher().is_none());
    }

    #[test]
    fn test_rejects_bad_encryption_key() {
        let mut config = test_config();
        config.encryption_key = Some("not-a-key".into());
        assert!(PhrServer::new(config, Stores::in_memory(), None).is_err());
    }
}
