//! Registro de empresas/conexões em YAML.
//!
//! O arquivo é relido a cada resolução — consistência acima de latência:
//! alterações de token, slots de webhook ou remoção de conexão valem para o
//! próximo webhook sem restart do gateway. Modo sem banco, como o restante
//! da configuração.

use std::path::PathBuf;

use serde::Deserialize;

use crate::models::{ChannelConnection, TenantRecord};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct Registry {
    #[serde(default)]
    tenants: Vec<TenantRecord>,
}

#[derive(Debug, Clone)]
pub struct TenantStore {
    registry_path: PathBuf,
}

impl TenantStore {
    pub fn new(registry_path: impl Into<PathBuf>) -> Self {
        Self {
            registry_path: registry_path.into(),
        }
    }

    async fn load(&self) -> AppResult<Vec<TenantRecord>> {
        let raw = tokio::fs::read_to_string(&self.registry_path)
            .await
            .map_err(|e| {
                AppError::ConfigError(format!(
                    "Failed to read tenant registry {}: {}",
                    self.registry_path.display(),
                    e
                ))
            })?;
        let registry: Registry = serde_yaml::from_str(&raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid tenant registry: {}", e)))?;
        Ok(registry.tenants)
    }

    /// Resolve empresa + conexão, ignorando registros marcados como
    /// removidos. Falha rápida: este é o único passo fatal do pipeline.
    pub async fn resolve(
        &self,
        tenant_external_id: &str,
        connection_id: i64,
    ) -> AppResult<(TenantRecord, ChannelConnection)> {
        let tenants = self.load().await?;

        let tenant = tenants
            .into_iter()
            .find(|t| t.external_id == tenant_external_id && !t.deleted)
            .ok_or_else(|| {
                AppError::NotFound(format!("Tenant {} not found", tenant_external_id))
            })?;

        let connection = tenant
            .connections
            .iter()
            .find(|c| c.id == connection_id && !c.deleted)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Connection {} not found for tenant {}",
                    connection_id, tenant_external_id
                ))
            })?;

        Ok((tenant, connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_registry(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    const REGISTRY: &str = r#"
tenants:
  - external_id: "10"
    internal_id: 1
    name: "Empresa"
    admin_token: "tok"
    connections:
      - id: 3
        verify_token: "segredo"
      - id: 4
        verify_token: "outro"
        deleted: true
  - external_id: "20"
    internal_id: 2
    admin_token: "tok2"
    deleted: true
    connections:
      - id: 1
        verify_token: "x"
"#;

    #[tokio::test]
    async fn test_resolve_existing_connection() {
        let file = write_registry(REGISTRY);
        let store = TenantStore::new(file.path());

        let (tenant, connection) = store.resolve("10", 3).await.unwrap();
        assert_eq!(tenant.internal_id, 1);
        assert_eq!(connection.verify_token, "segredo");
    }

    #[tokio::test]
    async fn test_resolve_skips_deleted() {
        let file = write_registry(REGISTRY);
        let store = TenantStore::new(file.path());

        // Conexão soft-deleted
        assert!(matches!(
            store.resolve("10", 4).await,
            Err(AppError::NotFound(_))
        ));
        // Tenant soft-deleted
        assert!(matches!(
            store.resolve("20", 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_registry_changes_take_effect_without_restart() {
        let mut file = write_registry(REGISTRY);
        let store = TenantStore::new(file.path());
        assert!(store.resolve("30", 1).await.is_err());

        // Reescreve o arquivo com um tenant novo
        file.as_file_mut().set_len(0).unwrap();
        use std::io::Seek;
        file.as_file_mut().rewind().unwrap();
        file.write_all(
            br#"
tenants:
  - external_id: "30"
    internal_id: 3
    admin_token: "t"
    connections:
      - id: 1
        verify_token: "v"
"#,
        )
        .unwrap();
        file.flush().unwrap();

        assert!(store.resolve("30", 1).await.is_ok());
    }
}
