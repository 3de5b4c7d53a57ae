use crate::{
    api::{self, found, AgentCoreControl},
    handler::{Changes, CreationRecorder, Diff, Handler, Observed, Timeouts},
    util::{
        waiter::{Observation, Polling, StateChange},
        Error,
    },
};
use agentcore_types::{KmsConfiguration, TokenVaultCmkSpec};
use async_trait::async_trait;
use std::{fmt, sync::Arc, time::Duration};
use tracing::info;

/// Whether a token vault reports the KMS configuration that was last
/// set on it. Reads lag behind writes.
#[derive(Clone, Debug, PartialEq, Eq)]
enum VaultSync {
    Pending,
    Applied,
}

impl fmt::Display for VaultSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultSync::Pending => write!(f, "Pending"),
            VaultSync::Applied => write!(f, "Applied"),
        }
    }
}

/// Manages the KMS key of a token vault. The vault itself is owned by
/// the service; only its key is declared.
pub struct TokenVaultHandler {
    client: Arc<dyn AgentCoreControl>,
    polling: Polling,
}

impl TokenVaultHandler {
    pub fn new(client: Arc<dyn AgentCoreControl>) -> Self {
        TokenVaultHandler {
            client,
            polling: Polling::default(),
        }
    }

    pub fn with_polling(mut self, polling: Polling) -> Self {
        self.polling = polling;
        self
    }

    async fn find(&self, token_vault_id: &str) -> Result<Option<api::TokenVault>, Error> {
        Ok(found(self.client.get_token_vault(token_vault_id).await)?)
    }

    /// Sets the key and waits until reads report it.
    async fn set(
        &self,
        token_vault_id: &str,
        kms_configuration: &KmsConfiguration,
        timeout: Duration,
    ) -> Result<api::TokenVault, Error> {
        self.client
            .set_token_vault_cmk(token_vault_id, kms_configuration)
            .await?;
        info!(token_vault_id, key_type = %kms_configuration.key_type, "set token vault key");

        StateChange::new(vec![VaultSync::Pending], vec![VaultSync::Applied], timeout)
            .polling(&self.polling)
            .until_target(|| async move {
                Ok(self.find(token_vault_id).await?.map(|vault| {
                    let sync = if &vault.kms_configuration == kms_configuration {
                        VaultSync::Applied
                    } else {
                        VaultSync::Pending
                    };
                    Observation::new(vault, sync)
                }))
            })
            .await
    }
}

#[async_trait]
impl Handler for TokenVaultHandler {
    type Spec = TokenVaultCmkSpec;
    type State = api::TokenVault;

    const KIND: &'static str = "TokenVaultCmk";

    /// The vault always exists, so its id is recorded before the key
    /// is set.
    async fn create_with(
        &self,
        spec: &TokenVaultCmkSpec,
        timeouts: &Timeouts,
        recorder: &dyn CreationRecorder,
    ) -> Result<api::TokenVault, Error> {
        let token_vault_id = spec.token_vault_id();
        recorder.created(token_vault_id).await;
        self.set(token_vault_id, &spec.kms_configuration, timeouts.create)
            .await
            .map_err(|err| err.tainted(token_vault_id))
    }

    async fn read(
        &self,
        _spec: &TokenVaultCmkSpec,
        id: &str,
    ) -> Result<Option<api::TokenVault>, Error> {
        self.find(id).await
    }

    async fn update(
        &self,
        spec: &TokenVaultCmkSpec,
        state: &api::TokenVault,
        timeouts: &Timeouts,
    ) -> Result<api::TokenVault, Error> {
        self.set(&state.token_vault_id, &spec.kms_configuration, timeouts.update)
            .await
    }

    /// Reverts the vault to a service-managed key.
    async fn delete(
        &self,
        _spec: &TokenVaultCmkSpec,
        id: &str,
        timeouts: &Timeouts,
    ) -> Result<(), Error> {
        match self
            .set(id, &KmsConfiguration::service_managed(), timeouts.delete)
            .await
        {
            Err(err) if err.is_not_found() => Ok(()),
            result => result.map(|_| ()),
        }
    }

    fn diff(&self, spec: &TokenVaultCmkSpec, state: &api::TokenVault) -> Diff {
        Changes::default()
            .replace_if(spec.token_vault_id() != state.token_vault_id, "tokenVaultId")
            .update_if(
                spec.kms_configuration != state.kms_configuration,
                "kmsConfiguration",
            )
            .finish()
    }

    fn observe(&self, state: &api::TokenVault) -> Observed {
        Observed {
            id: state.token_vault_id.clone(),
            arn: None,
            remote_status: Some(state.kms_configuration.key_type.to_string()),
            settled: true,
            failure: None,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeControlPlane;
    use agentcore_types::{KeyType, DEFAULT_TOKEN_VAULT_ID};

    const KEY_ARN: &str = "arn:aws:kms:us-east-1:123456789012:key/1234abcd";

    fn spec() -> TokenVaultCmkSpec {
        TokenVaultCmkSpec {
            kms_configuration: KmsConfiguration {
                key_type: KeyType::CustomerManagedKey,
                kms_key_arn: Some(KEY_ARN.to_owned()),
            },
            ..Default::default()
        }
    }

    fn handler(fake: &Arc<FakeControlPlane>) -> TokenVaultHandler {
        TokenVaultHandler::new(fake.clone()).with_polling(Polling::immediate())
    }

    #[tokio::test]
    async fn create_waits_for_key_to_read_back() {
        let fake = Arc::new(FakeControlPlane::default());
        let vault = handler(&fake)
            .create(&spec(), &Timeouts::default())
            .await
            .unwrap();
        assert_eq!(vault.token_vault_id, DEFAULT_TOKEN_VAULT_ID);
        assert_eq!(vault.kms_configuration, spec().kms_configuration);
        assert_eq!(fake.count_calls("get_token_vault"), 2);
    }

    #[tokio::test]
    async fn delete_reverts_to_service_managed_key() {
        let fake = Arc::new(FakeControlPlane::default());
        let handler = handler(&fake);
        let vault = handler.create(&spec(), &Timeouts::default()).await.unwrap();
        handler
            .delete(&spec(), &vault.token_vault_id, &Timeouts::default())
            .await
            .unwrap();
        let vault = handler
            .read(&spec(), DEFAULT_TOKEN_VAULT_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(vault.kms_configuration, KmsConfiguration::service_managed());
    }

    #[tokio::test]
    async fn key_drift_is_updated_in_place() {
        let fake = Arc::new(FakeControlPlane::default());
        let handler = handler(&fake);
        let vault = handler
            .read(&spec(), DEFAULT_TOKEN_VAULT_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            handler.diff(&spec(), &vault),
            Diff::Update(vec!["kmsConfiguration".to_owned()])
        );
        let vault = handler
            .update(&spec(), &vault, &Timeouts::default())
            .await
            .unwrap();
        assert_eq!(handler.diff(&spec(), &vault), Diff::None);
    }

    #[test]
    fn moving_to_another_vault_replaces() {
        let handler = TokenVaultHandler::new(Arc::new(FakeControlPlane::default()));
        let state = api::TokenVault {
            token_vault_id: DEFAULT_TOKEN_VAULT_ID.to_owned(),
            kms_configuration: spec().kms_configuration,
            last_modified_date: None,
        };
        let desired = TokenVaultCmkSpec {
            token_vault_id: Some("team-vault".to_owned()),
            ..spec()
        };
        assert_eq!(
            handler.diff(&desired, &state),
            Diff::Replace(vec!["tokenVaultId".to_owned()])
        );
    }
}
