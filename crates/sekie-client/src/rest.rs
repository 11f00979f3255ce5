//! fullnode rest implementation of `LedgerClient`
//!
//! envelopes are encoded by the node (`transactions/encode_submission`), so
//! the client never needs a local bcs encoder; it only signs the returned
//! message.

use crate::config::NetworkConfig;
use crate::error::{LedgerError, Result};
use crate::identity::AccountAddress;
use crate::ledger::{
    u64_string, AccountState, LedgerClient, RawTransaction, SignedTransaction, TxHash, TxOptions,
    TxOutcome, UnsignedTransaction, WaitOptions,
};
use crate::payload::{EntryFunctionPayload, TypeTag};

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// bound on a single http round-trip
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// error body returned on non-2xx responses
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    vm_error_code: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PendingTransaction {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionView {
    #[serde(rename = "type")]
    kind: String,
    hash: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinStore {
    data: CoinStoreData,
}

#[derive(Debug, Deserialize)]
struct CoinStoreData {
    coin: Coin,
}

#[derive(Debug, Deserialize)]
struct Coin {
    #[serde(with = "u64_string")]
    value: u64,
}

/// rest client for a single fullnode
#[derive(Clone, Debug)]
pub struct RestClient {
    http: reqwest::Client,
    api_url: String,
}

impl RestClient {
    /// `api_url` is the `/v1` base
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_timeout(api_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// every request fails with `LedgerError::Timeout` once `timeout` elapses
    pub fn with_timeout(api_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("http client builder failed, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::with_timeout(config.api_url(), config.request_timeout())
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.http.get(self.url(path)).send().await?;
        Self::decode(resp).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.http.post(self.url(path)).json(body).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return resp.json().await.map_err(|e| LedgerError::Decoding(e.to_string()));
        }

        let body: ApiErrorBody = resp.json().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(LedgerError::NotFound(body.message));
        }

        Err(LedgerError::Api {
            status: status.as_u16(),
            message: body.message,
            error_code: body.error_code,
            vm_error_code: body.vm_error_code,
        })
    }

    /// single lookup, `None` while the node has not seen or settled it
    async fn settled(&self, hash: &TxHash) -> Result<Option<TxOutcome>> {
        let view: TransactionView = match self.get(&format!("transactions/by_hash/{}", hash)).await {
            Ok(view) => view,
            Err(LedgerError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        if view.kind == "pending_transaction" {
            return Ok(None);
        }

        let version = view.version.as_deref().and_then(|v| v.parse().ok());
        Ok(Some(TxOutcome {
            hash: TxHash(view.hash),
            success: view.success.unwrap_or(false),
            vm_status: view.vm_status.unwrap_or_default(),
            version,
        }))
    }
}

#[async_trait]
impl LedgerClient for RestClient {
    async fn account_state(&self, address: &AccountAddress) -> Result<AccountState> {
        tracing::debug!("fetching account {}", address);
        self.get(&format!("accounts/{}", address)).await
    }

    async fn build_transaction(
        &self,
        sender: &AccountAddress,
        state: &AccountState,
        payload: &EntryFunctionPayload,
        opts: &TxOptions,
    ) -> Result<UnsignedTransaction> {
        let raw = RawTransaction::new(*sender, state.sequence_number, payload.clone(), opts);
        let message: String = self.post("transactions/encode_submission", &raw).await?;
        let signing_message = hex::decode(message.trim_start_matches("0x"))
            .map_err(|e| LedgerError::Decoding(format!("signing message: {}", e)))?;

        Ok(UnsignedTransaction { raw, signing_message })
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<TxHash> {
        let pending: PendingTransaction = self.post("transactions", signed).await?;
        tracing::debug!("submitted {}", pending.hash);
        Ok(TxHash(pending.hash))
    }

    async fn await_confirmation(&self, hash: &TxHash, wait: &WaitOptions) -> Result<TxOutcome> {
        let deadline = Instant::now() + wait.timeout;

        loop {
            // a node that stops answering must not outlive the deadline
            let settled = tokio::time::timeout_at(deadline, self.settled(hash))
                .await
                .map_err(|_| LedgerError::Timeout(format!("transaction {}", hash)))?;

            if let Some(outcome) = settled? {
                if wait.require_success && !outcome.success {
                    return Err(LedgerError::Aborted {
                        hash: hash.to_string(),
                        vm_status: outcome.vm_status,
                    });
                }
                return Ok(outcome);
            }

            if Instant::now() + wait.poll_interval > deadline {
                return Err(LedgerError::Timeout(format!("transaction {}", hash)));
            }
            tokio::time::sleep(wait.poll_interval).await;
        }
    }

    async fn query_balance(&self, address: &AccountAddress, coin: &TypeTag) -> Result<u64> {
        let store: CoinStore = self
            .get(&format!("accounts/{}/resource/0x1::coin::CoinStore<{}>", address, coin))
            .await?;
        Ok(store.data.coin.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let client = RestClient::new("http://127.0.0.1:8080/v1/");
        assert_eq!(client.api_url(), "http://127.0.0.1:8080/v1");
        assert_eq!(client.url("accounts/0x1"), "http://127.0.0.1:8080/v1/accounts/0x1");
    }

    #[test]
    fn test_from_config_appends_v1() {
        let client = RestClient::from_config(&NetworkConfig::devnet());
        assert_eq!(client.api_url(), "https://fullnode.devnet.aptoslabs.com/v1");
    }

    #[test]
    fn test_with_timeout_keeps_base() {
        let client = RestClient::with_timeout("http://127.0.0.1:8080/v1", Duration::from_millis(250));
        assert_eq!(client.api_url(), "http://127.0.0.1:8080/v1");
    }

    #[test]
    fn test_transaction_view_decoding() {
        let view: TransactionView = serde_json::from_str(
            r#"{"type":"user_transaction","hash":"0xab","success":false,
                "vm_status":"Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006)","version":"99"}"#,
        )
        .unwrap();
        assert_eq!(view.kind, "user_transaction");
        assert_eq!(view.success, Some(false));
        assert_eq!(view.version.as_deref(), Some("99"));
    }
}
