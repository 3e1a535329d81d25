//! PostgREST-backed store.
//!
//! ## Tables
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/rest/v1/pdv_config?empresa_id=eq.{t}` | Toggles and fiscal attributes |
//! | GET    | `/rest/v1/empresas?id=eq.{t}&select=regime_tributario` | Regime code |
//! | PATCH  | `/rest/v1/pdv_config?empresa_id=eq.{t}` | Toggle group / fiscal set |
//! | GET    | `/rest/v1/caixa_controle?empresa_id=eq.{t}&status=eq.aberto` | Open cash sessions |
//! | GET    | `/rest/v1/pdv?empresa_id=eq.{t}&tipo_atendimento=eq.{k}&...` | Tabbed orders |
//! | GET    | `/rest/v1/clientes?empresa_id=eq.{t}&saldo_devedor=gt.0` | Debtors |
//!
//! A PATCH is one SQL `UPDATE` on the backend, so every column in the body
//! lands together or not at all.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

use pdv_core::{
    CashSession, ConfigSnapshot, DebtorBalance, FiscalAttributeSet, OrderRef, TabKind, TenantId,
    ToggleSet,
};

use crate::config::{ConfigError, StoreConfig};
use crate::rows::{self, CashSessionRow, DebtorRow, FiscalColumns, OrderRow};
use crate::{ConfigStore, OperationalLedger, StoreError};

/// REST path prefix of the PostgREST service.
const API_PREFIX: &str = "rest/v1/";

/// Config store and ledger over a PostgREST HTTP API.
#[derive(Debug, Clone)]
pub struct RestStore {
    http: reqwest::Client,
    rest_url: Url,
    max_retries: u32,
}

impl RestStore {
    /// Build a store client from configuration.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key).map_err(|_| ConfigError::InvalidApiKey)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ConfigError::InvalidApiKey)?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Http {
                endpoint: "client builder".into(),
                source: e,
            })?;

        let mut base = config.base_url;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_url = base
            .join(API_PREFIX)
            .map_err(|e| ConfigError::InvalidUrl(API_PREFIX.into(), e.to_string()))?;

        Ok(Self {
            http,
            rest_url,
            max_retries: config.max_retries,
        })
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = self
            .rest_url
            .join(table)
            .map_err(|e| ConfigError::InvalidUrl(table.into(), e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (column, filter) in filters {
                pairs.append_pair(column, filter);
            }
        }
        Ok(url)
    }

    fn tenant_filter(tenant: &TenantId) -> (&'static str, String) {
        ("empresa_id", format!("eq.{tenant}"))
    }

    async fn check_status(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, StoreError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        Err(StoreError::Api {
            endpoint: endpoint.into(),
            status,
            body,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, url: Url) -> Result<Vec<T>, StoreError> {
        let resp = crate::retry::retry_send(self.max_retries, || self.http.get(url.clone()).send())
            .await
            .map_err(|e| StoreError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        Self::check_status(endpoint, resp)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })
    }

    /// PATCH the tenant's `pdv_config` row; zero affected rows is `NotFound`.
    async fn patch_config(&self, tenant: &TenantId, body: &Value) -> Result<(), StoreError> {
        let endpoint = "PATCH /pdv_config";
        let url = self.table_url("pdv_config", &[Self::tenant_filter(tenant)])?;

        let resp = crate::retry::retry_send(self.max_retries, || {
            self.http
                .patch(url.clone())
                .header("Prefer", "return=representation")
                .json(body)
                .send()
        })
        .await
        .map_err(|e| StoreError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        let updated: Vec<Value> = Self::check_status(endpoint, resp)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })?;
        if updated.is_empty() {
            return Err(StoreError::NotFound(*tenant));
        }
        Ok(())
    }

    async fn fetch_orders(
        &self,
        endpoint: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<OrderRef>, StoreError> {
        let url = self.table_url("pdv", filters)?;
        let rows: Vec<OrderRow> = self.fetch(endpoint, url).await?;
        Ok(rows.into_iter().map(OrderRef::from).collect())
    }
}

#[async_trait]
impl ConfigStore for RestStore {
    async fn get_config(&self, tenant: &TenantId) -> Result<ConfigSnapshot, StoreError> {
        let endpoint = "GET /pdv_config";
        let url = self.table_url("pdv_config", &[Self::tenant_filter(tenant)])?;
        let row = self
            .fetch::<Map<String, Value>>(endpoint, url)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound(*tenant))?;

        let toggles = rows::toggles_from_row(&row);
        let fiscal = rows::fiscal_from_row(row).map_err(|e| StoreError::MalformedRow {
            endpoint: endpoint.into(),
            reason: e.to_string(),
        })?;

        let endpoint = "GET /empresas";
        let url = self.table_url(
            "empresas",
            &[
                ("id", format!("eq.{tenant}")),
                ("select", "regime_tributario".into()),
            ],
        )?;
        let company = self
            .fetch::<Map<String, Value>>(endpoint, url)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound(*tenant))?;
        let regime_code = rows::regime_from_row(&company).ok_or_else(|| StoreError::MalformedRow {
            endpoint: endpoint.into(),
            reason: "regime_tributario is missing or not an integer".into(),
        })?;

        Ok(ConfigSnapshot {
            tenant_id: *tenant,
            regime_code,
            toggles,
            fiscal,
        })
    }

    async fn update_toggles(&self, tenant: &TenantId, writes: &ToggleSet) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        self.patch_config(tenant, &rows::toggles_to_patch(writes)).await
    }

    async fn update_fiscal_attributes(
        &self,
        tenant: &TenantId,
        attrs: &FiscalAttributeSet,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_value(FiscalColumns::from_attributes(attrs)).map_err(|e| {
            StoreError::MalformedRow {
                endpoint: "PATCH /pdv_config".into(),
                reason: e.to_string(),
            }
        })?;
        self.patch_config(tenant, &body).await
    }
}

#[async_trait]
impl OperationalLedger for RestStore {
    async fn open_cash_sessions(&self, tenant: &TenantId) -> Result<Vec<CashSession>, StoreError> {
        let url = self.table_url(
            "caixa_controle",
            &[
                Self::tenant_filter(tenant),
                ("status", "eq.aberto".into()),
                ("select", "id,operador,data_abertura".into()),
            ],
        )?;
        let rows: Vec<CashSessionRow> = self.fetch("GET /caixa_controle", url).await?;
        Ok(rows.into_iter().map(CashSession::from).collect())
    }

    async fn open_tabs(&self, tenant: &TenantId, kind: TabKind) -> Result<Vec<OrderRef>, StoreError> {
        self.fetch_orders(
            "GET /pdv (open tabs)",
            &[
                Self::tenant_filter(tenant),
                ("tipo_atendimento", format!("eq.{kind}")),
                ("numero_atendimento", "not.is.null".into()),
                ("status_venda", "in.(aberta,salva)".into()),
                (
                    "select",
                    "id,numero_venda,status_venda,tipo_atendimento,numero_atendimento".into(),
                ),
            ],
        )
        .await
    }

    async fn saved_orders(
        &self,
        tenant: &TenantId,
        kind: TabKind,
    ) -> Result<Vec<OrderRef>, StoreError> {
        self.fetch_orders(
            "GET /pdv (saved)",
            &[
                Self::tenant_filter(tenant),
                ("tipo_atendimento", format!("eq.{kind}")),
                ("status_venda", "eq.salva".into()),
                (
                    "select",
                    "id,numero_venda,status_venda,tipo_atendimento,numero_atendimento".into(),
                ),
            ],
        )
        .await
    }

    async fn debtor_balances(&self, tenant: &TenantId) -> Result<Vec<DebtorBalance>, StoreError> {
        let url = self.table_url(
            "clientes",
            &[
                Self::tenant_filter(tenant),
                ("saldo_devedor", "gt.0".into()),
                ("select", "id,nome,saldo_devedor".into()),
            ],
        )?;
        let rows: Vec<DebtorRow> = self.fetch("GET /clientes", url).await?;
        Ok(rows.into_iter().map(DebtorBalance::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> RestStore {
        RestStore::new(StoreConfig::local_mock(base, "k").unwrap()).unwrap()
    }

    #[test]
    fn table_url_appends_rest_prefix_and_filters() {
        let s = store("http://127.0.0.1:9000");
        let url = s
            .table_url("pdv", &[("status_venda", "in.(aberta,salva)".into())])
            .unwrap();
        assert_eq!(url.path(), "/rest/v1/pdv");
        let pairs: Vec<_> = url.query_pairs().collect();
        assert_eq!(pairs[0].0, "status_venda");
        assert_eq!(pairs[0].1, "in.(aberta,salva)");
    }

    #[test]
    fn base_path_is_preserved() {
        let s = store("http://127.0.0.1:9000/supabase");
        let url = s.table_url("clientes", &[]).unwrap();
        assert_eq!(url.path(), "/supabase/rest/v1/clientes");
    }

    #[test]
    fn invalid_api_key_is_a_config_error() {
        let cfg = StoreConfig::local_mock("http://127.0.0.1:9000", "bad\nkey").unwrap();
        let err = RestStore::new(cfg).unwrap_err();
        assert!(matches!(err, StoreError::Config(ConfigError::InvalidApiKey)));
    }
}
