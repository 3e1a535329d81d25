//! Row shapes of the PostgREST tables and their mapping onto domain types.
//!
//! Toggle columns and the `venda_sem_produto_*` fiscal columns share the
//! `pdv_config` row. Null columns read as `false` or as the tenant default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use pdv_core::{
    CashSession, Cents, DebtorBalance, FiscalAttributeSet, OrderRef, OrderStatus, Rate, TabKind,
    PdvError, TaxSituation, ToggleKey, ToggleSet, ValidationError, Weight,
};

// ---------------------------------------------------------------------------
// pdv_config
// ---------------------------------------------------------------------------

/// Fiscal columns of the `pdv_config` row.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct FiscalColumns {
    #[serde(rename = "venda_sem_produto_ncm", default)]
    ncm: Option<String>,
    #[serde(rename = "venda_sem_produto_cfop", default)]
    cfop: Option<String>,
    #[serde(rename = "venda_sem_produto_origem", default, deserialize_with = "lenient_origem")]
    origem: Option<u8>,
    #[serde(rename = "venda_sem_produto_situacao_tributaria", default)]
    situacao: Option<String>,
    #[serde(rename = "venda_sem_produto_cst", default)]
    cst: Option<String>,
    #[serde(rename = "venda_sem_produto_csosn", default)]
    csosn: Option<String>,
    #[serde(rename = "venda_sem_produto_cest", default)]
    cest: Option<String>,
    #[serde(rename = "venda_sem_produto_margem_st", default)]
    margem_st: Option<Rate>,
    #[serde(rename = "venda_sem_produto_aliquota_icms", default)]
    aliquota_icms: Option<Rate>,
    #[serde(rename = "venda_sem_produto_aliquota_pis", default)]
    aliquota_pis: Option<Rate>,
    #[serde(rename = "venda_sem_produto_aliquota_cofins", default)]
    aliquota_cofins: Option<Rate>,
    #[serde(rename = "venda_sem_produto_peso_liquido", default)]
    peso_liquido: Option<Weight>,
}

impl FiscalColumns {
    pub(crate) fn from_attributes(attrs: &FiscalAttributeSet) -> Self {
        Self {
            ncm: Some(attrs.ncm.clone()),
            cfop: Some(attrs.cfop.clone()),
            origem: attrs.origem,
            situacao: Some(attrs.situacao.as_str().to_string()),
            cst: attrs.cst.clone(),
            csosn: attrs.csosn.clone(),
            cest: attrs.cest.clone(),
            margem_st: attrs.margem_st,
            aliquota_icms: Some(attrs.aliquota_icms),
            aliquota_pis: Some(attrs.aliquota_pis),
            aliquota_cofins: Some(attrs.aliquota_cofins),
            peso_liquido: Some(attrs.peso_liquido),
        }
    }

    /// Fill absent columns with tenant defaults. An unrecognised situation
    /// name is an error, never a silent default.
    pub(crate) fn into_attributes(self) -> Result<FiscalAttributeSet, ValidationError> {
        let defaults = FiscalAttributeSet::default();
        let situacao = match self.situacao.as_deref() {
            None | Some("") => defaults.situacao,
            Some(name) => name.parse::<TaxSituation>()?,
        };
        Ok(FiscalAttributeSet {
            ncm: self.ncm.unwrap_or(defaults.ncm),
            cfop: self.cfop.unwrap_or(defaults.cfop),
            origem: self.origem.or(defaults.origem),
            situacao,
            cst: non_blank(self.cst),
            csosn: non_blank(self.csosn),
            cest: non_blank(self.cest),
            margem_st: self.margem_st,
            aliquota_icms: self.aliquota_icms.unwrap_or(defaults.aliquota_icms),
            aliquota_pis: self.aliquota_pis.unwrap_or(defaults.aliquota_pis),
            aliquota_cofins: self.aliquota_cofins.unwrap_or(defaults.aliquota_cofins),
            peso_liquido: self.peso_liquido.unwrap_or(defaults.peso_liquido),
        })
    }
}

/// Decode the fiscal columns of a `pdv_config` row.
pub(crate) fn fiscal_from_row(row: Map<String, Value>) -> Result<FiscalAttributeSet, PdvError> {
    let columns: FiscalColumns = serde_json::from_value(Value::Object(row))?;
    Ok(columns.into_attributes()?)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Read every known toggle column; null or missing reads as `false`.
pub(crate) fn toggles_from_row(row: &Map<String, Value>) -> ToggleSet {
    ToggleKey::all()
        .iter()
        .map(|key| {
            let value = row.get(key.as_str()).and_then(Value::as_bool).unwrap_or(false);
            (*key, value)
        })
        .collect()
}

/// PATCH body for a set of toggle writes.
pub(crate) fn toggles_to_patch(writes: &ToggleSet) -> Value {
    let body: Map<String, Value> = writes
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), Value::Bool(value)))
        .collect();
    Value::Object(body)
}

/// `regime_tributario` stored either as a number or as numeric text.
pub(crate) fn regime_from_row(row: &Map<String, Value>) -> Option<i32> {
    match row.get("regime_tributario")? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Ledger tables
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CashSessionRow {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(default)]
    operador: Option<String>,
    data_abertura: DateTime<Utc>,
}

impl From<CashSessionRow> for CashSession {
    fn from(row: CashSessionRow) -> Self {
        Self {
            id: row.id,
            operator: row.operador,
            opened_at: row.data_abertura,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderRow {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    numero_venda: Option<String>,
    status_venda: OrderStatus,
    #[serde(default)]
    tipo_atendimento: Option<TabKind>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    numero_atendimento: Option<String>,
}

impl From<OrderRow> for OrderRef {
    fn from(row: OrderRow) -> Self {
        let number = row.numero_venda.unwrap_or_else(|| row.id.clone());
        Self {
            id: row.id,
            number,
            status: row.status_venda,
            tab_kind: row.tipo_atendimento,
            tab_number: row.numero_atendimento,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DebtorRow {
    #[serde(deserialize_with = "lenient_string")]
    id: String,
    #[serde(default)]
    nome: Option<String>,
    saldo_devedor: Cents,
}

impl From<DebtorRow> for DebtorBalance {
    fn from(row: DebtorRow) -> Self {
        Self {
            name: row.nome.unwrap_or_else(|| row.id.clone()),
            customer_id: row.id,
            balance: row.saldo_devedor,
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient scalar decoding
// ---------------------------------------------------------------------------

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    scalar_to_string(value)
        .ok_or_else(|| serde::de::Error::custom("expected a string or number identifier"))
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(scalar_to_string))
}

fn lenient_origem<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    let Some(value) = Option::<Value>::deserialize(d)? else {
        return Ok(None);
    };
    let parsed = match &value {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid origem {value}")))
}
