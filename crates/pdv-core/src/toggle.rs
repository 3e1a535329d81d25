//! # Feature Toggles
//!
//! Operational switches of the point-of-sale terminal, addressed by
//! [`ToggleKey`]. The stored column name of each key is its
//! [`as_str`](ToggleKey::as_str) form; every conversion from a column name
//! goes through [`ToggleKey::from_str`](std::str::FromStr), so writing an
//! unknown column is impossible by construction.
//!
//! A [`ToggleSet`] is a partial map of keys to values. It is used both for
//! the full view of a tenant (absent keys read as `false`) and for the set of
//! writes of a single logical change.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A feature toggle of the PDV configuration.
///
/// Only `comandas`, `mesas`, `controla_caixa` and `fiado` carry a deactivation
/// precondition; the print-format pair forms a mutual-exclusion group. The
/// remaining keys are ungoverned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToggleKey {
    /// Tab-ticket service.
    #[serde(rename = "comandas")]
    Comandas,
    /// Table service.
    #[serde(rename = "mesas")]
    Mesas,
    /// Salesperson attribution on sales.
    #[serde(rename = "vendedor")]
    Vendedor,
    /// Customer selection at checkout.
    #[serde(rename = "seleciona_clientes")]
    SelecionaClientes,
    /// Cash-register session control.
    #[serde(rename = "controla_caixa")]
    ControlaCaixa,
    /// Group identical items on the ticket.
    #[serde(rename = "agrupa_itens")]
    AgrupaItens,
    /// Delivery orders.
    #[serde(rename = "delivery")]
    Delivery,
    /// Public digital menu.
    #[serde(rename = "cardapio_digital")]
    CardapioDigital,
    /// Stock write-off on PDV sales.
    #[serde(rename = "baixa_estoque_pdv")]
    BaixaEstoquePdv,
    /// Barcode-driven sales.
    #[serde(rename = "venda_codigo_barras")]
    VendaCodigoBarras,
    /// Per-item notes.
    #[serde(rename = "observacao_no_item")]
    ObservacaoNoItem,
    /// Per-item discounts.
    #[serde(rename = "desconto_no_item")]
    DescontoNoItem,
    /// Whole-sale discounts.
    #[serde(rename = "desconto_no_total")]
    DescontoNoTotal,
    /// Store credit (sales on account).
    #[serde(rename = "fiado")]
    Fiado,
    /// 80mm receipt layout.
    #[serde(rename = "tipo_impressao_80mm")]
    TipoImpressao80mm,
    /// 50mm receipt layout.
    #[serde(rename = "tipo_impressao_50mm")]
    TipoImpressao50mm,
    /// Sale of a line item without a catalog product.
    #[serde(rename = "venda_sem_produto")]
    VendaSemProduto,
}

impl ToggleKey {
    /// Stored column name of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comandas => "comandas",
            Self::Mesas => "mesas",
            Self::Vendedor => "vendedor",
            Self::SelecionaClientes => "seleciona_clientes",
            Self::ControlaCaixa => "controla_caixa",
            Self::AgrupaItens => "agrupa_itens",
            Self::Delivery => "delivery",
            Self::CardapioDigital => "cardapio_digital",
            Self::BaixaEstoquePdv => "baixa_estoque_pdv",
            Self::VendaCodigoBarras => "venda_codigo_barras",
            Self::ObservacaoNoItem => "observacao_no_item",
            Self::DescontoNoItem => "desconto_no_item",
            Self::DescontoNoTotal => "desconto_no_total",
            Self::Fiado => "fiado",
            Self::TipoImpressao80mm => "tipo_impressao_80mm",
            Self::TipoImpressao50mm => "tipo_impressao_50mm",
            Self::VendaSemProduto => "venda_sem_produto",
        }
    }

    /// Return all toggle keys.
    pub fn all() -> &'static [ToggleKey] {
        &[
            Self::Comandas,
            Self::Mesas,
            Self::Vendedor,
            Self::SelecionaClientes,
            Self::ControlaCaixa,
            Self::AgrupaItens,
            Self::Delivery,
            Self::CardapioDigital,
            Self::BaixaEstoquePdv,
            Self::VendaCodigoBarras,
            Self::ObservacaoNoItem,
            Self::DescontoNoItem,
            Self::DescontoNoTotal,
            Self::Fiado,
            Self::TipoImpressao80mm,
            Self::TipoImpressao50mm,
            Self::VendaSemProduto,
        ]
    }
}

impl std::fmt::Display for ToggleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToggleKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownToggleKey(s.to_string()))
    }
}

/// A partial assignment of toggle keys to values.
///
/// Iteration order is the key order of [`ToggleKey`], so serialized writes
/// are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToggleSet(BTreeMap<ToggleKey, bool>);

impl ToggleSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `key`; keys never written read as `false`.
    pub fn get(&self, key: ToggleKey) -> bool {
        self.0.get(&key).copied().unwrap_or(false)
    }

    /// Whether `key` has an explicit entry.
    pub fn contains(&self, key: ToggleKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Assign `value` to `key`, returning the previous explicit entry.
    pub fn set(&mut self, key: ToggleKey, value: bool) -> Option<bool> {
        self.0.insert(key, value)
    }

    /// Builder-style assignment.
    pub fn with(mut self, key: ToggleKey, value: bool) -> Self {
        self.set(key, value);
        self
    }

    /// Overwrite every entry of `writes` into this set.
    pub fn merge(&mut self, writes: &ToggleSet) {
        for (key, value) in writes.iter() {
            self.set(key, value);
        }
    }

    /// Iterate over explicit entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (ToggleKey, bool)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no explicit entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ToggleKey, bool)> for ToggleSet {
    fn from_iter<I: IntoIterator<Item = (ToggleKey, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_round_trips_through_its_column_name() {
        for key in ToggleKey::all() {
            assert_eq!(key.as_str().parse::<ToggleKey>().unwrap(), *key);
            let json = serde_json::to_string(key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }

    #[test]
    fn print_format_keys_keep_their_digits() {
        assert_eq!(ToggleKey::TipoImpressao80mm.as_str(), "tipo_impressao_80mm");
        assert_eq!(ToggleKey::TipoImpressao50mm.as_str(), "tipo_impressao_50mm");
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = "ocultar_producao".parse::<ToggleKey>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownToggleKey("ocultar_producao".to_string())
        );
    }

    #[test]
    fn absent_keys_read_false() {
        let set = ToggleSet::new().with(ToggleKey::Fiado, true);
        assert!(set.get(ToggleKey::Fiado));
        assert!(!set.get(ToggleKey::Mesas));
        assert!(!set.contains(ToggleKey::Mesas));
    }

    #[test]
    fn merge_overwrites_entries() {
        let mut view = ToggleSet::new()
            .with(ToggleKey::TipoImpressao80mm, true)
            .with(ToggleKey::Delivery, true);
        let writes = ToggleSet::new()
            .with(ToggleKey::TipoImpressao80mm, false)
            .with(ToggleKey::TipoImpressao50mm, true);
        view.merge(&writes);
        assert!(!view.get(ToggleKey::TipoImpressao80mm));
        assert!(view.get(ToggleKey::TipoImpressao50mm));
        assert!(view.get(ToggleKey::Delivery));
    }

    #[test]
    fn toggle_set_serializes_as_column_map() {
        let set = ToggleSet::new()
            .with(ToggleKey::Mesas, false)
            .with(ToggleKey::Comandas, true);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({"comandas": true, "mesas": false}));
    }
}
