//! # Fiscal Editor
//!
//! The in-progress fiscal attribute set of one tenant's settings form.
//! Changing the CFOP infers the situation and resolves the code; changing
//! the situation only resolves the code; the remaining setters store raw
//! input. Nothing reaches the store until [`FiscalEditor::save`] finds the
//! set valid, so a refused save has nothing to roll back.

use pdv_core::{ConfigSnapshot, FiscalAttributeSet, Rate, TaxSituation, TenantId, Weight};
use pdv_store::ConfigStore;

use crate::error::FiscalError;
use crate::regime::FiscalRegime;
use crate::resolver::{FiscalCodeResolver, IcmsCode};
use crate::validation::{validate, FieldErrors};

/// Editing session over one tenant's fiscal attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalEditor {
    tenant: TenantId,
    resolver: FiscalCodeResolver,
    attrs: FiscalAttributeSet,
}

impl FiscalEditor {
    /// Start editing from a configuration snapshot. The stored code pair is
    /// re-resolved for the snapshot's regime, so a set saved under another
    /// regime comes back consistent.
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
        let resolver = FiscalCodeResolver::for_snapshot(snapshot);
        let mut attrs = snapshot.fiscal.clone();
        resolver.resolve_into(&mut attrs);
        Self {
            tenant: snapshot.tenant_id,
            resolver,
            attrs,
        }
    }

    /// Fetch the tenant's snapshot and start editing it.
    pub async fn load(store: &dyn ConfigStore, tenant: &TenantId) -> Result<Self, FiscalError> {
        let snapshot = store
            .get_config(tenant)
            .await
            .map_err(|cause| FiscalError::PersistenceFailed { cause })?;
        Ok(Self::from_snapshot(&snapshot))
    }

    /// Tenant being edited.
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Regime the codes are resolved for.
    pub fn regime(&self) -> FiscalRegime {
        self.resolver.regime()
    }

    /// Current attribute values.
    pub fn attributes(&self) -> &FiscalAttributeSet {
        &self.attrs
    }

    /// Choose a CFOP; the situation and code follow it.
    pub fn set_cfop(&mut self, cfop: &str) -> Result<TaxSituation, FiscalError> {
        self.resolver.apply_cfop(&mut self.attrs, cfop)
    }

    /// Choose a situation directly; only the code follows it.
    pub fn set_situation(&mut self, situation: TaxSituation) -> IcmsCode {
        self.resolver.apply_situation(&mut self.attrs, situation)
    }

    /// Set the NCM, trimmed.
    pub fn set_ncm(&mut self, ncm: impl Into<String>) {
        self.attrs.ncm = ncm.into().trim().to_string();
    }

    /// Set the goods origin.
    pub fn set_origem(&mut self, origem: Option<u8>) {
        self.attrs.origem = origem;
    }

    /// Set the CEST, trimmed; blank clears it.
    pub fn set_cest(&mut self, cest: Option<String>) {
        self.attrs.cest = non_blank(cest);
    }

    /// Set the ST value-added margin.
    pub fn set_margem_st(&mut self, margem: Option<Rate>) {
        self.attrs.margem_st = margem;
    }

    /// Set the ICMS rate.
    pub fn set_aliquota_icms(&mut self, rate: Rate) {
        self.attrs.aliquota_icms = rate;
    }

    /// Set the PIS rate.
    pub fn set_aliquota_pis(&mut self, rate: Rate) {
        self.attrs.aliquota_pis = rate;
    }

    /// Set the COFINS rate.
    pub fn set_aliquota_cofins(&mut self, rate: Rate) {
        self.attrs.aliquota_cofins = rate;
    }

    /// Set the net weight.
    pub fn set_peso_liquido(&mut self, peso: Weight) {
        self.attrs.peso_liquido = peso;
    }

    /// Current field errors; empty means the set may be saved.
    pub fn validate(&self) -> FieldErrors {
        validate(&self.attrs)
    }

    /// Persist the set as one atomic write, refusing while it is invalid.
    pub async fn save(&self, store: &dyn ConfigStore) -> Result<(), FiscalError> {
        let field_errors = self.validate();
        if !field_errors.is_empty() {
            tracing::warn!(
                tenant_id = %self.tenant,
                errors = %field_errors,
                "fiscal attributes refused: validation failed"
            );
            return Err(FiscalError::ValidationFailed { field_errors });
        }

        let attrs = normalized(&self.attrs);
        store
            .update_fiscal_attributes(&self.tenant, &attrs)
            .await
            .map_err(|cause| {
                tracing::warn!(tenant_id = %self.tenant, error = %cause, "fiscal attributes write failed");
                FiscalError::PersistenceFailed { cause }
            })?;

        tracing::info!(
            tenant_id = %self.tenant,
            cfop = %self.attrs.cfop,
            situacao = %self.attrs.situacao,
            "fiscal attributes saved"
        );
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The set as it is written: code fields trimmed, a blank CEST cleared.
fn normalized(attrs: &FiscalAttributeSet) -> FiscalAttributeSet {
    FiscalAttributeSet {
        ncm: attrs.ncm.trim().to_string(),
        cfop: attrs.cfop.trim().to_string(),
        cest: non_blank(attrs.cest.clone()),
        ..attrs.clone()
    }
}
