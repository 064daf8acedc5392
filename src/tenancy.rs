//! Tenant inference from worker identifiers
//!
//! Identifiers are built as `<tenant>_<suffix>`. Handles created from a
//! worker definition carry their tenant explicitly; this heuristic is only
//! consulted for handles registered without one.

/// Best-effort mapping from worker identifier to owning tenant
#[derive(Debug, Clone)]
pub struct TenancyResolver {
    legacy_tenant: String,
}

impl TenancyResolver {
    pub fn new(legacy_tenant: impl Into<String>) -> Self {
        Self {
            legacy_tenant: legacy_tenant.into(),
        }
    }

    /// Tenant that owns identifiers without any tenant prefix
    pub fn legacy_tenant(&self) -> &str {
        &self.legacy_tenant
    }

    /// Infer the owner of `worker_id`.
    ///
    /// Strips the trailing `_segment` and, if another separator remains past
    /// the first character, one more (`tenant_model_exchange` -> `tenant`).
    /// Identifiers with no usable separator belong to the legacy tenant.
    pub fn owner_of(&self, worker_id: &str) -> String {
        match worker_id.rfind('_') {
            Some(idx) if idx > 0 => {
                let head = &worker_id[..idx];
                match head.rfind('_') {
                    Some(idx2) if idx2 > 0 => head[..idx2].to_string(),
                    _ => head.to_string(),
                }
            }
            _ => self.legacy_tenant.clone(),
        }
    }

    /// Does `worker_id` belong to `tenant_id`?
    ///
    /// True when the identifier starts with the tenant literally. The legacy
    /// tenant additionally owns every identifier without a tenant-shaped
    /// (`@`) prefix.
    pub fn belongs_to(&self, worker_id: &str, tenant_id: &str) -> bool {
        if worker_id.starts_with(tenant_id) {
            return true;
        }
        tenant_id == self.legacy_tenant && !has_tenant_prefix(worker_id)
    }
}

impl Default for TenancyResolver {
    fn default() -> Self {
        Self::new("default")
    }
}

/// An `@` before the first separator marks an email-shaped tenant prefix
fn has_tenant_prefix(worker_id: &str) -> bool {
    for (i, ch) in worker_id.char_indices() {
        if ch == '@' {
            return true;
        }
        if ch == '_' && i > 0 {
            break;
        }
    }
    false
}
