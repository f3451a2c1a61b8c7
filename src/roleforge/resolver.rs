// Purpose: The batch driver. Each role resolves independently; one role's
// failure never aborts the batch, and the result map preserves input order
// for deterministic reporting.

use indexmap::IndexMap;
use log::{debug, warn};

use super::error::ResolveError;
use super::render::render;
use super::role::RoleDescriptor;
use super::spec::BuildSpecification;
use super::store::TemplateStore;
use super::validate::validate;

pub type ResolutionResult = Result<BuildSpecification, ResolveError>;
pub type ResolutionMap = IndexMap<String, ResolutionResult>;

pub struct Resolver<'a> {
    store: &'a TemplateStore,
    tag: String,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a TemplateStore) -> Self {
        Self {
            store,
            tag: "latest".to_string(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    // Lookup, substitution, validation. The returned specification is final:
    // nothing mutates it after this point.
    pub fn resolve(&self, role: &RoleDescriptor) -> ResolutionResult {
        let template =
            self.store
                .lookup(&role.stack)
                .ok_or_else(|| ResolveError::TemplateNotFound {
                    stack: role.stack.clone(),
                })?;
        let spec = render(template, role, &self.tag)?;
        validate(&spec)?;
        Ok(spec)
    }

    pub fn resolve_all(&self, roles: &[RoleDescriptor]) -> ResolutionMap {
        let mut results = ResolutionMap::with_capacity(roles.len());
        for role in roles {
            if results.contains_key(&role.name) {
                warn!("duplicate role name {}, keeping the first", role.name);
                continue;
            }
            let result = self.resolve(role);
            match &result {
                Ok(spec) => debug!(
                    "role {}: {} instructions -> {}",
                    role.name,
                    spec.instructions.len(),
                    spec.image_tag
                ),
                Err(e) => debug!("role {}: {}", role.name, e),
            }
            results.insert(role.name.clone(), result);
        }
        results
    }
}
