// Purpose: Role descriptors and the inventory loaders that produce them.
// A role picks exactly one stack and supplies values for that stack's slots.

use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use log::debug;
use pathdiff::diff_paths;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::template::VarValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub name: String,
    pub stack: String,
    #[serde(default)]
    pub vars: IndexMap<String, VarValue>,
}

#[derive(Debug, Deserialize)]
struct RawRole {
    #[serde(default)]
    name: Option<String>,
    stack: String,
    #[serde(default)]
    vars: IndexMap<String, VarValue>,
}

// A roles file is a JSON array of descriptors, each carrying its own name.
pub fn load_roles_file(path: &Path) -> Result<Vec<RoleDescriptor>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("reading roles file {}", path.display()))?;
    let raw: Vec<RawRole> = serde_json::from_str(&src)
        .with_context(|| format!("parsing roles file {}", path.display()))?;

    let mut roles = Vec::with_capacity(raw.len());
    for (i, role) in raw.into_iter().enumerate() {
        let Some(name) = role.name else {
            bail!("role #{} in {} has no name", i, path.display());
        };
        roles.push(RoleDescriptor {
            name,
            stack: role.stack,
            vars: role.vars,
        });
    }
    Ok(roles)
}

// A roles dir holds one role.json per role directory. The name falls back to
// the directory path relative to the root, so roles/billing-api/role.json
// becomes the role "billing-api". Walk order is name-sorted, which keeps the
// batch order deterministic across runs.
pub fn load_roles_dir(root: &Path) -> Result<Vec<RoleDescriptor>> {
    let mut roles = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() != "role.json" {
            continue;
        }
        let src = std::fs::read_to_string(entry.path())
            .with_context(|| format!("reading role {}", entry.path().display()))?;
        let raw: RawRole = serde_json::from_str(&src)
            .with_context(|| format!("parsing role {}", entry.path().display()))?;

        let name = match raw.name {
            Some(name) => name,
            None => derive_name(entry.path(), root)?,
        };
        debug!("loaded role {} from {}", name, entry.path().display());
        roles.push(RoleDescriptor {
            name,
            stack: raw.stack,
            vars: raw.vars,
        });
    }
    Ok(roles)
}

fn derive_name(role_file: &Path, root: &Path) -> Result<String> {
    let parent = role_file.parent().unwrap_or(root);
    let rel = diff_paths(parent, root).unwrap_or_default();
    let name = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("-");
    if name.is_empty() {
        bail!(
            "role file {} sits at the roles root and has no name field",
            role_file.display()
        );
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_roles_file() {
        let temp_dir = TempDir::new().unwrap();
        let roles_file = temp_dir.path().join("roles.json");
        fs::write(
            &roles_file,
            r#"[
                { "name": "billing-api", "stack": "php", "vars": { "port": 80 } },
                { "name": "worker", "stack": "python", "vars": {} }
            ]"#,
        )
        .unwrap();

        let roles = load_roles_file(&roles_file).unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].name, "billing-api");
        assert_eq!(roles[0].stack, "php");
        assert_eq!(roles[0].vars.get("port"), Some(&VarValue::Int(80)));
        assert_eq!(roles[1].name, "worker");
    }

    #[test]
    fn test_load_roles_file_requires_names() {
        let temp_dir = TempDir::new().unwrap();
        let roles_file = temp_dir.path().join("roles.json");
        fs::write(&roles_file, r#"[{ "stack": "php" }]"#).unwrap();

        let err = load_roles_file(&roles_file).unwrap_err();
        assert!(err.to_string().contains("no name"));
    }

    #[test]
    fn test_load_roles_dir_names_from_directories() {
        let temp_dir = TempDir::new().unwrap();
        let billing = temp_dir.path().join("billing-api");
        fs::create_dir(&billing).unwrap();
        fs::write(
            billing.join("role.json"),
            r#"{ "stack": "php", "vars": { "port": 80 } }"#,
        )
        .unwrap();

        let nested = temp_dir.path().join("internal").join("metrics");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("role.json"), r#"{ "stack": "python" }"#).unwrap();

        let roles = load_roles_dir(temp_dir.path()).unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].name, "billing-api");
        assert_eq!(roles[1].name, "internal-metrics");
    }

    #[test]
    fn test_load_roles_dir_explicit_name_wins() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("some-dir");
        fs::create_dir(&dir).unwrap();
        fs::write(
            dir.join("role.json"),
            r#"{ "name": "frontend", "stack": "node" }"#,
        )
        .unwrap();

        let roles = load_roles_dir(temp_dir.path()).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "frontend");
    }

    #[test]
    fn test_load_roles_dir_empty() {
        let temp_dir = TempDir::new().unwrap();
        let roles = load_roles_dir(temp_dir.path()).unwrap();
        assert!(roles.is_empty());
    }

    #[test]
    fn test_vars_preserve_supplied_order() {
        let temp_dir = TempDir::new().unwrap();
        let roles_file = temp_dir.path().join("roles.json");
        fs::write(
            &roles_file,
            r#"[{ "name": "r", "stack": "php", "vars": { "port": 80, "extra_packages": ["php-xml"] } }]"#,
        )
        .unwrap();

        let roles = load_roles_file(&roles_file).unwrap();
        let keys: Vec<&String> = roles[0].vars.keys().collect();
        assert_eq!(keys, ["port", "extra_packages"]);
    }
}
