// Purpose: Writes validated specifications to disk, one directory per role
// with the rendered Dockerfile and the specification JSON next to it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;

use super::spec::BuildSpecification;

pub struct Emitter {
    out_dir: PathBuf,
}

impl Emitter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    // Returns the path of the written Dockerfile.
    pub fn emit(&self, spec: &BuildSpecification) -> Result<PathBuf> {
        // Role names become path segments.
        let role_dir = self.out_dir.join(spec.role.replace(['/', '\\'], "-"));
        std::fs::create_dir_all(&role_dir)
            .with_context(|| format!("creating {}", role_dir.display()))?;

        let dockerfile = role_dir.join("Dockerfile");
        std::fs::write(&dockerfile, spec.to_dockerfile())
            .with_context(|| format!("writing {}", dockerfile.display()))?;

        let spec_path = role_dir.join("spec.json");
        let spec_json = serde_json::to_string_pretty(spec)?;
        std::fs::write(&spec_path, spec_json)
            .with_context(|| format!("writing {}", spec_path.display()))?;

        debug!("wrote {}", dockerfile.display());
        Ok(dockerfile)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::roleforge::spec::BuildInstruction;

    fn sample_spec() -> BuildSpecification {
        BuildSpecification {
            role: "billing-api".to_string(),
            stack: "php".to_string(),
            image_tag: "roleforge/billing-api:latest".to_string(),
            instructions: vec![BuildInstruction::From {
                image: "ubuntu:22.04".to_string(),
            }],
            exposed_ports: vec![],
            context_files: vec![],
        }
    }

    #[test]
    fn test_emit_writes_dockerfile_and_spec() {
        let temp_dir = TempDir::new().unwrap();
        let emitter = Emitter::new(temp_dir.path());

        let dockerfile = emitter.emit(&sample_spec()).unwrap();
        assert!(dockerfile.ends_with("billing-api/Dockerfile"));

        let content = fs::read_to_string(&dockerfile).unwrap();
        assert_eq!(content, "FROM ubuntu:22.04\n");

        let spec_json =
            fs::read_to_string(temp_dir.path().join("billing-api").join("spec.json")).unwrap();
        let back: BuildSpecification = serde_json::from_str(&spec_json).unwrap();
        assert_eq!(back, sample_spec());
    }

    #[test]
    fn test_emit_sanitizes_role_path_segment() {
        let temp_dir = TempDir::new().unwrap();
        let emitter = Emitter::new(temp_dir.path());

        let mut spec = sample_spec();
        spec.role = "infra/db".to_string();
        let dockerfile = emitter.emit(&spec).unwrap();
        assert!(dockerfile.ends_with("infra-db/Dockerfile"));
    }

    #[test]
    fn test_emit_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let emitter = Emitter::new(temp_dir.path());

        emitter.emit(&sample_spec()).unwrap();
        emitter.emit(&sample_spec()).unwrap();
    }
}
