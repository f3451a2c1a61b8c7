// Purpose: Structural and security checks over a rendered specification.
// Rules run in a fixed order and the first violation is reported; a
// specification is never partially accepted.

use std::path::{Component, Path};

use super::error::ValidationError;
use super::spec::{BuildInstruction, BuildSpecification};

pub fn validate(spec: &BuildSpecification) -> Result<(), ValidationError> {
    check_base_image(&spec.instructions)?;
    check_ports(&spec.instructions)?;
    check_entrypoint_terminal(&spec.instructions)?;
    check_copy_sources(&spec.instructions)?;
    check_package_names(&spec.instructions)?;
    Ok(())
}

// Rule 1: exactly one base image, and it comes first.
fn check_base_image(instructions: &[BuildInstruction]) -> Result<(), ValidationError> {
    let mut positions = instructions
        .iter()
        .enumerate()
        .filter(|(_, i)| matches!(i, BuildInstruction::From { .. }))
        .map(|(pos, _)| pos);

    let Some(first) = positions.next() else {
        return Err(ValidationError::MissingBaseImage);
    };
    if first != 0 {
        return Err(ValidationError::BaseImageNotFirst { position: first });
    }
    if positions.next().is_some() {
        return Err(ValidationError::DuplicateBaseImage);
    }
    Ok(())
}

// Rule 2: exposed ports are in [1, 65535].
fn check_ports(instructions: &[BuildInstruction]) -> Result<(), ValidationError> {
    for instruction in instructions {
        if let BuildInstruction::Expose { port } = instruction {
            if !(1..=65535).contains(port) {
                return Err(ValidationError::PortOutOfRange { port: *port });
            }
        }
    }
    Ok(())
}

// Rule 3: the entrypoint is terminal.
fn check_entrypoint_terminal(instructions: &[BuildInstruction]) -> Result<(), ValidationError> {
    let entrypoint = instructions
        .iter()
        .position(|i| matches!(i, BuildInstruction::Entrypoint { .. }));
    if let Some(pos) = entrypoint {
        if pos + 1 < instructions.len() {
            return Err(ValidationError::InstructionAfterEntrypoint { position: pos + 1 });
        }
    }
    Ok(())
}

// Rule 4: copy sources stay inside the build context. Any parent-dir
// segment is rejected, even one that would not escape after normalization.
fn check_copy_sources(instructions: &[BuildInstruction]) -> Result<(), ValidationError> {
    for instruction in instructions {
        if let BuildInstruction::Copy { sources, .. } = instruction {
            for source in sources {
                let path = Path::new(source);
                if path.is_absolute() {
                    return Err(ValidationError::AbsoluteCopySource {
                        path: source.clone(),
                    });
                }
                if path.components().any(|c| matches!(c, Component::ParentDir)) {
                    return Err(ValidationError::TraversalAttempt {
                        path: source.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

// Rule 5: package names hold no shell metacharacters, on top of the quoting
// the renderer already applies.
fn check_package_names(instructions: &[BuildInstruction]) -> Result<(), ValidationError> {
    for instruction in instructions {
        if let BuildInstruction::InstallPackages { packages } = instruction {
            for package in packages {
                if !allowed_package_name(package) {
                    return Err(ValidationError::ForbiddenPackageName {
                        package: package.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn allowed_package_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.'))
}
