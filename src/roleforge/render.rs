// Purpose: The substitution engine. Merges a role descriptor into its
// stack's template, producing a concrete build specification. Role values
// are opaque data throughout: they are type-checked, screened for control
// characters and then carried as-is, never re-parsed as instruction syntax.

use log::debug;

use super::error::ResolveError;
use super::role::RoleDescriptor;
use super::spec::{BuildInstruction, BuildSpecification};
use super::template::{IntArg, ListPart, SlotType, StrArg, Template, TemplateInstruction, VarValue};

pub fn render(
    template: &Template,
    role: &RoleDescriptor,
    tag: &str,
) -> Result<BuildSpecification, ResolveError> {
    // A supplied variable the template never declared is a role typo, not
    // something to silently ignore.
    for name in role.vars.keys() {
        if template.slot(name).is_none() {
            return Err(ResolveError::UnknownVariable { slot: name.clone() });
        }
    }

    let mut instructions = Vec::with_capacity(template.instructions.len());
    for instruction in &template.instructions {
        if let Some(rendered) = render_instruction(instruction, template, role)? {
            instructions.push(rendered);
        } else {
            debug!("role {}: omitting empty instruction", role.name);
        }
    }

    let exposed_ports = instructions
        .iter()
        .filter_map(|i| match i {
            BuildInstruction::Expose { port } => Some(*port),
            _ => None,
        })
        .collect();
    let context_files = instructions
        .iter()
        .flat_map(|i| match i {
            BuildInstruction::Copy { sources, .. } => sources.clone(),
            _ => Vec::new(),
        })
        .collect();

    Ok(BuildSpecification {
        role: role.name.clone(),
        stack: template.stack.clone(),
        image_tag: image_tag(&role.name, tag),
        instructions,
        exposed_ports,
        context_files,
    })
}

pub fn image_tag(role: &str, tag: &str) -> String {
    let name = role.replace(['/', '.', '_', ' '], "-").to_lowercase();
    format!("roleforge/{}:{}", name, tag.to_lowercase())
}

// None means the instruction resolved to nothing and is omitted, e.g. an
// optional package list with no entries.
fn render_instruction(
    instruction: &TemplateInstruction,
    template: &Template,
    role: &RoleDescriptor,
) -> Result<Option<BuildInstruction>, ResolveError> {
    match instruction {
        TemplateInstruction::BaseImage { image } => Ok(Some(BuildInstruction::From {
            image: resolve_str(image, template, role)?,
        })),
        TemplateInstruction::InstallPackages { packages } => {
            let packages = resolve_list(packages, template, role)?;
            if packages.is_empty() {
                Ok(None)
            } else {
                Ok(Some(BuildInstruction::InstallPackages { packages }))
            }
        }
        TemplateInstruction::Copy { sources, dest } => {
            let sources = resolve_list(sources, template, role)?;
            if sources.is_empty() {
                Ok(None)
            } else {
                Ok(Some(BuildInstruction::Copy {
                    sources,
                    dest: resolve_str(dest, template, role)?,
                }))
            }
        }
        TemplateInstruction::Expose { port } => Ok(Some(BuildInstruction::Expose {
            port: resolve_int(port, template, role)?,
        })),
        TemplateInstruction::Entrypoint { command } => {
            let command = resolve_list(command, template, role)?;
            if command.is_empty() {
                Ok(None)
            } else {
                Ok(Some(BuildInstruction::Entrypoint { command }))
            }
        }
    }
}

// Resolution order: role value if present and type-valid, else the declared
// default, else an empty list for optional list slots, else failure.
fn resolve_slot(
    template: &Template,
    role: &RoleDescriptor,
    name: &str,
) -> Result<VarValue, ResolveError> {
    let decl = template
        .slot(name)
        .ok_or_else(|| ResolveError::UnknownVariable {
            slot: name.to_string(),
        })?;

    if let Some(value) = role.vars.get(name) {
        if !value.matches(decl.ty) {
            return Err(ResolveError::TypeMismatch {
                slot: name.to_string(),
                expected: decl.ty,
                supplied: value.type_name(),
            });
        }
        check_safe(name, value)?;
        return Ok(value.clone());
    }

    if let Some(default) = &decl.default {
        return Ok(default.clone());
    }

    if matches!(decl.ty, SlotType::StringList | SlotType::ArgVector) && !decl.required {
        return Ok(VarValue::List(Vec::new()));
    }

    Err(ResolveError::MissingRequiredVariable {
        slot: name.to_string(),
    })
}

// Role data with embedded line breaks could smuggle extra instructions past
// the renderer, so it is rejected before substitution.
fn check_safe(slot: &str, value: &VarValue) -> Result<(), ResolveError> {
    let scan = |s: &str| -> Result<(), ResolveError> {
        if s.chars().any(|c| matches!(c, '\n' | '\r' | '\0')) {
            return Err(ResolveError::UnsafeValue {
                slot: slot.to_string(),
                detail: "embedded control character".to_string(),
            });
        }
        Ok(())
    };
    match value {
        VarValue::Str(s) => scan(s),
        VarValue::List(items) => items.iter().try_for_each(|s| scan(s)),
        VarValue::Int(_) => Ok(()),
    }
}

fn resolve_str(
    arg: &StrArg,
    template: &Template,
    role: &RoleDescriptor,
) -> Result<String, ResolveError> {
    match arg {
        StrArg::Literal(s) => Ok(s.clone()),
        StrArg::Slot { slot } => match resolve_slot(template, role, slot)? {
            VarValue::Str(s) => Ok(s),
            other => Err(ResolveError::TypeMismatch {
                slot: slot.clone(),
                expected: SlotType::String,
                supplied: other.type_name(),
            }),
        },
    }
}

fn resolve_int(
    arg: &IntArg,
    template: &Template,
    role: &RoleDescriptor,
) -> Result<i64, ResolveError> {
    match arg {
        IntArg::Literal(n) => Ok(*n),
        IntArg::Slot { slot } => match resolve_slot(template, role, slot)? {
            VarValue::Int(n) => Ok(n),
            other => Err(ResolveError::TypeMismatch {
                slot: slot.clone(),
                expected: SlotType::Port,
                supplied: other.type_name(),
            }),
        },
    }
}

// List slot splices expand element-wise in supplied order.
fn resolve_list(
    parts: &[ListPart],
    template: &Template,
    role: &RoleDescriptor,
) -> Result<Vec<String>, ResolveError> {
    let mut out = Vec::new();
    for part in parts {
        match part {
            ListPart::Item(s) => out.push(s.clone()),
            ListPart::Slot { slot } => match resolve_slot(template, role, slot)? {
                VarValue::List(items) => out.extend(items),
                other => {
                    return Err(ResolveError::TypeMismatch {
                        slot: slot.clone(),
                        expected: SlotType::StringList,
                        supplied: other.type_name(),
                    });
                }
            },
        }
    }
    Ok(out)
}
