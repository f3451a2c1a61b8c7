// Purpose: The declarative template model. A template is data, not code: an
// ordered list of build-instruction primitives plus the slot schema they may
// reference. Adding a stack means adding a template, never engine logic.

use serde::{Deserialize, Serialize};

use super::error::TemplateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    String,
    StringList,
    Port,
    ArgVector,
}

impl std::fmt::Display for SlotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SlotType::String => "string",
            SlotType::StringList => "string_list",
            SlotType::Port => "port",
            SlotType::ArgVector => "arg_vector",
        };
        f.write_str(name)
    }
}

// A value for a slot, supplied by a role or declared as a template default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl VarValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            VarValue::Int(_) => "integer",
            VarValue::Str(_) => "string",
            VarValue::List(_) => "list",
        }
    }

    pub fn matches(&self, ty: SlotType) -> bool {
        matches!(
            (self, ty),
            (VarValue::Str(_), SlotType::String)
                | (VarValue::Int(_), SlotType::Port)
                | (VarValue::List(_), SlotType::StringList)
                | (VarValue::List(_), SlotType::ArgVector)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SlotType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<VarValue>,
}

// A scalar string argument: literal text or a slot reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrArg {
    Literal(String),
    Slot { slot: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntArg {
    Literal(i64),
    Slot { slot: String },
}

// One element of a list argument. A slot splice expands to zero or more
// elements at render time, preserving the supplied element order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListPart {
    Item(String),
    Slot { slot: String },
}

// The closed set of build-instruction primitives. The validator reasons
// exhaustively over these, so new kinds must be added here and handled
// everywhere the compiler then points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TemplateInstruction {
    BaseImage { image: StrArg },
    InstallPackages { packages: Vec<ListPart> },
    Copy { sources: Vec<ListPart>, dest: StrArg },
    Expose { port: IntArg },
    Entrypoint { command: Vec<ListPart> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub stack: String,
    pub instructions: Vec<TemplateInstruction>,
    #[serde(default)]
    pub slots: Vec<SlotDecl>,
}

impl Template {
    pub fn slot(&self, name: &str) -> Option<&SlotDecl> {
        self.slots.iter().find(|s| s.name == name)
    }

    // Every slot reference in instruction order, paired with the type the
    // referencing position demands.
    fn slot_refs(&self) -> Vec<(&str, SlotType)> {
        let mut refs = Vec::new();
        for instruction in &self.instructions {
            match instruction {
                TemplateInstruction::BaseImage { image } => push_str_ref(&mut refs, image),
                TemplateInstruction::InstallPackages { packages } => {
                    push_list_refs(&mut refs, packages, SlotType::StringList);
                }
                TemplateInstruction::Copy { sources, dest } => {
                    push_list_refs(&mut refs, sources, SlotType::StringList);
                    push_str_ref(&mut refs, dest);
                }
                TemplateInstruction::Expose { port } => {
                    if let IntArg::Slot { slot } = port {
                        refs.push((slot.as_str(), SlotType::Port));
                    }
                }
                TemplateInstruction::Entrypoint { command } => {
                    push_list_refs(&mut refs, command, SlotType::ArgVector);
                }
            }
        }
        refs
    }

    // Authoring errors surface here, at load time, never at render time.
    pub fn verify(&self) -> Result<(), TemplateError> {
        for (i, decl) in self.slots.iter().enumerate() {
            if self.slots[..i].iter().any(|p| p.name == decl.name) {
                return Err(TemplateError::DuplicateSlot {
                    stack: self.stack.clone(),
                    slot: decl.name.clone(),
                });
            }
        }

        for decl in &self.slots {
            if let Some(default) = &decl.default {
                if !default.matches(decl.ty) {
                    return Err(TemplateError::BadDefault {
                        stack: self.stack.clone(),
                        slot: decl.name.clone(),
                        expected: decl.ty,
                    });
                }
            }
        }

        for (name, referenced) in self.slot_refs() {
            match self.slot(name) {
                None => {
                    return Err(TemplateError::UndeclaredSlot {
                        stack: self.stack.clone(),
                        slot: name.to_string(),
                    });
                }
                Some(decl) if decl.ty != referenced => {
                    return Err(TemplateError::SlotTypeConflict {
                        stack: self.stack.clone(),
                        slot: name.to_string(),
                        declared: decl.ty,
                        referenced,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

fn push_str_ref<'a>(refs: &mut Vec<(&'a str, SlotType)>, arg: &'a StrArg) {
    if let StrArg::Slot { slot } = arg {
        refs.push((slot.as_str(), SlotType::String));
    }
}

fn push_list_refs<'a>(refs: &mut Vec<(&'a str, SlotType)>, parts: &'a [ListPart], ty: SlotType) {
    for part in parts {
        if let ListPart::Slot { slot } = part {
            refs.push((slot.as_str(), ty));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_template() -> Template {
        Template {
            stack: "test".to_string(),
            instructions: vec![TemplateInstruction::BaseImage {
                image: StrArg::Literal("ubuntu:22.04".to_string()),
            }],
            slots: vec![],
        }
    }

    #[test]
    fn test_verify_minimal_template() {
        minimal_template().verify().unwrap();
    }

    #[test]
    fn test_verify_duplicate_slot() {
        let mut template = minimal_template();
        template.slots = vec![
            SlotDecl {
                name: "port".to_string(),
                ty: SlotType::Port,
                required: true,
                default: None,
            },
            SlotDecl {
                name: "port".to_string(),
                ty: SlotType::String,
                required: false,
                default: None,
            },
        ];

        let err = template.verify().unwrap_err();
        assert_eq!(
            err,
            TemplateError::DuplicateSlot {
                stack: "test".to_string(),
                slot: "port".to_string()
            }
        );
    }

    #[test]
    fn test_verify_undeclared_slot_reference() {
        let mut template = minimal_template();
        template.instructions.push(TemplateInstruction::Expose {
            port: IntArg::Slot {
                slot: "port".to_string(),
            },
        });

        let err = template.verify().unwrap_err();
        assert_eq!(
            err,
            TemplateError::UndeclaredSlot {
                stack: "test".to_string(),
                slot: "port".to_string()
            }
        );
    }

    #[test]
    fn test_verify_slot_type_conflict() {
        let mut template = minimal_template();
        template.instructions.push(TemplateInstruction::Expose {
            port: IntArg::Slot {
                slot: "port".to_string(),
            },
        });
        template.slots.push(SlotDecl {
            name: "port".to_string(),
            ty: SlotType::String,
            required: true,
            default: None,
        });

        let err = template.verify().unwrap_err();
        assert_eq!(
            err,
            TemplateError::SlotTypeConflict {
                stack: "test".to_string(),
                slot: "port".to_string(),
                declared: SlotType::String,
                referenced: SlotType::Port,
            }
        );
    }

    #[test]
    fn test_verify_default_type_mismatch() {
        let mut template = minimal_template();
        template.slots.push(SlotDecl {
            name: "extra".to_string(),
            ty: SlotType::StringList,
            required: false,
            default: Some(VarValue::Str("not-a-list".to_string())),
        });

        let err = template.verify().unwrap_err();
        assert_eq!(
            err,
            TemplateError::BadDefault {
                stack: "test".to_string(),
                slot: "extra".to_string(),
                expected: SlotType::StringList,
            }
        );
    }

    #[test]
    fn test_var_value_matches() {
        assert!(VarValue::Int(80).matches(SlotType::Port));
        assert!(VarValue::Str("x".to_string()).matches(SlotType::String));
        assert!(VarValue::List(vec![]).matches(SlotType::StringList));
        assert!(VarValue::List(vec![]).matches(SlotType::ArgVector));
        assert!(!VarValue::Int(80).matches(SlotType::String));
        assert!(!VarValue::Str("80".to_string()).matches(SlotType::Port));
    }

    #[test]
    fn test_instruction_json_shape() {
        let src = r#"{ "op": "install_packages", "packages": ["apache2", { "slot": "extra" }] }"#;
        let parsed: TemplateInstruction = serde_json::from_str(src).unwrap();
        match parsed {
            TemplateInstruction::InstallPackages { packages } => {
                assert_eq!(packages.len(), 2);
                assert!(matches!(packages[0], ListPart::Item(ref s) if s == "apache2"));
                assert!(matches!(packages[1], ListPart::Slot { ref slot } if slot == "extra"));
            }
            other => panic!("unexpected instruction: {:?}", other),
        }
    }
}
