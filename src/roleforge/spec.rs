// Purpose: The rendered build specification and its Dockerfile form. A
// specification is plain data with no unresolved slots left; once validated
// it is handed to the build collaborator as-is.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

// Fully substituted counterpart of TemplateInstruction. Values arrived here
// as opaque data; emission quotes them, it never re-parses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BuildInstruction {
    From { image: String },
    InstallPackages { packages: Vec<String> },
    Copy { sources: Vec<String>, dest: String },
    Expose { port: i64 },
    Entrypoint { command: Vec<String> },
}

impl BuildInstruction {
    pub fn to_line(&self) -> String {
        match self {
            BuildInstruction::From { image } => format!("FROM {}", image),
            BuildInstruction::InstallPackages { packages } => {
                let list = packages
                    .iter()
                    .map(|p| shell_quote(p))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(
                    "RUN apt-get update && apt-get install -y {} && rm -rf /var/lib/apt/lists/*",
                    list
                )
            }
            BuildInstruction::Copy { sources, dest } => {
                // Exec form only when a path would break the shell form.
                if sources.iter().chain([dest]).any(|p| needs_exec_form(p)) {
                    let parts = sources
                        .iter()
                        .chain([dest])
                        .map(|p| json_quote(p))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("COPY [{}]", parts)
                } else {
                    format!("COPY {} {}", sources.join(" "), dest)
                }
            }
            BuildInstruction::Expose { port } => format!("EXPOSE {}", port),
            BuildInstruction::Entrypoint { command } => {
                let parts = command
                    .iter()
                    .map(|a| json_quote(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("CMD [{}]", parts)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpecification {
    pub role: String,
    pub stack: String,
    pub image_tag: String,
    pub instructions: Vec<BuildInstruction>,
    pub exposed_ports: Vec<i64>,
    pub context_files: Vec<String>,
}

impl BuildSpecification {
    pub fn to_dockerfile(&self) -> String {
        let mut out = String::new();
        for instruction in &self.instructions {
            out.push_str(&instruction.to_line());
            out.push('\n');
        }
        out
    }
}

// POSIX single-quoting. Bare tokens stay bare so the common case reads like
// a hand-written Dockerfile; anything else is quoted atomically.
pub fn shell_quote(s: &str) -> String {
    let bare = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_' | ':' | '/' | '=' | '@' | '%' | ','));
    if bare {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

fn needs_exec_form(path: &str) -> bool {
    path.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\')
}

fn json_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_line() {
        let line = BuildInstruction::From {
            image: "ubuntu:22.04".to_string(),
        }
        .to_line();
        assert_eq!(line, "FROM ubuntu:22.04");
    }

    #[test]
    fn test_install_packages_line() {
        let line = BuildInstruction::InstallPackages {
            packages: vec![
                "apache2".to_string(),
                "php".to_string(),
                "libapache2-mod-php".to_string(),
                "php-mysql".to_string(),
            ],
        }
        .to_line();
        assert_eq!(
            line,
            "RUN apt-get update && apt-get install -y apache2 php libapache2-mod-php php-mysql && rm -rf /var/lib/apt/lists/*"
        );
    }

    #[test]
    fn test_install_packages_quotes_hostile_token() {
        let line = BuildInstruction::InstallPackages {
            packages: vec!["php; rm -rf /".to_string()],
        }
        .to_line();
        assert!(line.contains("'php; rm -rf /'"));
    }

    #[test]
    fn test_copy_shell_form() {
        let line = BuildInstruction::Copy {
            sources: vec!["index.php".to_string()],
            dest: "/var/www/html/".to_string(),
        }
        .to_line();
        assert_eq!(line, "COPY index.php /var/www/html/");
    }

    #[test]
    fn test_copy_exec_form_for_spaced_path() {
        let line = BuildInstruction::Copy {
            sources: vec!["my file.php".to_string()],
            dest: "/var/www/html/".to_string(),
        }
        .to_line();
        assert_eq!(line, r#"COPY ["my file.php", "/var/www/html/"]"#);
    }

    #[test]
    fn test_entrypoint_line() {
        let line = BuildInstruction::Entrypoint {
            command: vec![
                "apachectl".to_string(),
                "-D".to_string(),
                "FOREGROUND".to_string(),
            ],
        }
        .to_line();
        assert_eq!(line, r#"CMD ["apachectl", "-D", "FOREGROUND"]"#);
    }

    #[test]
    fn test_entrypoint_escapes_quotes() {
        let line = BuildInstruction::Entrypoint {
            command: vec![r#"say "hi""#.to_string()],
        }
        .to_line();
        assert_eq!(line, r#"CMD ["say \"hi\""]"#);
    }

    #[test]
    fn test_shell_quote_bare() {
        assert_eq!(shell_quote("libapache2-mod-php"), "libapache2-mod-php");
        assert_eq!(shell_quote("php7.4+patch"), "php7.4+patch");
    }

    #[test]
    fn test_shell_quote_hostile() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("$(reboot)"), "'$(reboot)'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_dockerfile_round_trip_text() {
        let spec = BuildSpecification {
            role: "billing-api".to_string(),
            stack: "php".to_string(),
            image_tag: "roleforge/billing-api:latest".to_string(),
            instructions: vec![
                BuildInstruction::From {
                    image: "ubuntu:22.04".to_string(),
                },
                BuildInstruction::Expose { port: 80 },
            ],
            exposed_ports: vec![80],
            context_files: vec![],
        };
        assert_eq!(spec.to_dockerfile(), "FROM ubuntu:22.04\nEXPOSE 80\n");
    }

    #[test]
    fn test_spec_serializes_to_json() {
        let spec = BuildSpecification {
            role: "r".to_string(),
            stack: "php".to_string(),
            image_tag: "roleforge/r:latest".to_string(),
            instructions: vec![BuildInstruction::Expose { port: 80 }],
            exposed_ports: vec![80],
            context_files: vec![],
        };
        let json = serde_json::to_string(&spec).unwrap();
        let back: BuildSpecification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
