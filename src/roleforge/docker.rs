// Purpose: Thin wrapper around the external container builder. Everything
// above this module is pure computation; process invocation lives here only.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::ValueEnum;
use log::{debug, log_enabled};
use subprocess::{Popen, PopenConfig};

use super::spec::BuildSpecification;

#[derive(Debug, Default, Clone, Copy, ValueEnum)]
pub enum Executor {
    #[default]
    Auto,
    Docker,
    Podman,
}

pub fn check_docker() -> Result<()> {
    let mut p = Popen::create(
        &["docker", "ps"],
        PopenConfig {
            stdout: subprocess::Redirection::Pipe,
            stderr: subprocess::Redirection::Pipe,
            ..Default::default()
        },
    )?;
    p.wait_timeout(Duration::from_secs(5))?;
    Ok(())
}

pub fn check_podman() -> Result<()> {
    let mut p = Popen::create(
        &["podman", "ps"],
        PopenConfig {
            stdout: subprocess::Redirection::Pipe,
            stderr: subprocess::Redirection::Pipe,
            ..Default::default()
        },
    )?;
    p.wait_timeout(Duration::from_secs(5))?;
    Ok(())
}

pub fn get_executor(executor: Executor) -> Result<String> {
    match executor {
        Executor::Docker => {
            check_docker()?;
            Ok("docker".to_string())
        }
        Executor::Podman => {
            check_podman()?;
            Ok("podman".to_string())
        }
        Executor::Auto => {
            if check_docker().is_ok() {
                Ok("docker".to_string())
            } else if check_podman().is_ok() {
                Ok("podman".to_string())
            } else {
                Err(anyhow::anyhow!("Docker or Podman not found."))
            }
        }
    }
}

pub fn build_image(
    spec: &BuildSpecification,
    dockerfile: &Path,
    context_dir: &Path,
    executor: Executor,
) -> Result<String> {
    let executor = get_executor(executor)?;

    let dockerfile_arg = dockerfile
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non-utf8 dockerfile path"))?;
    let context_arg = context_dir
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non-utf8 context path"))?;

    debug!("Building image: {}", spec.image_tag);
    let mut popen_conf = PopenConfig {
        stdout: subprocess::Redirection::Pipe,
        stderr: subprocess::Redirection::Pipe,
        ..Default::default()
    };
    if log_enabled!(log::Level::Debug) {
        // This prints all builder logs
        popen_conf = PopenConfig::default();
    }
    let mut p = Popen::create(
        &[
            executor.as_str(),
            "build",
            "-t",
            spec.image_tag.as_str(),
            "-f",
            dockerfile_arg,
            context_arg,
        ],
        popen_conf,
    )?;
    let status = p.wait_timeout(Duration::from_secs(300))?;

    match status {
        Some(s) if s.success() => Ok(spec.image_tag.clone()),
        _ => Err(anyhow::anyhow!("Failed to build {}", spec.image_tag)),
    }
}
