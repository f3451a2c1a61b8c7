mod roleforge;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use log::debug;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use roleforge::docker::Executor;
use roleforge::emit::Emitter;
use roleforge::resolver::{ResolutionMap, Resolver};
use roleforge::role::{self, RoleDescriptor};
use roleforge::store::TemplateStore;

#[derive(Debug, Args)]
struct GlobalOpts {
    // Extra template dir; shadows builtin stacks of the same name.
    #[arg(long, short, global = true)]
    templates_dir: Option<PathBuf>,

    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct RoleSourceOpts {
    // Directory tree with one role.json per role directory
    #[arg(long, short)]
    roles_dir: Option<PathBuf>,

    // Single JSON file holding an array of role descriptors
    #[arg(long, short = 'f')]
    roles_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[clap(
        name = "render",
        about = "Render and validate a Dockerfile for every role."
    )]
    Render {
        #[clap(flatten)]
        roles: RoleSourceOpts,

        #[arg(long, short, default_value_os_t = PathBuf::from("build"))]
        out_dir: PathBuf,

        #[arg(long, default_value = "latest")]
        tag: String,
    },

    #[clap(
        name = "check",
        about = "Resolve and validate every role without writing anything."
    )]
    Check {
        #[clap(flatten)]
        roles: RoleSourceOpts,

        #[arg(long, default_value = "latest")]
        tag: String,
    },

    #[clap(
        name = "build",
        about = "Render one role and build its image with docker/podman."
    )]
    Build {
        // Role name as it appears in the inventory
        role: String,

        #[clap(flatten)]
        roles: RoleSourceOpts,

        #[arg(long, short, default_value_os_t = PathBuf::from("build"))]
        out_dir: PathBuf,

        #[arg(long, default_value = "latest")]
        tag: String,

        // Build context handed to the container builder
        #[arg(long, default_value_os_t = PathBuf::from("."))]
        context: PathBuf,

        #[arg(long, value_enum, default_value_t = Executor::Auto)]
        executor: Executor,
    },
}

#[derive(Parser)]
#[command(name = "roleforge")]
#[command(about = "Renders per-role container build specifications from stack templates.", long_about = None)]
#[command(version)]
pub struct App {
    #[clap(flatten)]
    args: GlobalOpts,

    #[clap(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let app = App::parse();
    let level = if app.args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let store = load_store(app.args.templates_dir.as_deref())?;

    match app.command {
        Command::Render {
            roles,
            out_dir,
            tag,
        } => {
            let roles = load_roles(&roles)?;
            let results = Resolver::new(&store).with_tag(tag).resolve_all(&roles);

            let emitter = Emitter::new(out_dir);
            for (name, result) in &results {
                if let Ok(spec) = result {
                    let path = emitter.emit(spec)?;
                    debug!("role {}: dockerfile at {}", name, path.display());
                }
            }
            finish(&results)
        }
        Command::Check { roles, tag } => {
            let roles = load_roles(&roles)?;
            let results = Resolver::new(&store).with_tag(tag).resolve_all(&roles);
            finish(&results)
        }
        Command::Build {
            role,
            roles,
            out_dir,
            tag,
            context,
            executor,
        } => {
            let roles = load_roles(&roles)?;
            let Some(descriptor) = roles.iter().find(|r| r.name == role) else {
                bail!("role {} not found in the given inventory", role);
            };
            let spec = Resolver::new(&store)
                .with_tag(tag)
                .resolve(descriptor)
                .map_err(|e| anyhow::anyhow!("role {}: {}", role, e))?;
            let dockerfile = Emitter::new(out_dir).emit(&spec)?;
            let image = roleforge::docker::build_image(&spec, &dockerfile, &context, executor)?;
            println!("built {}", image);
            Ok(())
        }
    }
}

// Per-role summary; a non-empty failure count becomes the process exit
// status via the returned error.
fn finish(results: &ResolutionMap) -> Result<()> {
    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(spec) => println!("{}: ok -> {}", name, spec.image_tag),
            Err(e) => {
                failed += 1;
                println!("{}: FAILED [{}]: {}", name, e.kind(), e);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} roles failed", failed, results.len());
    }
    println!("{} roles resolved", results.len());
    Ok(())
}

fn load_store(extra: Option<&Path>) -> Result<TemplateStore> {
    let mut store = TemplateStore::with_builtins()?;
    if let Some(user_dir) = home::home_dir().map(|h| h.join(".roleforge").join("templates")) {
        if user_dir.is_dir() {
            let n = store.load_dir(&user_dir)?;
            debug!("loaded {} templates from {}", n, user_dir.display());
        }
    }
    if let Some(dir) = extra {
        let n = store.load_dir(dir)?;
        debug!("loaded {} templates from {}", n, dir.display());
    }
    debug!(
        "template store ready: {:?}",
        store.stacks().collect::<Vec<_>>()
    );
    Ok(store)
}

fn load_roles(opts: &RoleSourceOpts) -> Result<Vec<RoleDescriptor>> {
    match (&opts.roles_dir, &opts.roles_file) {
        (Some(_), Some(_)) => bail!("pass either --roles-dir or --roles-file, not both"),
        (Some(dir), None) => role::load_roles_dir(dir),
        (None, Some(file)) => role::load_roles_file(file),
        (None, None) => bail!("one of --roles-dir or --roles-file is required"),
    }
}
