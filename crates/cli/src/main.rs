use anyhow::Result;
use clap::{CommandFactory, Parser};
use console::{style, Term};
use debpress_core::{
    BuildStage, Error, PipelineConfig, PipelineController, ReleaseTarget, Toolchain,
    DEFAULT_HELPER_URL,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// debpress - staged Debian package builder
#[derive(Parser)]
#[command(name = "debpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target Ubuntu release
    release: Option<String>,

    /// Package release number
    #[arg(short = 'r', long, default_value_t = 1)]
    revision: u32,

    /// Package version suffix
    #[arg(short = 'S', long)]
    suffix: Option<String>,

    /// Build signed source package
    #[arg(short = 's', long)]
    source: bool,

    /// Build unsigned source package
    #[arg(short = 'u', long)]
    unsigned_source: bool,

    /// Build binary package with sbuild
    #[arg(short = 'b', long)]
    sbuild: bool,

    /// Build binary package locally, without chroot isolation
    #[arg(short = 'B', long)]
    binary: bool,

    /// Send source package to the distribution channel
    #[arg(short = 'p', long)]
    upload: bool,

    /// Keep the build workspace
    #[arg(short = 'k', long)]
    keep: bool,

    /// Directory for build workspaces (default: parent of the project dir)
    #[arg(long)]
    build_root: Option<PathBuf>,

    /// Package name (default: project directory name)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Project directory
    #[arg(short = 'C', long, default_value = ".")]
    project_dir: PathBuf,

    /// Upload channel passed to dput
    #[arg(long, default_value = "ppa:qtusb/ppa")]
    ppa: String,

    /// Skip header generation (no helper fetch)
    #[arg(long)]
    no_sync_headers: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .init();

    let term = Term::stderr();

    let Some(release_name) = cli.release.clone() else {
        Cli::command().print_help()?;
        std::process::exit(1);
    };

    if let Err(e) = ReleaseTarget::lookup(&release_name) {
        term.write_line(&format!("{} {}", style("error:").red().bold(), e))?;
        std::process::exit(1);
    }

    let project_root = cli
        .project_dir
        .canonicalize()
        .unwrap_or_else(|_| cli.project_dir.clone());
    let project_name = match &cli.name {
        Some(name) => name.clone(),
        None => project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string()),
    };
    let build_root = cli
        .build_root
        .clone()
        .unwrap_or_else(|| project_root.join(".."));

    // Stage flags run in a fixed order; implicit dependencies are resolved
    // by the pipeline itself.
    let mut stages = Vec::new();
    if cli.source {
        stages.push(BuildStage::SignedSource);
    }
    if cli.unsigned_source {
        stages.push(BuildStage::UnsignedSource);
    }
    if cli.upload {
        stages.push(BuildStage::Upload);
    }
    if cli.sbuild {
        stages.push(BuildStage::ChrootBinary);
    }
    if cli.binary {
        stages.push(BuildStage::LocalBinary);
    }

    let config = PipelineConfig {
        project_name: project_name.clone(),
        project_root,
        release: release_name.clone(),
        revision: cli.revision,
        suffix: cli.suffix.clone(),
        stages,
        keep_workspace: cli.keep,
        build_root,
        upload_channel: cli.ppa.clone(),
        helper_url: if cli.no_sync_headers {
            None
        } else {
            Some(DEFAULT_HELPER_URL.to_string())
        },
        toolchain: Toolchain::default(),
    };

    term.write_line(&format!(
        "{} Building {} for {}",
        style("::").cyan().bold(),
        project_name,
        release_name
    ))?;
    term.write_line(&format!(
        "{} Build dir: {}",
        style("::").cyan().bold(),
        config
            .build_root
            .join(format!("{project_name}-build"))
            .display()
    ))?;

    match PipelineController::new(config).run() {
        Ok(()) => {
            term.write_line(&format!("{} Done!", style("::").green().bold()))?;
            Ok(())
        }
        Err(e) => {
            if let Error::ExternalTool { output, status, .. } = &e {
                if !output.is_empty() {
                    term.write_line(output)?;
                }
                term.write_line(&format!("{} {}", style("error:").red().bold(), e))?;
                std::process::exit(status.code().unwrap_or(1));
            }
            term.write_line(&format!("{} {}", style("error:").red().bold(), e))?;
            std::process::exit(1);
        }
    }
}
