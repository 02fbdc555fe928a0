use clap::Parser;
use rockchip_build::cli::{get_default_triple, init_logging, report, resolve_runtime};
use rockchip_build::command::SystemRunner;
use rockchip_build::container::{CliRuntime, Identity};
use rockchip_build::pipeline::Rebuild;
use rockchip_build::target::KERNEL_REBUILD;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

/// Runs `build-kernel` in a container and copies the kernel outputs here.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, default_value_t = Level::INFO)]
    level: Level,

    /// Container runtime executable, detected from `PATH` when unset
    #[clap(long, env = "CONTAINER_RUNTIME")]
    runtime: Option<String>,

    /// Cargo project the embedded orchestrator is built from
    #[clap(long, default_value = ".")]
    project_dir: PathBuf,

    #[clap(long, default_value_t = get_default_triple())]
    target: String,

    #[clap(long, default_value = ".")]
    output_dir: PathBuf,

    /// Leave the container build context in place
    #[clap(long)]
    keep_context: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.level) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    let runtime = CliRuntime::new(resolve_runtime(cli.runtime), SystemRunner);

    let rebuild = Rebuild {
        runner: &SystemRunner,
        runtime: &runtime,
        target: &KERNEL_REBUILD,
        project_dir: cli.project_dir,
        triple: cli.target,
        context_files: vec![],
        output_dir: cli.output_dir,
        identity: Identity::current(),
        keep_context: cli.keep_context,
    };

    report(rebuild.run().await)
}
