use clap::Parser;
use rockchip_build::cli::{init_logging, report};
use rockchip_build::command::SystemRunner;
use rockchip_build::compile::get_default_jobs;
use rockchip_build::pipeline::KernelBuild;
use rockchip_build::store::paths::RESULT_DIR;
use rockchip_build::target::NANOPI_ZERO2_KERNEL;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

/// Downloads and cross-compiles the NanoPi Zero2 kernel.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, default_value_t = Level::INFO)]
    level: Level,

    /// Directory the source archive is downloaded to and extracted in
    #[clap(long, default_value = ".")]
    workdir: PathBuf,

    #[clap(long, env = "BUILDRESULT_DIR", default_value = RESULT_DIR)]
    result_dir: PathBuf,

    #[clap(long, default_value_t = get_default_jobs())]
    jobs: usize,

    /// Remove the extracted source tree after a successful build
    #[clap(long)]
    cleanup: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.level) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    let build = KernelBuild {
        runner: &SystemRunner,
        target: &NANOPI_ZERO2_KERNEL,
        workdir: cli.workdir,
        result_dir: cli.result_dir,
        jobs: cli.jobs,
        cleanup: cli.cleanup,
    };

    report(build.run().await)
}
