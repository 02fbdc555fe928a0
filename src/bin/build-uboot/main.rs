use clap::Parser;
use rockchip_build::cli::{init_logging, report};
use rockchip_build::command::SystemRunner;
use rockchip_build::compile::get_default_jobs;
use rockchip_build::pipeline::UbootBuild;
use rockchip_build::store::paths::RESULT_DIR;
use rockchip_build::target::NANOPI_ZERO2_UBOOT;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

/// Builds U-Boot and the boot script image for the NanoPi Zero2.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, default_value_t = Level::INFO)]
    level: Level,

    /// Plain-text boot command script wrapped into `boot.scr`
    #[clap(long, default_value = "boot.cmd")]
    boot_cmd: PathBuf,

    #[clap(long, env = "BUILDRESULT_DIR", default_value = RESULT_DIR)]
    result_dir: PathBuf,

    #[clap(long, default_value_t = get_default_jobs())]
    jobs: usize,

    /// Remove both checkouts after a successful build
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

    let build = UbootBuild {
        runner: &SystemRunner,
        target: &NANOPI_ZERO2_UBOOT,
        boot_cmd: cli.boot_cmd,
        result_dir: cli.result_dir,
        jobs: cli.jobs,
        cleanup: cli.cleanup,
    };

    report(build.run().await)
}
