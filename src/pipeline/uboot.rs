use crate::command::Runner;
use crate::compile::Build;
use crate::image;
use crate::overlay;
use crate::pipeline::{stage, Stage};
use crate::source::GitSource;
use crate::store::{artifacts, temps};
use crate::target::UbootTarget;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{canonicalize, remove_dir_all};
use tracing::info;

/// Fetches U-Boot and the Rockchip firmware blobs, builds the bootloader and
/// the wrapped boot script, then stages both into the result directory.
pub struct UbootBuild<'a, R> {
    pub runner: &'a R,
    pub target: &'a UbootTarget,
    pub boot_cmd: PathBuf,
    pub result_dir: PathBuf,
    pub jobs: usize,
    pub cleanup: bool,
}

impl<R: Runner> UbootBuild<'_, R> {
    pub async fn run(&self) -> Result<Vec<PathBuf>> {
        let boot_cmd = canonicalize(&self.boot_cmd).await.with_context(|| {
            format!(
                "boot command script not found: {}",
                self.boot_cmd.display()
            )
        })?;

        let (uboot_dir, firmware_dir) = stage(Stage::AcquireSource, self.acquire()).await?;

        stage(
            Stage::ConfigureOverlay,
            overlay::configure_and_verify(
                self.runner,
                &uboot_dir,
                &self.target.toolchain,
                self.target.defconfig,
                &self.target.overlay,
            ),
        )
        .await?;

        stage(
            Stage::Compile,
            self.build(&firmware_dir).run(self.runner, &uboot_dir),
        )
        .await?;

        let script_envs = self.reproducible_envs();

        stage(
            Stage::PostProcess,
            image::wrap_script(
                self.runner,
                &uboot_dir,
                &boot_cmd,
                self.target.script_arch,
                self.target.script_image,
                &script_envs,
            ),
        )
        .await?;

        let staged = stage(
            Stage::CollectArtifacts,
            artifacts::collect(&uboot_dir, &self.result_dir, self.target.artifacts),
        )
        .await?;

        if self.cleanup {
            for dir in [&uboot_dir, &firmware_dir] {
                info!("removing checkout: {}", dir.display());

                remove_dir_all(dir)
                    .await
                    .with_context(|| format!("failed to remove {}", dir.display()))?;
            }
        }

        Ok(staged)
    }

    async fn acquire(&self) -> Result<(PathBuf, PathBuf)> {
        let uboot_dir = temps::create_dir("u-boot").await?;
        let firmware_dir = temps::create_dir("rkbin").await?;

        GitSource::new(&self.target.firmware)
            .fetch(self.runner, &firmware_dir)
            .await?;

        GitSource::new(&self.target.uboot)
            .fetch(self.runner, &uboot_dir)
            .await?;

        Ok((uboot_dir, firmware_dir))
    }

    fn reproducible_envs(&self) -> Vec<(String, String)> {
        self.target
            .build_envs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn build(&self, firmware_dir: &Path) -> Build {
        let blobs = self.target.blobs.iter().map(|blob| {
            (
                blob.env.to_string(),
                firmware_dir.join(blob.path).display().to_string(),
            )
        });

        Build::new(self.jobs)
            .with_envs(self.target.toolchain.envs())
            .with_envs(blobs)
            .with_envs(self.reproducible_envs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::RecordingRunner;
    use crate::command::Invocation;
    use crate::target::NANOPI_ZERO2_UBOOT;
    use std::fs;

    /// Simulates U-Boot's build outputs and `mkimage`.
    fn fake_uboot(invocation: &Invocation) -> Result<()> {
        let Some(dir) = &invocation.dir else {
            return Ok(());
        };

        if invocation.args.last().map(String::as_str) == Some("generic-rk3528_defconfig") {
            fs::write(
                dir.join(".config"),
                "CONFIG_BOOTMETH_SCRIPT=y\nCONFIG_CMD_SETEXPR=y\nCONFIG_CMD_SETEXPR_FMT=y\n",
            )?;
        }

        if invocation.program == "make" && invocation.args.len() == 1 {
            fs::write(dir.join("u-boot-rockchip.bin"), b"bootloader")?;
        }

        if invocation.program.ends_with("tools/mkimage") {
            let script = invocation.args.get(7).cloned().unwrap_or_default();
            fs::write(dir.join("boot.scr"), fs::read(script)?)?;
        }

        Ok(())
    }

    fn uboot_build<'a>(
        runner: &'a RecordingRunner,
        boot_cmd: &Path,
        result_dir: &Path,
    ) -> UbootBuild<'a, RecordingRunner> {
        UbootBuild {
            runner,
            target: &NANOPI_ZERO2_UBOOT,
            boot_cmd: boot_cmd.to_path_buf(),
            result_dir: result_dir.to_path_buf(),
            jobs: 2,
            cleanup: true,
        }
    }

    #[tokio::test]
    async fn builds_bootloader_and_boot_script() {
        let work = tempfile::tempdir().unwrap();
        let result = tempfile::tempdir().unwrap();
        let boot_cmd = work.path().join("boot.cmd");
        fs::write(&boot_cmd, "bootm\n").unwrap();

        let runner = RecordingRunner::new().with_hook(fake_uboot);

        let staged = uboot_build(&runner, &boot_cmd, result.path())
            .run()
            .await
            .unwrap();

        assert_eq!(
            staged,
            vec![
                result.path().join("u-boot-rockchip.bin"),
                result.path().join("boot.scr"),
            ]
        );
        assert_eq!(fs::read(result.path().join("boot.scr")).unwrap(), b"bootm\n");

        let calls = runner.calls();
        let programs: Vec<_> = calls
            .iter()
            .map(|call| format!("{} {}", call.program, call.args.join(" ")))
            .collect();

        // firmware repository first, then U-Boot
        assert_eq!(
            programs[2],
            format!("git fetch --depth=1 origin {}", NANOPI_ZERO2_UBOOT.firmware.rev)
        );
        assert_eq!(programs[6], "git fetch --depth=1 origin v2025.10");
        assert_eq!(programs[8], "make ARCH=arm64 generic-rk3528_defconfig");
        assert!(programs[9].ends_with(
            "scripts/config --enable BOOTMETH_SCRIPT --enable CMD_SETEXPR \
             --enable CMD_SETEXPR_FMT --disable EFI_LOADER"
        ));
        assert_eq!(programs[10], "make ARCH=arm64 olddefconfig");
        assert_eq!(programs[11], "make -j2");
        assert!(calls[12].program.ends_with("tools/mkimage"));
        assert_eq!(calls.len(), 13);

        let firmware_dir = calls[0].dir.clone().unwrap();
        let uboot_dir = calls[4].dir.clone().unwrap();
        let make = &calls[11];
        assert_eq!(make.dir.as_ref(), Some(&uboot_dir));
        assert_eq!(
            make.get_env("BL31"),
            Some(
                firmware_dir
                    .join("bin/rk35/rk3528_bl31_v1.20.elf")
                    .display()
                    .to_string()
                    .as_str()
            )
        );
        assert_eq!(
            make.get_env("ROCKCHIP_TPL"),
            Some(
                firmware_dir
                    .join("bin/rk35/rk3528_ddr_1056MHz_v1.11.bin")
                    .display()
                    .to_string()
                    .as_str()
            )
        );
        assert_eq!(make.get_env("CROSS_COMPILE"), Some("aarch64-linux-gnu-"));
        assert_eq!(calls[12].get_env("SOURCE_DATE_EPOCH"), Some("0"));

        // cleanup requested
        assert!(!firmware_dir.exists());
        assert!(!uboot_dir.exists());
    }

    #[tokio::test]
    async fn missing_boot_script_fails_before_fetching() {
        let work = tempfile::tempdir().unwrap();
        let result = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();

        let err = uboot_build(&runner, &work.path().join("boot.cmd"), result.path())
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("boot command script not found"));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_clone_aborts_the_run() {
        let work = tempfile::tempdir().unwrap();
        let result = tempfile::tempdir().unwrap();
        let boot_cmd = work.path().join("boot.cmd");
        fs::write(&boot_cmd, "bootm\n").unwrap();

        let runner = RecordingRunner::new()
            .with_hook(fake_uboot)
            .failing_on("git remote add");

        let err = uboot_build(&runner, &boot_cmd, result.path())
            .run()
            .await
            .unwrap_err();

        assert_eq!(
            format!("{err:#}"),
            "acquire-source failed: git remote: git exited with exit status: 2"
        );
        assert_eq!(runner.calls().len(), 2);
        assert_eq!(fs::read_dir(result.path()).unwrap().count(), 0);

        // nothing is cleaned up on failure
        let firmware_dir = runner.calls()[0].dir.clone().unwrap();
        assert!(firmware_dir.exists());
        fs::remove_dir_all(&firmware_dir).unwrap();
    }
}
