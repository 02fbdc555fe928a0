use crate::command::{Invocation, Runner};
use crate::target::Toolchain;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tokio::fs::{read_to_string, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = ".config";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Setting {
    Yes,
    Module,
    No,
    Value(Cow<'static, str>),
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Yes => write!(f, "y"),
            Setting::Module => write!(f, "m"),
            Setting::No => write!(f, "is not set"),
            Setting::Value(value) => write!(f, "{value}"),
        }
    }
}

/// One kconfig symbol, named without its `CONFIG_` prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigOption {
    pub name: Cow<'static, str>,
    pub setting: Setting,
}

impl ConfigOption {
    pub const fn enable(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            setting: Setting::Yes,
        }
    }

    pub const fn disable(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            setting: Setting::No,
        }
    }

    /// Arguments for `scripts/config`.
    pub fn edit_args(&self) -> Vec<String> {
        let name = self.name.to_string();

        match &self.setting {
            Setting::Yes => vec!["--enable".to_string(), name],
            Setting::Module => vec!["--module".to_string(), name],
            Setting::No => vec!["--disable".to_string(), name],
            Setting::Value(value) => vec!["--set-val".to_string(), name, value.to_string()],
        }
    }
}

impl fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.setting {
            Setting::No => write!(f, "# CONFIG_{} is not set", self.name),
            setting => write!(f, "CONFIG_{}={}", self.name, setting),
        }
    }
}

/// Parses kconfig text. Lines that are neither assignments nor
/// `is not set` markers are skipped.
pub fn parse(text: &str) -> Vec<ConfigOption> {
    let mut options = vec![];

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("# CONFIG_") {
            if let Some(name) = rest.strip_suffix(" is not set") {
                options.push(ConfigOption {
                    name: Cow::Owned(name.to_string()),
                    setting: Setting::No,
                });
            }
            continue;
        }

        let Some(rest) = line.strip_prefix("CONFIG_") else {
            continue;
        };

        let Some((name, value)) = rest.split_once('=') else {
            continue;
        };

        let setting = match value {
            "y" => Setting::Yes,
            "m" => Setting::Module,
            "n" => Setting::No,
            value => Setting::Value(Cow::Owned(value.to_string())),
        };

        options.push(ConfigOption {
            name: Cow::Owned(name.to_string()),
            setting,
        });
    }

    options
}

/// Board-specific option overrides applied on top of the toolchain default.
#[derive(Clone, Copy, Debug)]
pub enum Overlay {
    /// Raw kconfig text appended to the generated `.config`.
    Append(&'static str),
    /// Options toggled through the tree's `scripts/config` editor.
    Edit(&'static [ConfigOption]),
}

impl Overlay {
    pub fn options(&self) -> Vec<ConfigOption> {
        match self {
            Overlay::Append(text) => parse(text),
            Overlay::Edit(options) => options.to_vec(),
        }
    }

    async fn apply<R: Runner>(&self, runner: &R, tree: &Path) -> Result<()> {
        match self {
            Overlay::Append(text) => {
                let config_path = tree.join(CONFIG_FILE);

                let mut config = OpenOptions::new()
                    .append(true)
                    .open(&config_path)
                    .await
                    .with_context(|| format!("failed to open {}", config_path.display()))?;

                config
                    .write_all(text.as_bytes())
                    .await
                    .with_context(|| format!("failed to append to {}", config_path.display()))?;

                config.flush().await?;

                info!("appended config overlay: {}", config_path.display());
            }

            Overlay::Edit(options) => {
                let editor = tree.join("scripts/config");

                let invocation = Invocation::new(editor.display().to_string())
                    .args(options.iter().flat_map(ConfigOption::edit_args))
                    .current_dir(tree);

                runner.run(&invocation).await.context("configure")?;
            }
        }

        Ok(())
    }
}

/// Generates the default configuration, applies the overlay, then re-resolves
/// dependent options. The three steps always run in this order.
pub async fn configure<R: Runner>(
    runner: &R,
    tree: &Path,
    toolchain: &Toolchain,
    defconfig: &str,
    overlay: &Overlay,
) -> Result<()> {
    let arch = format!("ARCH={}", toolchain.arch);

    let defaults = Invocation::new("make")
        .args([arch.as_str(), defconfig])
        .current_dir(tree);

    runner
        .run(&defaults)
        .await
        .with_context(|| format!("make {defconfig}"))?;

    overlay.apply(runner, tree).await?;

    let resolve = Invocation::new("make")
        .args([arch.as_str(), "olddefconfig"])
        .current_dir(tree);

    runner.run(&resolve).await.context("make olddefconfig")?;

    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub name: String,
    pub expected: Setting,
    pub actual: Setting,
}

/// Compares the resolved `.config` against the overlay. An absent symbol
/// counts as not set.
pub async fn verify(tree: &Path, overlay: &Overlay) -> Result<Vec<Mismatch>> {
    let config_path = tree.join(CONFIG_FILE);

    let config = read_to_string(&config_path)
        .await
        .with_context(|| format!("failed to read {}", config_path.display()))?;

    let resolved: HashMap<String, Setting> = parse(&config)
        .into_iter()
        .map(|option| (option.name.into_owned(), option.setting))
        .collect();

    let mut mismatches = vec![];

    for option in overlay.options() {
        let actual = resolved
            .get(option.name.as_ref())
            .cloned()
            .unwrap_or(Setting::No);

        if actual != option.setting {
            mismatches.push(Mismatch {
                name: option.name.into_owned(),
                expected: option.setting,
                actual,
            });
        }
    }

    Ok(mismatches)
}

/// Runs [`configure`] and logs every overlay option the resolution step
/// did not keep.
pub async fn configure_and_verify<R: Runner>(
    runner: &R,
    tree: &Path,
    toolchain: &Toolchain,
    defconfig: &str,
    overlay: &Overlay,
) -> Result<()> {
    configure(runner, tree, toolchain, defconfig, overlay).await?;

    for mismatch in verify(tree, overlay).await? {
        warn!(
            "CONFIG_{}: overlay wants {}, resolved to {}",
            mismatch.name, mismatch.expected, mismatch.actual
        );
    }

    Ok(())
}
