use crate::overlay::{ConfigOption, Overlay};
use crate::store::artifacts::Artifact;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Toolchain {
    pub arch: &'static str,
    pub cross_compile: &'static str,
}

impl Toolchain {
    pub fn envs(&self) -> Vec<(String, String)> {
        vec![
            ("ARCH".to_string(), self.arch.to_string()),
            ("CROSS_COMPILE".to_string(), self.cross_compile.to_string()),
        ]
    }
}

pub const AARCH64: Toolchain = Toolchain {
    arch: "arm64",
    cross_compile: "aarch64-linux-gnu-",
};

/// A repository pinned to a tag or commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GitRepo {
    pub url: &'static str,
    pub rev: &'static str,
}

/// A prebuilt binary from the firmware repository, passed to the build as
/// `<env>=<firmware dir>/<path>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FirmwareBlob {
    pub env: &'static str,
    pub path: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct KernelTarget {
    pub url: &'static str,
    pub toolchain: Toolchain,
    pub defconfig: &'static str,
    pub overlay: Overlay,
    pub make_targets: &'static [&'static str],
    pub build_envs: &'static [(&'static str, &'static str)],
    pub artifacts: &'static [Artifact],
}

#[derive(Clone, Copy, Debug)]
pub struct UbootTarget {
    pub uboot: GitRepo,
    pub firmware: GitRepo,
    pub toolchain: Toolchain,
    pub defconfig: &'static str,
    pub overlay: Overlay,
    pub blobs: &'static [FirmwareBlob],
    pub build_envs: &'static [(&'static str, &'static str)],
    pub script_arch: &'static str,
    pub script_image: &'static str,
    pub artifacts: &'static [Artifact],
}

/// What the container wrapper needs to know about the program it embeds.
#[derive(Clone, Copy, Debug)]
pub struct RebuildTarget {
    pub bin: &'static str,
    pub tag: &'static str,
    pub description: &'static str,
    pub base_image: &'static str,
    pub packages: &'static [&'static str],
    pub outputs: &'static [Artifact],
}

// NanoPi Zero2 DTS was merged in 6.18

pub const NANOPI_ZERO2_KERNEL: KernelTarget = KernelTarget {
    url: "https://cdn.kernel.org/pub/linux/kernel/v6.x/linux-6.18.tar.xz",
    toolchain: AARCH64,
    defconfig: "defconfig",
    overlay: Overlay::Append(include_str!("nanopi-zero2.config")),
    make_targets: &["Image", "dtbs"],
    build_envs: &[
        ("KBUILD_BUILD_USER", "gokrazy"),
        ("KBUILD_BUILD_HOST", "docker"),
        ("KBUILD_BUILD_TIMESTAMP", "Thu Jan  1 00:00:00 UTC 1970"),
    ],
    artifacts: &[
        Artifact::new("arch/arm64/boot/Image", "vmlinuz"),
        Artifact::new(
            "arch/arm64/boot/dts/rockchip/rk3528-nanopi-zero2.dtb",
            "rk3528-nanopi-zero2.dtb",
        )
        .with_hint("kernel version may not include NanoPi Zero2 support yet"),
    ],
};

/// Script boot with `setexpr` support, without the EFI loader.
const UBOOT_OVERLAY: &[ConfigOption] = &[
    ConfigOption::enable("BOOTMETH_SCRIPT"),
    ConfigOption::enable("CMD_SETEXPR"),
    ConfigOption::enable("CMD_SETEXPR_FMT"),
    ConfigOption::disable("EFI_LOADER"),
];

pub const NANOPI_ZERO2_UBOOT: UbootTarget = UbootTarget {
    uboot: GitRepo {
        url: "https://github.com/u-boot/u-boot",
        rev: "v2025.10",
    },
    // v1.07
    firmware: GitRepo {
        url: "https://github.com/rockchip-linux/rkbin",
        rev: "74213af1e952c4683d2e35952507133b61394862",
    },
    toolchain: AARCH64,
    defconfig: "generic-rk3528_defconfig",
    overlay: Overlay::Edit(UBOOT_OVERLAY),
    blobs: &[
        FirmwareBlob {
            env: "BL31",
            path: "bin/rk35/rk3528_bl31_v1.20.elf",
        },
        FirmwareBlob {
            env: "ROCKCHIP_TPL",
            path: "bin/rk35/rk3528_ddr_1056MHz_v1.11.bin",
        },
    ],
    build_envs: &[("SOURCE_DATE_EPOCH", "0")],
    script_arch: "arm64",
    script_image: "boot.scr",
    artifacts: &[
        Artifact::new("u-boot-rockchip.bin", "u-boot-rockchip.bin"),
        Artifact::new("boot.scr", "boot.scr"),
    ],
};

pub const KERNEL_REBUILD: RebuildTarget = RebuildTarget {
    bin: "build-kernel",
    tag: "rebuild-kernel",
    description: "kernel",
    base_image: "debian:bookworm",
    packages: &[
        "crossbuild-essential-arm64",
        "bc",
        "libssl-dev",
        "bison",
        "flex",
        "xz-utils",
    ],
    outputs: &[
        Artifact::new("vmlinuz", "vmlinuz"),
        Artifact::new("rk3528-nanopi-zero2.dtb", "rk3528-nanopi-zero2.dtb"),
    ],
};

pub const UBOOT_REBUILD: RebuildTarget = RebuildTarget {
    bin: "build-uboot",
    tag: "rebuild-uboot",
    description: "U-Boot",
    base_image: "debian:bookworm",
    packages: &[
        "crossbuild-essential-arm64",
        "bc",
        "libssl-dev",
        "bison",
        "flex",
        "git",
        "python3",
        "python3-setuptools",
        "swig",
        "python3-dev",
        "python3-pyelftools",
        "libgnutls28-dev",
        "libuuid1",
        "uuid-dev",
    ],
    outputs: &[
        Artifact::new("u-boot-rockchip.bin", "u-boot-rockchip.bin"),
        Artifact::new("boot.scr", "boot.scr"),
    ],
};
