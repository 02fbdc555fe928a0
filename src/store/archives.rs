use anyhow::{Context, Result};
use async_compression::tokio::bufread::XzDecoder;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio_tar::ArchiveBuilder;

pub async fn unpack_tar_xz(target_dir: &Path, source_tar: &Path) -> Result<()> {
    let tar_xz = File::open(source_tar)
        .await
        .with_context(|| format!("failed to open archive: {}", source_tar.display()))?;
    let buf_reader = BufReader::new(tar_xz);
    let xz_decoder = XzDecoder::new(buf_reader);
    let archive_builder = ArchiveBuilder::new(xz_decoder)
        .set_preserve_permissions(true)
        .set_ignore_zeros(true);
    let mut archive = archive_builder.build();

    archive
        .unpack(target_dir)
        .await
        .with_context(|| format!("failed to unpack archive: {}", source_tar.display()))
}
