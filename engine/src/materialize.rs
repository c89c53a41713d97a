use std::{path::PathBuf, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::{info, warn};
use nonempty::NonEmpty;

use crate::{
    error::{Error, Result},
    output::OutputResolver,
    response::AssetItem,
    transport::Transport,
};

/// Writes resolved result items to disk
pub struct Materializer<'a, T> {
    transport: &'a T,
    resolver: &'a OutputResolver,
    download_timeout: Duration,
}

impl<'a, T: Transport> Materializer<'a, T> {
    pub fn new(transport: &'a T, resolver: &'a OutputResolver, download_timeout: Duration) -> Self {
        Self {
            transport,
            resolver,
            download_timeout,
        }
    }

    /// Writes every usable item and returns the written paths in item order.
    ///
    /// Items without data are skipped with a warning; if nothing could be
    /// written the batch fails with [`Error::NoUsableItems`].
    pub async fn materialize(
        &self,
        items: &NonEmpty<AssetItem>,
        base_filename: &str,
        default_extension: &str,
    ) -> Result<Vec<PathBuf>> {
        let total = items.len();
        let mut written = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            let filename = item_filename(base_filename, default_extension, index, total);
            match self.write_item(index, item, &filename).await {
                Ok(path) => {
                    info!("Saved: {}", path.display());
                    written.push(path);
                }
                Err(err @ Error::DataIncomplete { .. }) => warn!("Skipping item: {err}"),
                Err(err) => return Err(err),
            }
        }

        if written.is_empty() {
            return Err(Error::NoUsableItems);
        }
        Ok(written)
    }

    async fn write_item(&self, index: usize, item: &AssetItem, filename: &str) -> Result<PathBuf> {
        if let Some(b64) = item.inline_data() {
            let bytes = STANDARD.decode(b64)?;
            let path = self.resolver.resolve(filename)?;
            tokio::fs::write(&path, bytes).await?;
            Ok(path)
        } else if let Some(url) = item.remote_url() {
            let path = self.resolver.resolve(filename)?;
            self.transport
                .download(url, &path, self.download_timeout)
                .await?;
            Ok(path)
        } else {
            Err(Error::DataIncomplete { index })
        }
    }
}

/// `base` for a single item, otherwise `stem-<n>.ext` with a 1-based `n`
pub fn item_filename(base: &str, default_extension: &str, index: usize, total: usize) -> String {
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => (stem, ext),
        _ => (base, default_extension),
    };
    let suffix = if total > 1 {
        format!("-{}", index + 1)
    } else {
        String::new()
    };
    format!("{stem}{suffix}.{ext}")
}
