use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use futures::StreamExt;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use crate::{error::InstallError, tools::InstallReporter};

/// Stream `url` into `dest`, reporting progress along the way.
///
/// Bytes go to `<dest>.part` first and are renamed into place only once the
/// whole body arrived, so an interrupted transfer never leaves a truncated
/// binary at the install path. Returns the number of bytes written.
pub async fn download_file<P>(
    url: &str,
    dest: &Path,
    limit: Duration,
    reporter: &P,
) -> Result<u64, InstallError>
where
    P: InstallReporter + ?Sized,
{
    info!(url, dest = %dest.display(), "downloading");
    let network = |source: reqwest::Error| InstallError::Network {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(limit)
        .build()
        .map_err(network)?;
    let response = client.get(url).send().await.map_err(network)?;

    let status = response.status();
    if !status.is_success() {
        return Err(InstallError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    reporter.download_started(url, response.content_length());
    let partial = partial_path(dest);
    let result = write_body(response, &partial, reporter).await;
    reporter.download_finished();

    let downloaded = match result {
        Ok(downloaded) => downloaded,
        Err(e) => {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    fs::rename(&partial, dest).await?;
    debug!(url, bytes = downloaded, "download complete");
    Ok(downloaded)
}

async fn write_body<P>(
    response: reqwest::Response,
    partial: &Path,
    reporter: &P,
) -> Result<u64, InstallError>
where
    P: InstallReporter + ?Sized,
{
    let url = response.url().to_string();
    let mut file = fs::File::create(partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| InstallError::Network {
            url: url.clone(),
            source,
        })?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        reporter.download_progress(downloaded);
    }

    file.flush().await?;
    Ok(downloaded)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
