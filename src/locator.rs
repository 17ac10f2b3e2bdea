use std::path::{Path, PathBuf};

use regex::Regex;
use reqwest::{
    header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT},
    Client, RequestBuilder, Url,
};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, info};

use crate::error::{Result, UpdaterError};

const ARCHIVE_EXTENSION: &str = ".zip";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Defines some common headers used for the requests to the bedrock server download page
trait CommonHeaders {
    fn add_common_headers(self) -> RequestBuilder;
}

impl CommonHeaders for RequestBuilder {
    fn add_common_headers(self) -> RequestBuilder {
        self.header(ACCEPT, "text/html")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(ACCEPT_ENCODING, "gzip")
            .header(CONNECTION, "keep-alive")
            .header(USER_AGENT, BROWSER_USER_AGENT)
    }
}

/// Finds the server download link in the body of the download page.
///
/// The link is taken from the first occurrence of `prefix` up to and including the
/// first `.zip` after it. This is a plain text search so it keeps working as long
/// as the link itself appears somewhere in the page.
pub fn find_download_link(body: &str, prefix: &str) -> Result<Url> {
    let start = body
        .find(prefix)
        .filter(|_| !prefix.is_empty())
        .ok_or(UpdaterError::NoDownloadLink)?;

    let rest = &body[start..];
    let end = rest
        .find(ARCHIVE_EXTENSION)
        .ok_or(UpdaterError::NoArchiveExtension)?
        + ARCHIVE_EXTENSION.len();

    Ok(Url::parse(&rest[..end])?)
}

/// The name the archive is stored under, taken from the last segment of the link
pub fn archive_file_name(link: &Url) -> Result<&str> {
    link.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .ok_or(UpdaterError::NoFileName)
}

/// Gets the server version embedded in the archive name, e.g. `bedrock-server-1.21.2.02.zip`
pub fn server_version(file_name: &str) -> Result<Option<&str>> {
    // Bedrock versions have exactly 4 parts
    let pattern = Regex::new(r"\d+(\.\d+){3}")?;

    Ok(pattern.find(file_name).map(|found| found.as_str()))
}

/// Attempt to get the html of the bedrock server page from an http request
#[tracing::instrument(skip(client))]
pub async fn fetch_page(client: &Client, page_url: &str) -> Result<String> {
    info!("Fetching download page");
    let page_request = client.get(page_url).add_common_headers();

    let html = page_request.send().await?.error_for_status()?.text().await?;
    debug!("download page is {} bytes", html.len());

    Ok(html)
}

/// Downloads the archive behind `link` into `target_dir`, overwriting any earlier copy
///
/// The body is streamed to disk chunk by chunk. Nothing is created when the server
/// answers with an error status.
#[tracing::instrument(skip(client, link))]
pub async fn download_archive(client: &Client, link: &Url, target_dir: &Path) -> Result<PathBuf> {
    let file_path = target_dir.join(archive_file_name(link)?);
    info!("Using file name: {file_path:?}, downloading ...");

    let mut response = client.get(link.clone()).send().await?.error_for_status()?;

    let mut archive = File::create(&file_path).await?;
    let mut written = 0;
    while let Some(chunk) = response.chunk().await? {
        archive.write_all(&chunk).await?;
        written += chunk.len();
    }
    archive.flush().await?;
    debug!("wrote {written} bytes to {file_path:?}");

    Ok(file_path)
}

/// Finds the latest release on the download page and saves it in `backup_dir`
#[tracing::instrument(skip(client))]
pub async fn locate_and_download(
    client: &Client,
    page_url: &str,
    link_prefix: &str,
    backup_dir: &Path,
) -> Result<PathBuf> {
    let body = fetch_page(client, page_url).await?;

    let download_link = find_download_link(&body, link_prefix)?;
    info!("Found download link: {download_link}");

    if let Some(version) = server_version(archive_file_name(&download_link)?)? {
        info!("Latest server version: {version}");
    }

    download_archive(client, &download_link, backup_dir).await
}
