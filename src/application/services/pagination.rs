use crate::domain::external_apis::github::Session;
use crate::domain::models::archive::ArchiveEntry;
use crate::domain::models::page::Page;
use crate::domain::ports::ArchiveWriter;
use anyhow::Error;
use async_stream::try_stream;
use futures_util::Stream;
use std::path::{Path, PathBuf};

/// Lazily fetches `first_url` and every page reachable through its `next` links.
///
/// Each page is requested only when the stream is polled for it. A page that is
/// still failing after the session's retries ends the stream with an
/// [`UnsuccessfulResponse`](crate::domain::models::page::UnsuccessfulResponse).
pub fn pages<'a, S>(
    session: &'a S,
    first_url: &str,
) -> impl Stream<Item = Result<Page, Error>> + use<'a, S>
where
    S: Session + ?Sized,
{
    let mut next = Some(first_url.to_owned());

    try_stream! {
        while let Some(url) = next.take() {
            tracing::debug!("Fetching page {}", url);
            let page = session.get(&url).await?.into_success()?;
            next.clone_from(&page.next);
            yield page;
        }
    }
}

/// Archive entry for the `number`th (1-based) raw page under `dir/pages/`.
pub fn page_file(dir: &Path, number: usize, page: &Page) -> ArchiveEntry {
    ArchiveEntry::new(
        dir.join("pages").join(format!("{number}.json")),
        page.body.clone(),
    )
}

/// Writes every page that flows through to `dir/pages/<n>.json` and passes it on.
///
/// This lets one fetch feed both the archive and the extractors downstream.
pub fn archived<'a, St, W>(
    pages: St,
    writer: &'a W,
    dir: PathBuf,
) -> impl Stream<Item = Result<Page, Error>> + 'a
where
    St: Stream<Item = Result<Page, Error>> + 'a,
    W: ArchiveWriter + ?Sized,
{
    try_stream! {
        let mut number = 0;
        for await page in pages {
            let page = page?;
            number += 1;
            writer.write(&page_file(&dir, number, &page)).await?;
            yield page;
        }
    }
}
