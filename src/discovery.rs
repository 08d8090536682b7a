use log::{debug, error, info};
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

const CSV_EXTENSION: &str = ".csv";

/// Fetches the listing page and returns the CSV files it links to.
/// Errors are logged and reported as an empty list.
pub async fn discover(client: &Client, listing_url: &Url) -> Vec<Url> {
    info!("Fetching file list from: {}", listing_url);
    match discover_impl(client, listing_url).await {
        Ok(urls) => {
            info!("Found {} .csv files", urls.len());
            urls
        }
        Err(e) => {
            error!("Error fetching listing {}: {}", listing_url, e);
            vec![]
        }
    }
}

async fn discover_impl(client: &Client, listing_url: &Url) -> Result<Vec<Url>, failure::Error> {
    let body = client
        .get(listing_url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    parse_listing(listing_url, &body)
}

/// Anchors whose raw href ends in `.csv`, resolved against `base`, in document order.
pub fn parse_listing(base: &Url, html: &str) -> Result<Vec<Url>, failure::Error> {
    let selector =
        Selector::parse("a[href]").map_err(|e| format_err!("Bad anchor selector: {:?}", e))?;
    let document = Html::parse_document(html);
    let mut urls = vec![];
    for anchor in document.select(&selector) {
        let href = match anchor.value().attr("href") {
            Some(href) if href.ends_with(CSV_EXTENSION) => href,
            _ => continue,
        };
        match base.join(href) {
            Ok(url) => urls.push(url),
            Err(e) => debug!("Skipping unresolvable link {:?}: {}", href, e),
        }
    }
    Ok(urls)
}
