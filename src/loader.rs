use crate::table::{Frame, VehicleTable};
use log::{debug, info, warn};
use reqwest::Client;
use url::Url;

/// What happened while building the table. Only ever logged.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadReport {
    pub discovered: usize,
    pub loaded: usize,
    pub failed: usize,
    pub rows: usize,
}

/// Downloads every source in lexicographic URL order and stacks them into one
/// table. A source that fails is logged and left out.
pub async fn load_table(client: &Client, mut urls: Vec<Url>) -> (VehicleTable, LoadReport) {
    urls.sort();
    let mut report = LoadReport {
        discovered: urls.len(),
        ..LoadReport::default()
    };
    let mut frames = vec![];
    for url in &urls {
        info!("Loading: {}", file_name(url));
        match load_source(client, url).await {
            Ok(frame) => {
                debug!(
                    "{}: {} rows, {} columns",
                    file_name(url),
                    frame.len(),
                    frame.columns().len()
                );
                report.loaded += 1;
                frames.push(frame);
            }
            Err(e) => {
                report.failed += 1;
                warn!("Error loading data from {}: {}", url, e);
            }
        }
    }
    let table = if frames.is_empty() {
        VehicleTable::empty()
    } else {
        VehicleTable::concat(frames)
    };
    report.rows = table.len();
    (table, report)
}

async fn load_source(client: &Client, url: &Url) -> Result<Frame, failure::Error> {
    let body = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    let mut frame = Frame::parse_csv(&body)?;
    frame.normalize_key();
    Ok(frame)
}

fn file_name(url: &Url) -> &str {
    url.path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_else(|| url.as_str())
}
