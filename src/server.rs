use crate::render::{Renderer, INDEX_HTML};
use crate::table::VehicleTable;
use log::{debug, error, info};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

/// Raw query pairs in request order. Repeated keys are allowed.
type QueryPairs = Vec<(String, String)>;

pub async fn run(addr: SocketAddr, table: Arc<VehicleTable>, renderer: Arc<Renderer>) {
    info!("Listening on http://{}", addr);
    warp::serve(routes(table, renderer)).run(addr).await;
}

pub fn routes(
    table: Arc<VehicleTable>,
    renderer: Arc<Renderer>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    let index = warp::get()
        .and(warp::path::end())
        .map(|| warp::reply::html(INDEX_HTML));
    let search = warp::get()
        .and(warp::path!("search"))
        .and(warp::query::<QueryPairs>())
        .and(with_table(table.clone()))
        .map(|query: QueryPairs, table: Arc<VehicleTable>| search(&query, &table));
    let view = warp::get()
        .and(warp::path!("view"))
        .and(warp::query::<QueryPairs>())
        .and(with_table(table))
        .and(warp::any().map(move || renderer.clone()))
        .map(
            |query: QueryPairs, table: Arc<VehicleTable>, renderer: Arc<Renderer>| {
                view(&query, &table, &renderer)
            },
        );
    index
        .or(search)
        .or(view)
        .with(warp::log("vehicle_lookup"))
}

fn with_table(
    table: Arc<VehicleTable>,
) -> impl Filter<Extract = (Arc<VehicleTable>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || table.clone())
}

/// First `regno` value in the query, or empty when absent.
fn regno_param(query: &[(String, String)]) -> String {
    query
        .iter()
        .find(|(key, _)| key == "regno")
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

fn search(query: &[(String, String)], table: &VehicleTable) -> Response {
    let regno = regno_param(query);
    debug!("JSON lookup for {:?}", regno);
    match table.lookup(&regno) {
        Some(record) => warp::reply::json(&record.to_json()).into_response(),
        None => warp::reply::with_status(
            warp::reply::json(&json!({
                "error": format!("No data found for registration number: {}", regno)
            })),
            StatusCode::NOT_FOUND,
        )
        .into_response(),
    }
}

fn view(query: &[(String, String)], table: &VehicleTable, renderer: &Renderer) -> Response {
    let regno = regno_param(query);
    debug!("HTML lookup for {:?}", regno);
    match renderer.view(table.lookup(&regno)) {
        Ok(html) => warp::reply::html(html).into_response(),
        Err(e) => {
            error!("Error rendering view for {:?}: {}", regno, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery;
    use crate::loader;
    use crate::table::Frame;
    use serde_json::Value;
    use url::Url;

    fn scenario() -> Arc<VehicleTable> {
        let frames = [
            "Reg No,Owner\nMH12AB1234,Ravi\n",
            "Registration No.,Owner\nDL01CD5678,Asha\n",
        ]
        .iter()
        .map(|csv| {
            let mut frame = Frame::parse_csv(csv.as_bytes()).unwrap();
            frame.normalize_key();
            frame
        })
        .collect();
        Arc::new(VehicleTable::concat(frames))
    }

    fn renderer() -> Arc<Renderer> {
        Arc::new(Renderer::new().unwrap())
    }

    fn json_body(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let res = warp::test::request()
            .path("/")
            .reply(&routes(scenario(), renderer()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = String::from_utf8(res.body().to_vec()).unwrap();
        assert!(body.contains("/search?regno=YOUR_REGNO"));
        assert!(body.contains("/view?regno=YOUR_REGNO"));
    }

    #[tokio::test]
    async fn search_returns_matching_record() {
        let res = warp::test::request()
            .path("/search?regno=mh12ab1234")
            .reply(&routes(scenario(), renderer()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            json_body(res.body()),
            json!({"regno": "MH12AB1234", "Owner": "Ravi"})
        );
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let filter = routes(scenario(), renderer());
        let lower = warp::test::request()
            .path("/search?regno=dl01cd5678")
            .reply(&filter)
            .await;
        let upper = warp::test::request()
            .path("/search?regno=DL01CD5678")
            .reply(&filter)
            .await;
        assert_eq!(lower.status(), StatusCode::OK);
        assert_eq!(json_body(lower.body()), json_body(upper.body()));
    }

    #[tokio::test]
    async fn search_miss_is_404() {
        let res = warp::test::request()
            .path("/search?regno=zz99zz9999")
            .reply(&routes(scenario(), renderer()))
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(res.body()),
            json!({"error": "No data found for registration number: zz99zz9999"})
        );
    }

    #[tokio::test]
    async fn search_without_parameter_is_404() {
        let res = warp::test::request()
            .path("/search")
            .reply(&routes(scenario(), renderer()))
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(res.body()),
            json!({"error": "No data found for registration number: "})
        );
    }

    #[tokio::test]
    async fn view_renders_match_and_miss_with_200() {
        let filter = routes(scenario(), renderer());
        let hit = warp::test::request()
            .path("/view?regno=Mh12Ab1234")
            .reply(&filter)
            .await;
        assert_eq!(hit.status(), StatusCode::OK);
        let body = String::from_utf8(hit.body().to_vec()).unwrap();
        assert!(body.contains("<td>Ravi</td>"));

        let miss = warp::test::request()
            .path("/view?regno=zz99zz9999")
            .reply(&filter)
            .await;
        assert_eq!(miss.status(), StatusCode::OK);
        let body = String::from_utf8(miss.body().to_vec()).unwrap();
        assert!(body.contains("No details found for the given registration number."));
    }

    #[tokio::test]
    async fn repeated_regno_uses_first_value() {
        let filter = routes(scenario(), renderer());
        let search = warp::test::request()
            .path("/search?regno=MH12AB1234&regno=x")
            .reply(&filter)
            .await;
        assert_eq!(search.status(), StatusCode::OK);
        assert_eq!(
            json_body(search.body()),
            json!({"regno": "MH12AB1234", "Owner": "Ravi"})
        );

        let view = warp::test::request()
            .path("/view?regno=MH12AB1234&regno=x")
            .reply(&filter)
            .await;
        assert_eq!(view.status(), StatusCode::OK);
        let body = String::from_utf8(view.body().to_vec()).unwrap();
        assert!(body.contains("<td>Ravi</td>"));

        let miss = warp::test::request()
            .path("/search?regno=x&regno=MH12AB1234")
            .reply(&filter)
            .await;
        assert_eq!(miss.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unrelated_parameters_are_ignored() {
        let res = warp::test::request()
            .path("/search?other=1&regno=dl01cd5678")
            .reply(&routes(scenario(), renderer()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res.body())["Owner"], json!("Asha"));
    }

    #[tokio::test]
    async fn unknown_path_is_rejected() {
        let res = warp::test::request()
            .path("/admin")
            .reply(&routes(scenario(), renderer()))
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreachable_listing_serves_not_found_everywhere() {
        let client = reqwest::Client::new();
        let listing = Url::parse("http://127.0.0.1:9/").unwrap();
        let urls = discovery::discover(&client, &listing).await;
        let (table, _) = loader::load_table(&client, urls).await;
        let filter = routes(Arc::new(table), renderer());

        let search = warp::test::request()
            .path("/search?regno=MH12AB1234")
            .reply(&filter)
            .await;
        assert_eq!(search.status(), StatusCode::NOT_FOUND);

        let view = warp::test::request()
            .path("/view?regno=MH12AB1234")
            .reply(&filter)
            .await;
        assert_eq!(view.status(), StatusCode::OK);
        let body = String::from_utf8(view.body().to_vec()).unwrap();
        assert!(body.contains("No details found"));
    }
}
