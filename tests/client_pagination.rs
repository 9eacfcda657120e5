//! The query client paging through the proxy to a fake SWAPI.

use holonet::client::{FetchPolicy, HttpTransport, NetworkStatus, QueryClient};
use holonet::swapi::{self, ALL_PEOPLE, ALL_PEOPLE_FIELD};
use hyper::{Method, StatusCode};
use serde_json::{Value, json};
use url::Url;

mod utils;
use utils::{Captured, json_response, start_proxy, start_upstream};

fn variables_of(req: &Captured) -> Value {
    let query = req.query.as_deref().expect("GET carries a query string");
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "variables")
        .map(|(_, v)| serde_json::from_str(&v).expect("variables JSON"))
        .unwrap_or(Value::Null)
}

fn person(id: u32) -> Value {
    json!({ "node": { "id": format!("p{id}"), "name": format!("Person {id}") } })
}

/// Two pages of two people: `[p1, p2]` then `[p3, p4]`.
fn people_page(after: Option<&str>) -> Value {
    let (edges, info) = match after {
        None => (
            vec![person(1), person(2)],
            json!({ "hasNextPage": true, "endCursor": "c2" }),
        ),
        Some(_) => (
            vec![person(3), person(4)],
            json!({ "hasNextPage": false, "endCursor": "c4" }),
        ),
    };
    json!({ "data": { "allPeople": { "pageInfo": info, "edges": edges } } })
}

fn ids(data: &Value) -> Vec<String> {
    data[ALL_PEOPLE_FIELD]["edges"]
        .as_array()
        .expect("edges")
        .iter()
        .map(|e| e["node"]["id"].as_str().expect("id").to_owned())
        .collect()
}

#[tokio::test]
async fn pages_accumulate_through_the_proxy() {
    let upstream = start_upstream().await.expect("start upstream");
    upstream.respond_with(|req| {
        let vars = variables_of(req);
        json_response(
            StatusCode::OK,
            people_page(vars["after"].as_str()).to_string(),
        )
    });
    let proxy = start_proxy(&upstream.url()).await;
    let endpoint = Url::parse(&format!("http://{}/proxy", proxy.local_addr())).expect("url");
    let client = QueryClient::connect(endpoint, swapi::type_policies()).expect("client");

    let list = client.watch_query(swapi::all_people(2));
    let first = list.load().await;
    assert_eq!(first.network_status, NetworkStatus::Ready);
    assert_eq!(ids(first.data.as_ref().expect("data")), ["p1", "p2"]);

    let second = list
        .fetch_next(ALL_PEOPLE_FIELD, "after")
        .await
        .expect("page info")
        .expect("a second page");
    let merged = second.data.expect("merged data");
    assert_eq!(ids(&merged), ["p1", "p2", "p3", "p4"]);
    assert_eq!(
        merged[ALL_PEOPLE_FIELD]["pageInfo"],
        json!({ "hasNextPage": false, "endCursor": "c4" })
    );
    assert!(
        list.fetch_next(ALL_PEOPLE_FIELD, "after")
            .await
            .expect("page info")
            .is_none()
    );

    let requests = upstream.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method == Method::GET));
    assert_eq!(variables_of(&requests[0]), json!({ "first": 2 }));
    assert_eq!(variables_of(&requests[1]), json!({ "first": 2, "after": "c2" }));

    let cached = client
        .query_with_policy(&swapi::all_people(2), FetchPolicy::CacheFirst)
        .await
        .into_result()
        .expect("cached data");
    assert_eq!(ids(&cached), ["p1", "p2", "p3", "p4"]);
    assert_eq!(upstream.requests().len(), 2);

    proxy.shutdown().await.expect("proxy shutdown");
    upstream.shutdown().await;
}

#[tokio::test]
async fn refetching_the_first_page_does_not_duplicate() {
    let upstream = start_upstream().await.expect("start upstream");
    upstream.respond_with(|_req| json_response(StatusCode::OK, people_page(None).to_string()));
    let proxy = start_proxy(&upstream.url()).await;
    let endpoint = Url::parse(&format!("http://{}/proxy", proxy.local_addr())).expect("url");
    let client = QueryClient::connect(endpoint, swapi::type_policies()).expect("client");

    let list = client.watch_query(swapi::all_people(2));
    list.load().await;
    let again = list.refetch().await;

    assert_eq!(ids(again.data.as_ref().expect("data")), ["p1", "p2"]);
    assert_eq!(upstream.requests().len(), 2);

    proxy.shutdown().await.expect("proxy shutdown");
    upstream.shutdown().await;
}

#[tokio::test]
async fn queries_are_posted_when_get_is_disabled() {
    let upstream = start_upstream().await.expect("start upstream");
    upstream.respond_with(|_req| json_response(StatusCode::OK, people_page(None).to_string()));
    let endpoint = Url::parse(&upstream.url()).expect("url");
    let transport = HttpTransport::new(endpoint)
        .expect("transport")
        .use_get_for_queries(false);
    let client = QueryClient::new(transport, swapi::type_policies());

    let result = client
        .query(&swapi::all_people(2))
        .await
        .into_result()
        .expect("data");
    assert_eq!(ids(&result), ["p1", "p2"]);

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.method, Method::POST);
    assert!(sent.query.is_none());
    assert_eq!(
        sent.user_agent.as_deref(),
        Some(concat!("holonet/", env!("CARGO_PKG_VERSION")))
    );
    assert!(
        sent.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"))
    );
    assert_eq!(
        sent.json(),
        json!({
            "query": ALL_PEOPLE,
            "variables": { "first": 2 },
            "operationName": "AllPeople"
        })
    );

    upstream.shutdown().await;
}
