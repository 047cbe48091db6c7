//! End-to-end pipeline tests against a mock GitLab API.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};

use gitlab_code_search_lib::{
    CodeSearcher, Reporter, SearchParams, Settings, Visibility,
};

fn searcher_for(server: &ServerGuard) -> CodeSearcher {
    let settings = Settings {
        gitlab_url: server.url(),
        private_token: "token".to_string(),
        max_page_depth: 1000,
    };
    CodeSearcher::new(settings, Reporter::hidden()).unwrap()
}

fn params(search_text: &str) -> SearchParams {
    SearchParams {
        groups: None,
        search_text: search_text.to_string(),
        max_workers: 5,
        visibility: vec![Visibility::Internal, Visibility::Public, Visibility::Private],
        extension: None,
        filename: None,
        path: None,
        max_jitter_secs: 0.0,
    }
}

fn project_json(id: u64, name: &str, visibility: &str, server: &ServerGuard) -> String {
    format!(
        r#"{{"id": {id}, "name": "{name}", "visibility": "{visibility}",
            "web_url": "{}/acme/{name}"}}"#,
        server.url()
    )
}

fn match_json(project_id: u64, path: &str, data: &str) -> String {
    let filename = path.rsplit('/').next().unwrap();
    format!(
        r#"{{"path": "{path}", "filename": "{filename}", "project_id": {project_id},
            "data": "{data}", "startline": 1, "ref": "main"}}"#
    )
}

#[tokio::test]
async fn end_to_end_search_over_two_groups() {
    let mut server = Server::new_async().await;

    let groups = server
        .mock("GET", "/api/v4/groups")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pagination".into(), "keyset".into()),
            Matcher::UrlEncoded("order_by".into(), "id".into()),
            Matcher::UrlEncoded("sort".into(), "asc".into()),
            Matcher::UrlEncoded("per_page".into(), "100".into()),
        ]))
        .match_header("PRIVATE-TOKEN", "token")
        .with_body(r#"[{"id": 1}, {"id": 2}]"#)
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/groups/1/projects")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("include_subgroups".into(), "true".into()),
            Matcher::UrlEncoded("per_page".into(), "100".into()),
        ]))
        .with_body(format!("[{}]", project_json(10, "alpha", "public", &server)))
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/groups/2/projects")
        .match_query(Matcher::Any)
        .with_body(format!("[{}]", project_json(20, "beta", "public", &server)))
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/projects/10/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("scope".into(), "blobs".into()),
            Matcher::UrlEncoded("search".into(), "needle".into()),
        ]))
        .with_body(format!("[{}]", match_json(10, "src/lib.rs", "let needle = 1;")))
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/projects/20/search")
        .match_query(Matcher::Any)
        .with_body("[]")
        .create_async()
        .await;

    let mut search_params = params("needle");
    search_params.visibility = vec![Visibility::Public];

    let results = searcher_for(&server).search(&search_params).await.unwrap();

    groups.assert_async().await;
    assert_eq!(results.len(), 2);

    let alpha = results.iter().find(|entry| entry.name == "alpha").unwrap();
    assert_eq!(alpha.matches.len(), 1);
    assert_eq!(alpha.matches[0].path, "src/lib.rs");
    assert_eq!(alpha.matches[0].project_id, 10);

    let beta = results.iter().find(|entry| entry.name == "beta").unwrap();
    assert!(beta.matches.is_empty());
}

#[tokio::test]
async fn explicit_groups_skip_the_group_listing() {
    let mut server = Server::new_async().await;

    let listing = server
        .mock("GET", "/api/v4/groups")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/groups/7/projects")
        .match_query(Matcher::Any)
        .with_body(format!("[{}]", project_json(70, "gamma", "private", &server)))
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/projects/70/search")
        .match_query(Matcher::Any)
        .with_body("[]")
        .create_async()
        .await;

    let mut search_params = params("needle");
    search_params.groups = Some("7".to_string());

    let results = searcher_for(&server).search(&search_params).await.unwrap();

    listing.assert_async().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "gamma");
}

#[tokio::test]
async fn repository_under_two_groups_is_searched_once() {
    let mut server = Server::new_async().await;

    let shared = format!("[{}]", project_json(10, "alpha", "public", &server));
    for group_id in [1, 2] {
        server
            .mock("GET", format!("/api/v4/groups/{group_id}/projects").as_str())
            .match_query(Matcher::Any)
            .with_body(&shared)
            .create_async()
            .await;
    }

    let search = server
        .mock("GET", "/api/v4/projects/10/search")
        .match_query(Matcher::Any)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let mut search_params = params("needle");
    search_params.groups = Some("1,2".to_string());

    let results = searcher_for(&server).search(&search_params).await.unwrap();

    search.assert_async().await;
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn visibility_filter_excludes_repositories() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/api/v4/groups/1/projects")
        .match_query(Matcher::Any)
        .with_body(format!(
            "[{}, {}]",
            project_json(10, "open", "public", &server),
            project_json(11, "closed", "private", &server)
        ))
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/projects/10/search")
        .match_query(Matcher::Any)
        .with_body("[]")
        .create_async()
        .await;

    let private_search = server
        .mock("GET", "/api/v4/projects/11/search")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut search_params = params("needle");
    search_params.groups = Some("1".to_string());
    search_params.visibility = vec![Visibility::Public];

    let results = searcher_for(&server).search(&search_params).await.unwrap();

    private_search.assert_async().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "open");
}

#[tokio::test]
async fn scope_qualifiers_reach_the_search_endpoint() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/api/v4/groups/1/projects")
        .match_query(Matcher::Any)
        .with_body(format!("[{}]", project_json(10, "alpha", "public", &server)))
        .create_async()
        .await;

    let scoped = server
        .mock("GET", "/api/v4/projects/10/search")
        .match_query(Matcher::UrlEncoded(
            "search".into(),
            "needle extension:py filename:x path:y".into(),
        ))
        .with_body("[]")
        .create_async()
        .await;

    let mut search_params = params("needle");
    search_params.groups = Some("1".to_string());
    search_params.extension = Some("py".to_string());
    search_params.filename = Some("x".to_string());
    search_params.path = Some("y".to_string());

    searcher_for(&server).search(&search_params).await.unwrap();

    scoped.assert_async().await;
}

#[tokio::test]
async fn throttled_repository_yields_a_partial_result() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/api/v4/groups/1/projects")
        .match_query(Matcher::Any)
        .with_body(format!(
            "[{}, {}]",
            project_json(10, "alpha", "public", &server),
            project_json(20, "beta", "public", &server)
        ))
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/projects/10/search")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/projects/20/search")
        .match_query(Matcher::Any)
        .with_body(format!("[{}]", match_json(20, "src/lib.rs", "needle")))
        .create_async()
        .await;

    let mut search_params = params("needle");
    search_params.groups = Some("1".to_string());

    let results = searcher_for(&server).search(&search_params).await.unwrap();

    assert_eq!(results.len(), 2);
    let alpha = results.iter().find(|entry| entry.name == "alpha").unwrap();
    assert!(alpha.matches.is_empty());
    let beta = results.iter().find(|entry| entry.name == "beta").unwrap();
    assert_eq!(beta.matches.len(), 1);
}

#[tokio::test]
async fn failed_group_aborts_the_enumeration() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/api/v4/groups/1/projects")
        .match_query(Matcher::Any)
        .with_body(format!("[{}]", project_json(10, "alpha", "public", &server)))
        .create_async()
        .await;

    server
        .mock("GET", "/api/v4/groups/2/projects")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let mut search_params = params("needle");
    search_params.groups = Some("1,2".to_string());

    let result = searcher_for(&server).search(&search_params).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn worker_pool_never_exceeds_the_requested_size() {
    let mut server = Server::new_async().await;

    let in_flight = Arc::new(AtomicUsize::new(0));
    let high_water = Arc::new(AtomicUsize::new(0));

    for group_id in 1..=4 {
        let in_flight = in_flight.clone();
        let high_water = high_water.clone();

        server
            .mock("GET", format!("/api/v4/groups/{group_id}/projects").as_str())
            .match_query(Matcher::Any)
            .with_chunked_body(move |writer| {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(100));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                writer.write_all(b"[]")
            })
            .create_async()
            .await;
    }

    let mut search_params = params("needle");
    search_params.groups = Some("1,2,3,4".to_string());
    search_params.max_workers = 2;

    let results = searcher_for(&server).search(&search_params).await.unwrap();

    assert!(results.is_empty());
    let seen = high_water.load(Ordering::SeqCst);
    assert!((1..=2).contains(&seen), "observed {seen} in-flight requests");
}
