use issue_mirror::github::GithubIssues;
use issue_mirror::transport::IssueTransport;
use issue_mirror_core::config::RepoRef;
use issue_mirror_core::issue::{Issue, IssueState};
use issue_mirror_core::labels::Label;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rest_issue(number: u64, state: &str, labels: &[&str]) -> serde_json::Value {
    json!({
        "id": number * 10,
        "node_id": format!("I_{number}"),
        "number": number,
        "title": format!("issue {number}"),
        "body": format!("body {number}"),
        "state": state,
        "labels": labels
            .iter()
            .map(|l| json!({ "id": 1, "name": l, "color": "ededed" }))
            .collect::<Vec<_>>(),
        "user": { "login": "octocat" },
    })
}

fn backend(server: &MockServer) -> GithubIssues {
    GithubIssues::new(
        RepoRef {
            owner: "acme".to_owned(),
            name: "widgets".to_owned(),
        },
        "test-token".to_owned(),
        &server.uri(),
    )
    .unwrap()
}

#[tokio::test]
async fn list_issues_paginates_and_skips_pull_requests() {
    let server = MockServer::start().await;

    let first_page: Vec<_> = (1..=100).map(|n| rest_issue(n, "open", &[])).collect();
    let mut pr = rest_issue(102, "open", &[]);
    pr["pull_request"] = json!({ "url": "https://api.github.com/repos/acme/widgets/pulls/102" });

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("state", "all"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([rest_issue(101, "closed", &["bug"]), pr])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let issues = backend(&server).list_issues(false, &[]).await.unwrap();
    assert_eq!(issues.len(), 101);
    assert_eq!(issues[0].number, 1);
    let last = issues.last().unwrap();
    assert_eq!(last.number, 101);
    assert_eq!(last.state, Some(IssueState::Closed));
    assert_eq!(last.label_names(), vec!["bug".to_owned()]);
}

#[tokio::test]
async fn list_issues_passes_state_and_label_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues"))
        .and(query_param("state", "open"))
        .and(query_param("labels", "bug,help wanted"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([rest_issue(
            7,
            "open",
            &["bug", "help wanted"]
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let issues = backend(&server)
        .list_issues(true, &["bug".to_owned(), "help wanted".to_owned()])
        .await
        .unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].node_id.as_deref(), Some("I_7"));
}

#[tokio::test]
async fn create_issue_submits_normalized_labels() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "title": "Crash on start",
            "body": "",
            "labels": ["bug", "ui"],
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(rest_issue(55, "open", &["bug", "ui"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut issue = Issue::new(3, "Crash on start");
    issue.labels = vec![
        Label::from("bug"),
        Label::Record {
            name: Some("ui".to_owned()),
        },
        Label::Record { name: None },
    ];

    let created = backend(&server).create_issue(&issue).await.unwrap();
    assert_eq!(created.number, 55);
    assert_eq!(created.node_id.as_deref(), Some("I_55"));
}

#[tokio::test]
async fn create_issue_requires_title() {
    let server = MockServer::start().await;
    let err = backend(&server)
        .create_issue(&Issue::new(9, "  "))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("#9 has no title"));
}

#[tokio::test]
async fn get_issue_state_maps_open_and_closed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_issue(1, "open", &[])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/issues/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rest_issue(2, "closed", &[])))
        .mount(&server)
        .await;

    let b = backend(&server);
    assert_eq!(b.get_issue_state(1).await.unwrap(), IssueState::Open);
    assert_eq!(b.get_issue_state(2).await.unwrap(), IssueState::Closed);
}

#[tokio::test]
async fn api_errors_keep_status_in_cause_chain() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues"))
        .respond_with(
            ResponseTemplate::new(403).set_body_string("Resource not accessible by integration"),
        )
        .mount(&server)
        .await;

    let err = backend(&server)
        .create_issue(&Issue::new(4, "title"))
        .await
        .unwrap_err();

    let chain: Vec<String> = err.chain().map(|e| e.to_string()).collect();
    assert_eq!(chain[0], "github create issue from #4");
    assert!(chain[1].contains("403"));
    assert!(chain[1].contains("Resource not accessible"));
}

#[test]
fn new_rejects_missing_token() {
    let err = GithubIssues::new(
        RepoRef {
            owner: "acme".to_owned(),
            name: "widgets".to_owned(),
        },
        " ".to_owned(),
        "https://api.github.com",
    )
    .unwrap_err();
    assert!(err.to_string().contains("missing github token"));
}
