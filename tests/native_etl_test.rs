//! Native ETL against a mocked ClinicalTrials.gov API

mod fixtures;

use ctgov_etl::config::{PipelineConfig, SourceConfig};
use ctgov_etl::etl::changes::{NEW_STUDY, NO_CHANGES};
use ctgov_etl::etl::history::read_table;
use ctgov_etl::etl::{ClinicalTrialsClient, EtlRunner, NativeEtl};
use ctgov_etl::{OutputSet, PipelineError};
use fixtures::studies::{page, study};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// First page request: no `pageToken` parameter
struct FirstPage;

impl Match for FirstPage {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == "pageToken")
    }
}

fn source_for(server: &MockServer) -> SourceConfig {
    let mut source = PipelineConfig::default().source;
    source.base_url = server.uri();
    source.page_size = 2;
    source
}

async fn mount_two_pages(server: &MockServer, second_status: &str) {
    Mock::given(method("GET"))
        .and(path("/studies"))
        .and(query_param("query.cond", "HFpEF - Heart Failure With Preserved Ejection Fraction"))
        .and(query_param("pageSize", "2"))
        .and(FirstPage)
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![study("NCT00000001", "RECRUITING", 120), study("NCT00000002", "COMPLETED", 40)],
            Some("p2"),
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/studies"))
        .and(query_param("pageToken", "p2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![study("NCT00000003", second_status, 300)], None)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_client_follows_page_tokens() {
    let server = MockServer::start().await;
    mount_two_pages(&server, "RECRUITING").await;

    let client = ClinicalTrialsClient::new(&source_for(&server)).unwrap();
    let studies = client.fetch_studies().await.unwrap();

    assert_eq!(studies.len(), 3);
    assert_eq!(studies[2]["protocolSection"]["identificationModule"]["nctId"], "NCT00000003");
}

#[tokio::test]
async fn test_client_stops_at_max_studies() {
    let server = MockServer::start().await;
    mount_two_pages(&server, "RECRUITING").await;

    let mut source = source_for(&server);
    source.max_studies = Some(2);
    let studies = ClinicalTrialsClient::new(&source).unwrap().fetch_studies().await.unwrap();

    assert_eq!(studies.len(), 2);
}

#[tokio::test]
async fn test_client_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/studies"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = ClinicalTrialsClient::new(&source_for(&server))
        .unwrap()
        .fetch_studies()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_native_etl_produces_every_output() {
    let server = MockServer::start().await;
    mount_two_pages(&server, "RECRUITING").await;
    let dir = tempfile::tempdir().unwrap();
    let outputs = OutputSet::new(dir.path(), "data");

    let report = NativeEtl::new(source_for(&server), 10).run(&outputs).await.unwrap();

    assert_eq!(report.studies, Some(3));
    assert!(outputs.missing().is_empty(), "missing: {:?}", outputs.missing());
    assert!(outputs.path_of("sponsors_collaborators.csv").is_file());

    let studies = read_table(&outputs.path_of("studies.csv")).unwrap();
    assert_eq!(studies.rows.len(), 3);
    let title = studies.column("BriefTitle").unwrap();
    assert_eq!(studies.rows[0][title], "Exercise Training in HFpEF & Obesity");
    let status = studies.column("OverallStatus").unwrap();
    assert_eq!(studies.rows[1][status], "Completed");

    let conditions = read_table(&outputs.path_of("conditions.csv")).unwrap();
    assert_eq!(conditions.rows.len(), 6);

    let changes = read_table(&outputs.path_of("changes.csv")).unwrap();
    let field = changes.column("field_changed").unwrap();
    assert_eq!(changes.rows.len(), 3);
    assert!(changes.rows.iter().all(|row| row[field] == NEW_STUDY));
}

#[tokio::test]
async fn test_second_run_appends_history_and_reports_field_change() {
    let dir = tempfile::tempdir().unwrap();
    let outputs = OutputSet::new(dir.path(), "data");

    let first = MockServer::start().await;
    mount_two_pages(&first, "RECRUITING").await;
    NativeEtl::new(source_for(&first), 10).run(&outputs).await.unwrap();

    let second = MockServer::start().await;
    mount_two_pages(&second, "COMPLETED").await;
    let report = NativeEtl::new(source_for(&second), 10).run(&outputs).await.unwrap();

    let history = read_table(&outputs.path_of("studies_history.csv")).unwrap();
    assert_eq!(history.rows.len(), 6);

    let changes = report.changes.unwrap();
    assert_eq!(changes.new_studies, 0);
    assert_eq!(changes.field_changes, 1);

    let table = read_table(&outputs.path_of("changes.csv")).unwrap();
    let field = table.column("field_changed").unwrap();
    let id = table.column("NCTId").unwrap();
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0][id], "NCT00000003");
    assert_eq!(table.rows[0][field], "Overall Status");
    assert_ne!(table.rows[0][field], NO_CHANGES);
}

#[tokio::test]
async fn test_empty_result_is_an_etl_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/studies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let err = NativeEtl::new(source_for(&server), 10)
        .run(&OutputSet::new(dir.path(), "data"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EtlExecution { .. }));
}
