use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;
use topo_sync_core::{
    load_export, AttributeSelection, FileSink, LocalDirSource, MissingAttributePolicy,
    SyncError, SyncPipeline, DEFAULT_OUTPUT_FILE,
};
use topo_sync_test_utils::{
    element, sample_config, ChangeFixture, MemorySource, RecordingSink, StaticTopology,
    ORGS_ATTR, SERVICES_ATTR, START_ATTR, STATUS_ATTR, TITLE_ATTR,
};

fn organizations() -> StaticTopology {
    StaticTopology::with_organizations(&[("NL", "org-nl"), ("ES", "org-es")])
}

fn export() -> MemorySource {
    MemorySource::new().export(
        "changes-2023-11-14.json",
        vec![
            ChangeFixture::scheduled("Gateway upgrade")
                .organizations(&["NL", "SP"])
                .services("APIGW FE")
                .raw(),
            ChangeFixture::scheduled("Portal patch")
                .organizations(&["NL"])
                .services("Portal (web)")
                .raw(),
            ChangeFixture::scheduled("Draft")
                .attr(STATUS_ATTR, "Draft")
                .organizations(&["NL"])
                .services("Portal")
                .raw(),
        ],
    )
}

#[tokio::test]
async fn test_full_run_reports_every_change() {
    let topology = organizations().element(element("Portal", "svc-portal", "org-nl"));
    let sink = Arc::new(RecordingSink::new());
    let pipeline = SyncPipeline::new(
        Arc::new(sample_config()),
        Arc::new(export()),
        Arc::new(topology),
        sink.clone(),
    );

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.records_read, 3);
    assert_eq!(report.skipped_status, 1);
    assert_eq!(report.broadcast_changes, 1);
    assert_eq!(report.targeted_changes, 1);
    assert_eq!(report.changes_emitted, 2);
    assert_eq!(report.element_updates, 1);
    assert_eq!(report.relations_emitted, 3);
    assert_eq!(sink.relations()[1].from_unique_id, "org-es");
}

#[tokio::test]
async fn test_archived_exports_are_ignored() {
    let source = export().object("archive/changes-2023-11-13.json", "[]");
    let pipeline = SyncPipeline::new(
        Arc::new(sample_config()),
        Arc::new(source),
        Arc::new(organizations()),
        Arc::new(RecordingSink::new()),
    );

    assert_eq!(pipeline.run().await.unwrap().records_read, 3);
}

#[tokio::test]
async fn test_more_than_one_export_is_fatal() {
    let source = export().object("changes-2023-11-15.json", "[]");
    let sink = Arc::new(RecordingSink::new());
    let pipeline = SyncPipeline::new(
        Arc::new(sample_config()),
        Arc::new(source),
        Arc::new(organizations()),
        sink.clone(),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, SyncError::SourceFileCount { found: 2 }));
    assert!(sink.emissions().is_empty());
}

#[tokio::test]
async fn test_empty_store_is_fatal() {
    let pipeline = SyncPipeline::new(
        Arc::new(sample_config()),
        Arc::new(MemorySource::new()),
        Arc::new(organizations()),
        Arc::new(RecordingSink::new()),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, SyncError::SourceFileCount { found: 0 }));
}

#[tokio::test]
async fn test_unavailable_organization_index_is_fatal() {
    let sink = Arc::new(RecordingSink::new());
    let pipeline = SyncPipeline::new(
        Arc::new(sample_config()),
        Arc::new(export()),
        Arc::new(StaticTopology::unavailable()),
        sink.clone(),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, SyncError::OrganizationIndex(_)));
    assert!(sink.emissions().is_empty());
}

#[tokio::test]
async fn test_empty_organization_index_is_fatal() {
    let pipeline = SyncPipeline::new(
        Arc::new(sample_config()),
        Arc::new(export()),
        Arc::new(StaticTopology::with_organizations(&[])),
        Arc::new(RecordingSink::new()),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, SyncError::EmptyOrganizationIndex));
}

#[tokio::test]
async fn test_selected_attributes_are_projected() {
    let selection = AttributeSelection::parse(&format!(
        "{TITLE_ATTR},{STATUS_ATTR},{START_ATTR},{SERVICES_ATTR},{ORGS_ATTR}"
    ));
    let config = sample_config().with_selection(selection);
    let source = MemorySource::new().export(
        "changes.json",
        vec![ChangeFixture::scheduled("Projected")
            .attr("Assignee", "someone")
            .organizations(&["NL"])
            .services("APIGW FE")
            .raw()],
    );
    let sink = Arc::new(RecordingSink::new());
    let pipeline = SyncPipeline::new(
        Arc::new(config),
        Arc::new(source),
        Arc::new(organizations()),
        sink.clone(),
    );

    pipeline.run().await.unwrap();

    let changes = sink.changes();
    let change = &changes[0];
    assert!(change.get("Assignee").is_none());
    let keys: Vec<&str> = change.attributes().keys().map(String::as_str).collect();
    assert_eq!(
        &keys[..5],
        [TITLE_ATTR, STATUS_ATTR, START_ATTR, SERVICES_ATTR, ORGS_ATTR]
    );
}

#[tokio::test]
async fn test_missing_attribute_can_fail_the_run() {
    let config = sample_config()
        .with_selection(AttributeSelection::parse(&format!("{TITLE_ATTR},Assignee")))
        .with_missing_attribute_policy(MissingAttributePolicy::FailRun);
    let pipeline = SyncPipeline::new(
        Arc::new(config),
        Arc::new(export()),
        Arc::new(organizations()),
        Arc::new(RecordingSink::new()),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, SyncError::Extraction(_)));
}

#[tokio::test]
async fn test_missing_attribute_can_skip_the_record() {
    let config = sample_config()
        .with_selection(AttributeSelection::parse(&format!("{TITLE_ATTR},Assignee")))
        .with_missing_attribute_policy(MissingAttributePolicy::SkipRecord);
    let pipeline = SyncPipeline::new(
        Arc::new(config),
        Arc::new(export()),
        Arc::new(organizations()),
        Arc::new(RecordingSink::new()),
    );

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.extraction_skipped, 3);
    assert_eq!(report.changes_emitted, 0);
}

#[tokio::test]
async fn test_loaded_export_syncs_with_backends_built_afterwards() {
    let config = Arc::new(sample_config());
    let export = load_export(&export(), &config).await.unwrap();
    assert_eq!(export.key, "changes-2023-11-14.json");
    assert_eq!(export.records_read, 3);

    let topology = Arc::new(organizations().element(element("Portal", "svc-portal", "org-nl")));
    let sink = Arc::new(RecordingSink::new());
    let pipeline = SyncPipeline::new(
        config,
        Arc::new(MemorySource::new()),
        topology.clone(),
        sink.clone(),
    );

    let report = pipeline.sync(export).await.unwrap();
    assert_eq!(report.records_read, 3);
    assert_eq!(report.changes_emitted, 2);
    assert_eq!(topology.lookups(), vec!["Portal"]);
}

async fn run_to_file(store: &TempDir, output: &std::path::Path) -> String {
    let sink = Arc::new(FileSink::create(output).await.unwrap());
    let pipeline = SyncPipeline::new(
        Arc::new(sample_config()),
        Arc::new(LocalDirSource::new(store.path())),
        Arc::new(organizations()),
        sink,
    );
    pipeline.run().await.unwrap();
    tokio::fs::read_to_string(output).await.unwrap()
}

#[tokio::test]
async fn test_file_mode_artifact_is_fresh_on_every_run() {
    let store = TempDir::new().unwrap();
    let body = serde_json::to_vec(&vec![ChangeFixture::scheduled("Gateway upgrade")
        .organizations(&["NL"])
        .services("APIGW FE")
        .raw()])
    .unwrap();
    tokio::fs::write(store.path().join("changes.json"), body)
        .await
        .unwrap();
    tokio::fs::create_dir(store.path().join("archive"))
        .await
        .unwrap();
    tokio::fs::write(store.path().join("archive/old.json"), "[]")
        .await
        .unwrap();

    let out = TempDir::new().unwrap();
    let output = out.path().join(DEFAULT_OUTPUT_FILE);
    let first = run_to_file(&store, &output).await;
    let second = run_to_file(&store, &output).await;

    assert_eq!(first, second);
    let lines: Vec<&str> = second.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(r#"V:{"Change Title":"Gateway upgrade""#));
    assert_eq!(
        lines[1],
        r#"E:{"_fromUniqueId":"org-nl","_toUniqueId":"CHG_1700000000_APIGW FE","_edgeType":"has"}"#
    );
}
