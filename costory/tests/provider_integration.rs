use costory::context::Context;
use costory::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use costory::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest,
};
use costory::types::{has_errors, AttributePath, DynamicValue};
use costory::{ConfigureProviderRequest, CostoryProvider};
use futures::future::join_all;
use mockito::{Matcher, Server};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

async fn configured_provider(url: &str) -> (CostoryProvider, ConfigureResourceRequest) {
    let mut provider = CostoryProvider::new();
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                config: DynamicValue::new(json!({
                    "slug": "acme",
                    "token": "test-token",
                    "base_url": url,
                })),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());

    let request = ConfigureResourceRequest {
        provider_data: response.provider_data,
    };
    (provider, request)
}

#[tokio::test(flavor = "multi_thread")]
async fn aws_datasource_lifecycle_with_mock_server() {
    init_tracing();
    let mut server = Server::new_async().await;

    let create = server
        .mock("POST", "/terraform/billingDatasources")
        .match_header("authorization", "Bearer test-token")
        .match_header("x-costory-slug", "acme")
        .match_body(Matcher::PartialJson(json!({
            "type": "AWS",
            "bucketName": "billing-bucket",
        })))
        .with_status(201)
        .with_body(r#"{"id":"aws-ds-1","status":"PENDING"}"#)
        .expect(1)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/terraform/billingDatasources/aws-ds-1")
        .with_body(r#"{"id":"aws-ds-1","status":"ACTIVE","name":"AWS Billing","bucketName":"billing-bucket","roleArn":"arn:aws:iam::123456789012:role/costory","prefix":"cur/"}"#)
        .expect(2)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/terraform/billingDatasources/aws-ds-1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let (provider, configure_request) = configured_provider(&server.url()).await;
    let factories = provider.resources();
    let mut resource = factories.get("costory_billing_datasource_aws").unwrap()();
    let configured = resource.configure(Context::new(), configure_request).await;
    assert!(configured.diagnostics.is_empty());

    let plan = DynamicValue::new(json!({
        "id": null,
        "status": null,
        "name": "AWS Billing",
        "bucket_name": "billing-bucket",
        "role_arn": "arn:aws:iam::123456789012:role/costory",
        "prefix": "cur/",
        "eks_split_data_enabled": null,
        "start_date": null,
        "end_date": null,
        "eks_split": null,
    }));
    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                planned_state: plan.clone(),
                config: plan,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty());
    assert_eq!(
        created
            .new_state
            .get_string(&AttributePath::new("status"))
            .unwrap(),
        "ACTIVE"
    );

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                current_state: created.new_state.clone(),
            },
        )
        .await;
    assert!(read.diagnostics.is_empty());
    assert_eq!(read.new_state, Some(created.new_state.clone()));

    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                prior_state: created.new_state,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty());

    create.assert_async().await;
    get.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn imported_gcp_datasource_is_filled_by_read() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", "/terraform/billingDatasources/gcp-ds-1")
        .with_body(r#"{"id":"gcp-ds-1","type":"GCP","name":"GCP Billing","bqUri":"project.dataset.table","isDetailedBilling":true}"#)
        .create_async()
        .await;

    let (provider, configure_request) = configured_provider(&server.url()).await;
    let factories = provider.resources();
    let mut resource = factories.get("costory_billing_datasource_gcp").unwrap()();
    resource.configure(Context::new(), configure_request).await;

    let imported = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                id: "gcp-ds-1".to_string(),
            },
        )
        .await;
    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                current_state: imported.state.unwrap(),
            },
        )
        .await;

    let state = read.new_state.unwrap();
    assert_eq!(
        state.get_string(&AttributePath::new("bq_table_path")).unwrap(),
        "project.dataset.table"
    );
    assert!(state
        .get_bool(&AttributePath::new("is_detailed_billing"))
        .unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn service_account_reads_share_one_client() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/terraform/")
        .with_body(r#"{"service_account":"sa-test","sub_ids":["sub-1","sub-2"]}"#)
        .expect(3)
        .create_async()
        .await;

    let (provider, configure_request) = configured_provider(&server.url()).await;
    let factories = provider.data_sources();
    let factory = factories.get("costory_service_account").unwrap();

    let mut data_sources = Vec::new();
    for _ in 0..3 {
        let mut data_source = factory();
        let response = data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: configure_request.provider_data.clone(),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        data_sources.push(data_source);
    }

    let responses = join_all(data_sources.iter().map(|data_source| {
        data_source.read(
            Context::new(),
            ReadDataSourceRequest {
                config: DynamicValue::null(),
            },
        )
    }))
    .await;

    for response in responses {
        assert!(!has_errors(&response.diagnostics));
        assert_eq!(
            response.state.as_json(),
            &json!({"service_account": "sa-test", "sub_ids": ["sub-1", "sub-2"]})
        );
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn unconfigured_provider_leaves_handlers_unconfigured() {
    let provider = CostoryProvider::new();
    let factories = provider.resources();
    let mut resource = factories.get("costory_billing_datasource_aws").unwrap()();

    let configured = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: None,
            },
        )
        .await;
    assert!(configured.diagnostics.is_empty());

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                current_state: DynamicValue::new(json!({"id": "aws-ds-1"})),
            },
        )
        .await;
    assert!(has_errors(&read.diagnostics));
    assert_eq!(read.diagnostics[0].summary, "Unconfigured Costory client");
}
