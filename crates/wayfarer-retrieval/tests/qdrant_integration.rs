use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, UpsertPointsBuilder, VectorParamsBuilder,
};
use testcontainers::ContainerAsync;
use testcontainers::GenericImage;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use wayfarer_retrieval::qdrant_ops::QdrantOps;
use wayfarer_retrieval::vector::VectorMatch;
use wayfarer_retrieval::vector_store::VectorStore;

const QDRANT_GRPC_PORT: ContainerPort = ContainerPort::Tcp(6334);
const COLLECTION: &str = "vietnam_travel";

fn qdrant_image() -> GenericImage {
    GenericImage::new("qdrant/qdrant", "v1.16.0")
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
        .with_exposed_port(QDRANT_GRPC_PORT)
}

async fn seeded_qdrant() -> (QdrantOps, ContainerAsync<GenericImage>) {
    let container = qdrant_image().start().await.unwrap();
    let grpc_port = container.get_host_port_ipv4(6334).await.unwrap();
    let url = format!("http://127.0.0.1:{grpc_port}");

    let client = Qdrant::from_url(&url).build().unwrap();
    client
        .create_collection(
            CreateCollectionBuilder::new(COLLECTION)
                .vectors_config(VectorParamsBuilder::new(4, Distance::Cosine)),
        )
        .await
        .unwrap();

    let destinations = [
        (1u64, [1.0, 0.0, 0.0, 0.0], serde_json::json!({
            "name": "Ha Long Bay",
            "region": "Northern Vietnam",
            "type": "Bay",
            "tags": ["cruise", "scenic"],
            "best_time_to_visit": "Oct-Apr"
        })),
        (2u64, [0.0, 1.0, 0.0, 0.0], serde_json::json!({
            "name": "Mekong Delta",
            "semantic_text": "Floating markets and river life"
        })),
    ];
    let points = destinations
        .into_iter()
        .map(|(id, vector, payload)| {
            let payload: HashMap<String, qdrant_client::qdrant::Value> =
                serde_json::from_value(payload).unwrap();
            PointStruct::new(id, vector.to_vec(), payload)
        })
        .collect::<Vec<_>>();
    client
        .upsert_points(UpsertPointsBuilder::new(COLLECTION, points).wait(true))
        .await
        .unwrap();

    (QdrantOps::new(&url, None).unwrap(), container)
}

#[tokio::test]
#[ignore = "requires Docker for the Qdrant container"]
async fn collection_probe_reports_presence() {
    let (ops, _container) = seeded_qdrant().await;
    assert!(VectorStore::collection_exists(&ops, COLLECTION).await.unwrap());
    assert!(!VectorStore::collection_exists(&ops, "absent").await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker for the Qdrant container"]
async fn search_returns_payload_mapped_matches() {
    let (ops, _container) = seeded_qdrant().await;

    let points = VectorStore::search(&ops, COLLECTION, vec![0.9, 0.1, 0.0, 0.0], 2)
        .await
        .unwrap();
    let matches: Vec<VectorMatch> = points.into_iter().map(VectorMatch::from_point).collect();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "1");
    assert_eq!(matches[0].metadata.name, "Ha Long Bay");
    assert_eq!(matches[0].metadata.tags, vec!["cruise", "scenic"]);
    assert_eq!(matches[1].metadata.region, "Unknown");
    assert_eq!(
        matches[1].metadata.semantic_text.as_deref(),
        Some("Floating markets and river life")
    );
}
