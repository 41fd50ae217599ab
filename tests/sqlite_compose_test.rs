use std::sync::Arc;
use tempfile::TempDir;

use garden_hub::db::{self, SqliteStore};
use garden_hub::model::StorageId;
use garden_hub::seed;
use garden_hub::GardenAggregator;

const FIXTURE: &str = r#"
gardens:
  - id: "5a1f0c9e2b3d4e5f60718293"
    name: "Backyard"
    started_at: "2024-03-01T08:00:00Z"
    plants:
      - name: "Lemon Haze"
        size: 40
        genotype: "sativa"
        flavors:
          - name: "citrus"
          - name: "sweet"
        attributes:
          - name: "euphoric"
            type: "effects"
            percentage: 80
        images:
          - id: "5a1f0c9e2b3d4e5f607182aa"
            url: "https://img.example/lemon.jpg"
      - name: "Amnesia"
    irrigations:
      - done_at: "2024-03-02T07:30:00Z"
        quantity: 1.5
        nutrients: "grow"
  - name: "Balcony"
    started_at: "2024-04-01T08:00:00Z"
"#;

async fn setup() -> (TempDir, db::Pool, GardenAggregator) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("gardens.db").display());
    let pool = db::init_pool(&url, 4).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool.clone()));
    let aggregator = GardenAggregator::new(store.clone(), store.clone(), store);
    (dir, pool, aggregator)
}

#[tokio::test]
async fn seeded_fixture_composes_end_to_end() {
    let (_dir, pool, aggregator) = setup().await;
    let fixture = seed::parse_fixture(FIXTURE).unwrap();
    let (ids, summary) = seed::import(&pool, fixture).await.unwrap();

    assert_eq!(summary.gardens, 2);
    assert_eq!(summary.plants, 2);
    assert_eq!(summary.irrigations, 1);
    assert_eq!(ids[0].to_hex(), "5a1f0c9e2b3d4e5f60718293");

    let backyard = aggregator.compose_garden(&ids[0]).await.unwrap();
    assert_eq!(backyard.key.id.as_deref(), Some("5a1f0c9e2b3d4e5f60718293"));
    assert!(backyard.key.storage.is_none());

    let plants = backyard.plants.as_ref().unwrap();
    assert_eq!(plants.len(), 2);
    assert!(plants.iter().all(|p| p.garden_id == ids[0]));
    let lemon = plants.iter().find(|p| p.name == "Lemon Haze").unwrap();
    assert_eq!(lemon.flavors.as_ref().unwrap().len(), 2);
    assert_eq!(lemon.attributes.as_ref().unwrap()[0].percentage, 80);
    assert_eq!(
        lemon.images.as_ref().unwrap()[0].key.id.as_deref(),
        Some("5a1f0c9e2b3d4e5f607182aa")
    );

    let irrigations = backyard.irrigations.as_ref().unwrap();
    assert_eq!(irrigations.len(), 1);
    assert_eq!(irrigations[0].nutrients.as_deref(), Some("grow"));

    let json = serde_json::to_string(&backyard).unwrap();
    assert!(!json.contains("\"_id\""));
}

#[tokio::test]
async fn seeded_gardens_compose_concurrently() {
    let (_dir, pool, aggregator) = setup().await;
    let (ids, _) = seed::import(&pool, seed::parse_fixture(FIXTURE).unwrap())
        .await
        .unwrap();

    let mut refs = ids.clone();
    refs.push(StorageId::generate());
    let mut gardens = aggregator.compose_gardens(&refs).await.unwrap();
    gardens.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(gardens.len(), 2);
    assert_eq!(gardens[0].name, "Backyard");
    assert_eq!(gardens[1].name, "Balcony");
    assert_eq!(gardens[1].plants, Some(vec![]));
    assert_eq!(gardens[1].irrigations, Some(vec![]));
}

#[tokio::test]
async fn plant_images_and_lookup_by_name() {
    let (_dir, pool, aggregator) = setup().await;
    let (ids, _) = seed::import(&pool, seed::parse_fixture(FIXTURE).unwrap())
        .await
        .unwrap();

    let found = aggregator
        .find_garden_by_name("Balcony")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.key.id, Some(ids[1].to_hex()));

    let backyard = aggregator.compose_garden(&ids[0]).await.unwrap();
    let lemon = backyard
        .plants
        .unwrap()
        .into_iter()
        .find(|p| p.name == "Lemon Haze")
        .unwrap();
    let lemon_id: StorageId = lemon.key.id.unwrap().parse().unwrap();

    let images = aggregator.plant_image_ids(&lemon_id).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].to_hex(), "5a1f0c9e2b3d4e5f607182aa");
}

#[tokio::test]
async fn fixture_with_bad_id_is_rejected() {
    let (_dir, pool, _aggregator) = setup().await;
    let fixture = seed::parse_fixture(
        r#"
gardens:
  - id: "not-a-real-id"
    name: "Broken"
    started_at: "2024-03-01T08:00:00Z"
"#,
    )
    .unwrap();
    let err = seed::import(&pool, fixture).await.unwrap_err();
    assert!(matches!(err, seed::SeedError::Id(_)));
}

#[tokio::test]
async fn failed_import_persists_nothing() {
    let (_dir, pool, _aggregator) = setup().await;
    let fixture = seed::parse_fixture(
        r#"
gardens:
  - name: "Greenhouse"
    started_at: "2024-03-01T08:00:00Z"
  - name: "Duplicates"
    started_at: "2024-03-01T08:00:00Z"
    plants:
      - id: "5a1f0c9e2b3d4e5f607182bb"
        name: "Haze"
      - id: "5a1f0c9e2b3d4e5f607182bb"
        name: "Haze again"
"#,
    )
    .unwrap();
    let err = seed::import(&pool, fixture).await.unwrap_err();
    assert!(matches!(err, seed::SeedError::Store(_)));

    let gardens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gardens")
        .fetch_one(&pool)
        .await
        .unwrap();
    let plants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plants")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(gardens, 0);
    assert_eq!(plants, 0);

    let (_, summary) = seed::import(&pool, seed::parse_fixture(FIXTURE).unwrap())
        .await
        .unwrap();
    assert_eq!(summary.gardens, 2);
}
