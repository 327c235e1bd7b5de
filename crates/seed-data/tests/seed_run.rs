//! Seeding runs against in-memory stores.

use std::io::Write;

use loader::driver::StoreBehavior;
use seed_data::prelude::*;

fn target() -> Target {
    Target::new("elemental", "monsters").unwrap()
}

#[tokio::test]
async fn test_seed_writes_to_first_store_only() {
    let driver = MemoryDriver::new();
    let seeder = Seeder::new(driver.clone());
    let config = SeedConfig::new(vec![
        StoreConfig::new("memory://first"),
        StoreConfig::new("memory://second"),
    ]);

    let summary = seeder.seed(&config, &monster_records()).await.unwrap();

    assert_eq!(summary.inserted, 13);
    assert_eq!(summary.stores_opened, 2);
    assert_eq!(summary.target_store, "memory://first");
    assert!(summary.finished_at >= summary.started_at);

    assert_eq!(driver.records("memory://first", &target()).len(), 13);
    assert!(driver.records("memory://second", &target()).is_empty());

    // Both stores were verified and released.
    for uri in ["memory://first", "memory://second"] {
        let stats = driver.stats(uri);
        assert_eq!(stats.pings, 1);
        assert_eq!(stats.live(), 0);
    }
}

#[tokio::test]
async fn test_seed_named_target_store() {
    let driver = MemoryDriver::new();
    let seeder = Seeder::new(driver.clone());
    let mut config = SeedConfig::new(vec![
        StoreConfig::new("memory://first").with_name("primary"),
        StoreConfig::new("memory://second").with_name("replica"),
    ]);
    config.target_store = Some("replica".to_string());

    let summary = seeder.seed(&config, &monster_records()).await.unwrap();

    assert_eq!(summary.target_store, "replica");
    assert_eq!(driver.stats("memory://second").insert_calls, 1);
    assert_eq!(driver.stats("memory://first").insert_calls, 0);
}

#[tokio::test]
async fn test_setup_failure_aborts_before_insert() {
    let driver = MemoryDriver::new();
    driver.behave("memory://second", StoreBehavior::refusing());
    let seeder = Seeder::new(driver.clone());
    let config = SeedConfig::new(vec![
        StoreConfig::new("memory://first"),
        StoreConfig::new("memory://second"),
    ]);

    let err = seeder.seed(&config, &monster_records()).await.unwrap_err();

    match &err {
        SeedError::Connection(e) => {
            assert_eq!(e.store, "memory://second");
            assert_eq!(e.stage, Stage::Connect);
        }
        other => panic!("expected connection error, got {other:?}"),
    }
    let report = format!("{:#}", anyhow::Error::from(err));
    assert!(report.starts_with("store setup failed: connect failed for store memory://second"));
    assert!(!report.contains('\n'));
    assert_eq!(report.matches("memory://second").count(), 1);
    assert_eq!(driver.stats("memory://first").insert_calls, 0);
    assert_eq!(driver.live_connections(), 0);
}

#[tokio::test]
async fn test_insert_failure_still_closes_every_store() {
    let driver = MemoryDriver::new();
    driver.behave(
        "memory://first",
        StoreBehavior {
            commit_limit: Some(5),
            ..StoreBehavior::default()
        },
    );
    let seeder = Seeder::new(driver.clone());
    let config = SeedConfig::new(vec![
        StoreConfig::new("memory://first"),
        StoreConfig::new("memory://second"),
    ]);

    let err = seeder.seed(&config, &monster_records()).await.unwrap_err();

    match err {
        SeedError::Insert(e) => assert_eq!(e.committed(), 5),
        other => panic!("expected insert error, got {other:?}"),
    }
    assert_eq!(driver.records("memory://first", &target()).len(), 5);
    assert_eq!(driver.live_connections(), 0);
}

#[tokio::test]
async fn test_mixed_records_are_rejected_before_connecting() {
    let driver = MemoryDriver::new();
    let seeder = Seeder::new(driver.clone());
    let config = SeedConfig::new(vec![StoreConfig::new("memory://first")]);

    let mut records = monster_records();
    records.push(Record::new().with_text("name", "Golem"));

    let err = seeder.seed(&config, &records).await.unwrap_err();

    assert!(matches!(
        err,
        SeedError::Config(ConfigError::SchemaMismatch { index: 13, .. })
    ));
    assert_eq!(driver.stats("memory://first").network_calls(), 0);
}

#[tokio::test]
async fn test_records_file_replaces_fixture() {
    let mut file = std::env::temp_dir();
    file.push(format!("seed-records-{}.json", std::process::id()));
    {
        let mut out = std::fs::File::create(&file).unwrap();
        write!(
            out,
            r#"[{{"name": "Golem", "level": 9}}, {{"name": "Wraith", "level": 4}}]"#
        )
        .unwrap();
    }

    let records = load_records(&file).unwrap();
    std::fs::remove_file(&file).unwrap();

    let driver = MemoryDriver::new();
    let summary = Seeder::new(driver.clone())
        .seed(&SeedConfig::new(vec![StoreConfig::new("memory://a")]), &records)
        .await
        .unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(
        driver.records("memory://a", &target())[1].get("level"),
        Some(&FieldValue::Integer(4))
    );
}
