//! Opening the store from `TempoConfig`.

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempo_config::{DatabaseConfig, GeneralConfig, TempoConfig};
use tempo_core::entities::NewContributor;
use tempo_db::TempoService;

fn config_at(path: &std::path::Path, default_limit: u32) -> TempoConfig {
    TempoConfig {
        database: DatabaseConfig {
            path: path.to_string_lossy().into_owned(),
            foreign_keys: true,
        },
        general: GeneralConfig { default_limit },
    }
}

#[tokio::test]
async fn creates_the_database_directory_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_at(&dir.path().join("nested/.tempo/tempo.db"), 50);
    let created = Utc.with_ymd_and_hms(2012, 3, 3, 14, 0, 0).unwrap();

    let id = {
        let svc = TempoService::from_config(&config).await.unwrap();
        svc.register_contributor(NewContributor::new("po").email("po@example.com"), created)
            .await
            .unwrap()
            .id
    };
    assert!(dir.path().join("nested/.tempo/tempo.db").exists());

    // Reopening runs migrations again without touching existing rows.
    let svc = TempoService::from_config(&config).await.unwrap();
    let po = svc.get_contributor(&id).await.unwrap();
    assert_eq!(po.username, "po");
    assert_eq!(po.created_at, created);
}

#[tokio::test]
async fn list_limit_comes_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let svc = TempoService::from_config(&config_at(&dir.path().join("tempo.db"), 2))
        .await
        .unwrap();
    assert_eq!(svc.default_limit(), 2);

    let at = Utc.with_ymd_and_hms(2012, 3, 3, 14, 0, 0).unwrap();
    let po = svc
        .register_contributor(NewContributor::new("po"), at)
        .await
        .unwrap();
    for title in ["one", "two", "three"] {
        svc.new_epic(&po.id, title, "", at).await.unwrap();
    }
    assert_eq!(svc.list_epics(None).await.unwrap().len(), 2);
    assert_eq!(svc.list_epics(Some(10)).await.unwrap().len(), 3);
}

#[tokio::test]
async fn in_memory_config_opens_an_empty_store() {
    let svc = TempoService::from_config(&TempoConfig::in_memory())
        .await
        .unwrap();
    assert!(svc.list_contributors().await.unwrap().is_empty());
    assert!(svc.list_epics(None).await.unwrap().is_empty());
}
