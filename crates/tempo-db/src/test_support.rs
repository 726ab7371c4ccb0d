//! Shared test utilities for tempo-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use chrono::{DateTime, TimeZone, Utc};
    use tempo_core::entities::{Contributor, Epic, NewContributor, UserStory};

    use crate::service::TempoService;

    /// Creation time of the fixtures: 2012-03-03 14:00 UTC.
    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 3, 3, 14, 0, 0).unwrap()
    }

    /// Create an in-memory `TempoService` with the libSQL ledger.
    pub async fn test_service() -> TempoService {
        TempoService::new_local(":memory:").await.unwrap()
    }

    pub async fn register(svc: &TempoService, username: &str) -> Contributor {
        svc.register_contributor(NewContributor::new(username), t0())
            .await
            .unwrap()
    }

    /// A product owner, two developers and an epic owned by the product owner.
    pub struct Team {
        pub po: Contributor,
        pub dev1: Contributor,
        pub dev2: Contributor,
        pub epic: Epic,
    }

    pub async fn team(svc: &TempoService) -> Team {
        let po = register(svc, "po_test").await;
        let dev1 = register(svc, "dev1_test").await;
        let dev2 = register(svc, "dev2_test").await;
        let epic = svc
            .new_epic(&po.id, "A new epic", "Build an app.", t0())
            .await
            .unwrap();
        Team {
            po,
            dev1,
            dev2,
            epic,
        }
    }

    pub async fn story(svc: &TempoService, team: &Team, title: &str) -> UserStory {
        svc.new_story(&team.po.id, &team.epic.id, title, "a test story", t0())
            .await
            .unwrap()
    }
}
