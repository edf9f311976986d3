//! End-to-end scenarios for the identity engine, run against the in-memory
//! stores.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::error::{DatabaseError, DatabaseResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use identity::models::{
    CreateUserRequest, EmploymentRecord, JobProfile, Phone, ReporteeRelation,
    UpdateUserRequest, UserProfile, UserStatus,
};
use identity::repositories::{
    IdentityStore, InMemoryStore, JobProfileQuery, JobProfileStore, ReporteeStore, Stores,
    UniqueCandidates,
};
use identity::{EngineConfig, ErrorKind, IdentityEngine};

const ORG: &str = "org1";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn employment(
    start: NaiveDate,
    end: Option<NaiveDate>,
    manager: Option<Uuid>,
) -> EmploymentRecord {
    EmploymentRecord {
        title: "Engineer".to_string(),
        organizational_unit: "Platform".to_string(),
        start_date: Some(start),
        end_date: end,
        reporting_manager_id: manager.map(|id| id.to_string()),
        extension_data: Default::default(),
    }
}

fn create_request(username: &str, phone: &str, records: Vec<EmploymentRecord>) -> CreateUserRequest {
    CreateUserRequest {
        username: username.to_string(),
        first_name: username.to_string(),
        middle_name: None,
        last_name: None,
        email: format!("{}@example.com", username),
        email_verified: true,
        phone: Phone {
            number: phone.to_string(),
            country_code: "+1".to_string(),
        },
        phone_verified: true,
        employment: records,
    }
}

fn engine_for(store: &Arc<InMemoryStore>) -> IdentityEngine {
    IdentityEngine::new(Stores::in_memory(Arc::clone(store)), EngineConfig::default())
}

async fn create(engine: &IdentityEngine, request: CreateUserRequest) -> Uuid {
    let outcome = engine.create_user(ORG, request).await;
    assert!(outcome.success, "create failed: {}", outcome.message);
    outcome.data.unwrap().id
}

/// Delegates to the in-memory store, delaying the chosen reportee calls
struct SlowReportees {
    inner: Arc<InMemoryStore>,
    delay: Duration,
    slow_reads: bool,
    slow_writes: bool,
}

#[async_trait]
impl ReporteeStore for SlowReportees {
    async fn insert_many(&self, relations: &[ReporteeRelation]) -> DatabaseResult<()> {
        if self.slow_writes && !relations.is_empty() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.insert_many(relations).await
    }

    async fn find_by_manager(
        &self,
        organization_id: &str,
        manager_id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>> {
        self.inner.find_by_manager(organization_id, manager_id).await
    }

    async fn find_by_job_profile(
        &self,
        organization_id: &str,
        job_profile_id: Uuid,
    ) -> DatabaseResult<Vec<ReporteeRelation>> {
        if self.slow_reads {
            tokio::time::sleep(self.delay).await;
        }
        self.inner
            .find_by_job_profile(organization_id, job_profile_id)
            .await
    }

    async fn delete_by_job_profile(
        &self,
        organization_id: &str,
        job_profile_id: Uuid,
    ) -> DatabaseResult<u64> {
        self.inner
            .delete_by_job_profile(organization_id, job_profile_id)
            .await
    }
}

/// Reads from the in-memory store, rejects every save
struct FailingSaves {
    inner: Arc<InMemoryStore>,
}

#[async_trait]
impl IdentityStore for FailingSaves {
    async fn find_by_id(
        &self,
        organization_id: &str,
        id: Uuid,
    ) -> DatabaseResult<Option<UserProfile>> {
        IdentityStore::find_by_id(self.inner.as_ref(), organization_id, id).await
    }

    async fn find_by_ids(
        &self,
        organization_id: &str,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<UserProfile>> {
        IdentityStore::find_by_ids(self.inner.as_ref(), organization_id, ids).await
    }

    async fn find_by_unique_attributes(
        &self,
        organization_id: &str,
        candidates: &UniqueCandidates,
    ) -> DatabaseResult<Vec<UserProfile>> {
        self.inner
            .find_by_unique_attributes(organization_id, candidates)
            .await
    }

    async fn list_by_organization(&self, organization_id: &str) -> DatabaseResult<Vec<UserProfile>> {
        self.inner.list_by_organization(organization_id).await
    }

    async fn save(&self, _profile: &UserProfile) -> DatabaseResult<()> {
        Err(DatabaseError::Query(sqlx::Error::PoolTimedOut))
    }
}

/// Unique-attribute lookups see nothing, so only the save can catch a clash
struct StaleUniqueness {
    inner: Arc<InMemoryStore>,
}

#[async_trait]
impl IdentityStore for StaleUniqueness {
    async fn find_by_id(
        &self,
        organization_id: &str,
        id: Uuid,
    ) -> DatabaseResult<Option<UserProfile>> {
        IdentityStore::find_by_id(self.inner.as_ref(), organization_id, id).await
    }

    async fn find_by_ids(
        &self,
        organization_id: &str,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<UserProfile>> {
        IdentityStore::find_by_ids(self.inner.as_ref(), organization_id, ids).await
    }

    async fn find_by_unique_attributes(
        &self,
        _organization_id: &str,
        _candidates: &UniqueCandidates,
    ) -> DatabaseResult<Vec<UserProfile>> {
        Ok(Vec::new())
    }

    async fn list_by_organization(&self, organization_id: &str) -> DatabaseResult<Vec<UserProfile>> {
        self.inner.list_by_organization(organization_id).await
    }

    async fn save(&self, profile: &UserProfile) -> DatabaseResult<()> {
        self.inner.save(profile).await
    }
}

/// Delays the predicate query used to find overlapping manager job profiles
struct SlowOverlapQuery {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

#[async_trait]
impl JobProfileStore for SlowOverlapQuery {
    async fn insert(&self, profile: &JobProfile) -> DatabaseResult<()> {
        self.inner.insert(profile).await
    }

    async fn find_by_ids(
        &self,
        organization_id: &str,
        ids: &[Uuid],
    ) -> DatabaseResult<Vec<JobProfile>> {
        JobProfileStore::find_by_ids(self.inner.as_ref(), organization_id, ids).await
    }

    async fn find_by_organization(&self, organization_id: &str) -> DatabaseResult<Vec<JobProfile>> {
        self.inner.find_by_organization(organization_id).await
    }

    async fn find(&self, query: &JobProfileQuery) -> DatabaseResult<Vec<JobProfile>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find(query).await
    }
}

#[tokio::test]
async fn test_subordinate_appears_under_manager() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);

    let mut record = employment(date(2024, 1, 1), None, None);
    record.title = "Eng".to_string();
    record.reporting_manager_id = Some(String::new());
    let outcome = engine
        .create_user(ORG, create_request("alice", "5550001", vec![record]))
        .await;
    assert!(outcome.success);
    let summary = outcome.data.unwrap();
    assert_eq!(summary.status, UserStatus::Active);
    let alice = summary.id;
    assert_eq!(store.job_profile_count().await, 1);
    assert_eq!(store.relation_count().await, 0);

    let bob = create(
        &engine,
        create_request(
            "bob",
            "5550002",
            vec![employment(date(2024, 2, 1), None, Some(alice))],
        ),
    )
    .await;

    let alice_view = engine.get_user(ORG, alice).await.data.unwrap();
    let current = alice_view.current_job_profile.unwrap();
    assert_eq!(current.title, "Eng");
    assert_eq!(current.reportee_ids, vec![bob]);
    assert!(alice_view.previous_job_profiles.is_empty());

    let bob_view = engine.get_user(ORG, bob).await.data.unwrap();
    let bob_current = bob_view.current_job_profile.unwrap();
    assert_eq!(bob_current.reporting_manager_id, Some(alice));
    assert!(bob_current.reportee_ids.is_empty());
    assert_eq!(bob_view.start_date, date(2024, 2, 1));
    assert_eq!(store.relation_count().await, 1);
}

#[tokio::test]
async fn test_non_overlapping_manager_history_creates_no_edge() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);

    let alice = create(
        &engine,
        create_request(
            "alice",
            "5550001",
            vec![employment(date(2020, 1, 1), Some(date(2020, 12, 31)), None)],
        ),
    )
    .await;
    create(
        &engine,
        create_request(
            "bob",
            "5550002",
            vec![employment(date(2024, 3, 1), None, Some(alice))],
        ),
    )
    .await;

    assert_eq!(store.relation_count().await, 0);
    let alice_view = engine.get_user(ORG, alice).await.data.unwrap();
    assert!(alice_view.current_job_profile.unwrap().reportee_ids.is_empty());
}

#[tokio::test]
async fn test_duplicate_reports_exactly_the_colliding_attributes() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    create(&engine, create_request("alice", "5550001", Vec::new())).await;

    // same username and email, different phone
    let outcome = engine
        .create_user(ORG, create_request("alice", "5550009", Vec::new()))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(ErrorKind::DuplicateResource));
    assert_eq!(
        outcome.message,
        "Duplicate resource: username, email already in use"
    );
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_clash_caught_at_save_names_the_attribute() {
    let store = Arc::new(InMemoryStore::new());
    let stores = Stores {
        users: Arc::new(StaleUniqueness {
            inner: store.clone(),
        }),
        job_profiles: store.clone(),
        reportees: store.clone(),
    };
    let engine = IdentityEngine::new(stores, EngineConfig::default());
    create(&engine, create_request("alice", "5550001", Vec::new())).await;

    let mut again = create_request("alice", "5550002", Vec::new());
    again.email = "other@example.com".to_string();
    let outcome = engine.create_user(ORG, again).await;

    assert_eq!(outcome.reason, Some(ErrorKind::DuplicateResource));
    assert_eq!(
        outcome.message,
        "Duplicate resource: username already in use"
    );
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_same_values_in_another_organization_are_allowed() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    create(&engine, create_request("alice", "5550001", Vec::new())).await;

    let outcome = engine
        .create_user("org2", create_request("alice", "5550001", Vec::new()))
        .await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_update_with_own_values_does_not_conflict() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    let alice = create(&engine, create_request("alice", "5550001", Vec::new())).await;

    let update = UpdateUserRequest {
        username: Some("alice".to_string()),
        email: Some("alice@example.com".to_string()),
        ..Default::default()
    };
    let outcome = engine.update_user(ORG, alice, update).await;
    assert!(outcome.success, "{}", outcome.message);

    // the verified flag survives because the email did not change
    let view = engine.get_user(ORG, alice).await.data.unwrap();
    assert!(view.email_verified);
}

#[tokio::test]
async fn test_update_into_another_users_phone_conflicts() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    create(&engine, create_request("alice", "5550001", Vec::new())).await;
    let bob = create(&engine, create_request("bob", "5550002", Vec::new())).await;

    let update = UpdateUserRequest {
        phone: Some(Phone {
            number: "5550001".to_string(),
            country_code: "+1".to_string(),
        }),
        ..Default::default()
    };
    let outcome = engine.update_user(ORG, bob, update).await;
    assert_eq!(outcome.reason, Some(ErrorKind::DuplicateResource));
    assert_eq!(outcome.message, "Duplicate resource: phone already in use");
}

#[tokio::test]
async fn test_missing_manager_persists_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    let ghost = Uuid::new_v4();

    let outcome = engine
        .create_user(
            ORG,
            create_request(
                "bob",
                "5550002",
                vec![
                    employment(date(2024, 1, 1), Some(date(2024, 2, 1)), None),
                    employment(date(2024, 3, 1), None, Some(ghost)),
                ],
            ),
        )
        .await;

    assert_eq!(outcome.reason, Some(ErrorKind::ResourceNotFound));
    assert!(outcome.message.contains(&ghost.to_string()));
    assert_eq!(store.user_count().await, 0);
    assert_eq!(store.job_profile_count().await, 0);
    assert_eq!(store.relation_count().await, 0);
}

#[tokio::test]
async fn test_inverted_interval_is_invalid_input() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);

    let outcome = engine
        .create_user(
            ORG,
            create_request(
                "bob",
                "5550002",
                vec![employment(date(2024, 5, 1), Some(date(2024, 4, 1)), None)],
            ),
        )
        .await;

    assert_eq!(outcome.reason, Some(ErrorKind::InvalidInput));
    assert!(outcome.message.contains("employment[0]"));
    assert_eq!(store.job_profile_count().await, 0);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);

    let outcome = engine.get_user(ORG, Uuid::new_v4()).await;
    assert_eq!(outcome.reason, Some(ErrorKind::ResourceNotFound));
    assert!(outcome.data.is_none());
}

#[tokio::test]
async fn test_dangling_job_profile_reference_fails_the_read() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    let alice = create(
        &engine,
        create_request("alice", "5550001", vec![employment(date(2024, 1, 1), None, None)]),
    )
    .await;

    let mut profile = IdentityStore::find_by_id(store.as_ref(), ORG, alice)
        .await
        .unwrap()
        .unwrap();
    let bogus = Uuid::new_v4();
    profile.job_profile_ids.push(bogus);
    store.save(&profile).await.unwrap();

    let outcome = engine.get_user(ORG, alice).await;
    assert_eq!(outcome.reason, Some(ErrorKind::ResourceNotFound));
    assert!(outcome.message.contains(&bogus.to_string()));
}

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    let alice = create(
        &engine,
        create_request(
            "alice",
            "5550001",
            vec![
                employment(date(2022, 1, 1), Some(date(2023, 12, 31)), None),
                employment(date(2024, 1, 1), None, None),
            ],
        ),
    )
    .await;
    create(
        &engine,
        create_request(
            "bob",
            "5550002",
            vec![employment(date(2023, 6, 1), None, Some(alice))],
        ),
    )
    .await;

    let first = engine.get_user(ORG, alice).await.data.unwrap();
    let second = engine.get_user(ORG, alice).await.data.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.previous_job_profiles.len(), 1);
    // bob's stint overlaps both of alice's job profiles
    assert_eq!(first.current_job_profile.unwrap().reportee_ids.len(), 1);
    assert_eq!(first.previous_job_profiles[0].reportee_ids.len(), 1);
}

#[tokio::test]
async fn test_slow_edge_reads_degrade_to_empty_reportees() {
    let store = Arc::new(InMemoryStore::new());
    let fast = engine_for(&store);
    let alice = create(
        &fast,
        create_request("alice", "5550001", vec![employment(date(2024, 1, 1), None, None)]),
    )
    .await;
    create(
        &fast,
        create_request(
            "bob",
            "5550002",
            vec![employment(date(2024, 3, 1), None, Some(alice))],
        ),
    )
    .await;

    let stores = Stores {
        users: store.clone(),
        job_profiles: store.clone(),
        reportees: Arc::new(SlowReportees {
            inner: store.clone(),
            delay: Duration::from_millis(300),
            slow_reads: true,
            slow_writes: false,
        }),
    };
    let slow = IdentityEngine::new(
        stores,
        EngineConfig {
            worker_pool_size: 5,
            fanout_timeout: Duration::from_millis(20),
        },
    );

    let outcome = slow.get_user(ORG, alice).await;
    assert!(outcome.success);
    let view = outcome.data.unwrap();
    assert!(view.current_job_profile.unwrap().reportee_ids.is_empty());
}

#[tokio::test]
async fn test_slow_link_leaves_job_profile_unattached() {
    let store = Arc::new(InMemoryStore::new());
    let stores = Stores {
        users: store.clone(),
        job_profiles: store.clone(),
        reportees: Arc::new(SlowReportees {
            inner: store.clone(),
            delay: Duration::from_millis(300),
            slow_reads: false,
            slow_writes: true,
        }),
    };
    let engine = IdentityEngine::new(
        stores,
        EngineConfig {
            worker_pool_size: 5,
            fanout_timeout: Duration::from_millis(20),
        },
    );

    let alice = create(
        &engine,
        create_request("alice", "5550001", vec![employment(date(2024, 1, 1), None, None)]),
    )
    .await;
    let bob = create(
        &engine,
        create_request(
            "bob",
            "5550002",
            vec![employment(date(2024, 3, 1), None, Some(alice))],
        ),
    )
    .await;

    let bob_view = engine.get_user(ORG, bob).await.data.unwrap();
    assert!(bob_view.current_job_profile.is_none());
    // the timed-out write is not cancelled; its job profile row exists
    assert_eq!(store.job_profile_count().await, 2);
}

#[tokio::test]
async fn test_slow_manager_overlap_query_attaches_without_edges() {
    let store = Arc::new(InMemoryStore::new());
    let alice = create(
        &engine_for(&store),
        create_request("alice", "5550001", vec![employment(date(2024, 1, 1), None, None)]),
    )
    .await;

    let stores = Stores {
        users: store.clone(),
        job_profiles: Arc::new(SlowOverlapQuery {
            inner: store.clone(),
            delay: Duration::from_millis(300),
        }),
        reportees: store.clone(),
    };
    let engine = IdentityEngine::new(
        stores,
        EngineConfig {
            worker_pool_size: 5,
            fanout_timeout: Duration::from_millis(20),
        },
    );

    let outcome = engine
        .create_user(
            ORG,
            create_request(
                "bob",
                "5550002",
                vec![employment(date(2024, 2, 1), None, Some(alice))],
            ),
        )
        .await;
    assert!(outcome.success, "{}", outcome.message);
    let bob = outcome.data.unwrap().id;

    let bob_view = engine.get_user(ORG, bob).await.data.unwrap();
    let bob_current = bob_view.current_job_profile.unwrap();
    assert_eq!(bob_current.reporting_manager_id, Some(alice));
    assert_eq!(store.job_profile_count().await, 2);
    assert_eq!(store.relation_count().await, 0);
}

#[tokio::test]
async fn test_update_appends_employment() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    let alice = create(
        &engine,
        create_request(
            "alice",
            "5550001",
            vec![employment(date(2023, 1, 1), Some(date(2023, 12, 31)), None)],
        ),
    )
    .await;

    let update = UpdateUserRequest {
        first_name: Some("Alicia".to_string()),
        employment: vec![employment(date(2024, 1, 1), None, None)],
        ..Default::default()
    };
    let outcome = engine.update_user(ORG, alice, update).await;
    assert!(outcome.success, "{}", outcome.message);

    let view = engine.get_user(ORG, alice).await.data.unwrap();
    assert_eq!(view.first_name, "Alicia");
    assert_eq!(view.start_date, date(2023, 1, 1));
    assert_eq!(
        view.current_job_profile.unwrap().start_date,
        date(2024, 1, 1)
    );
    assert_eq!(view.previous_job_profiles.len(), 1);
}

#[tokio::test]
async fn test_user_cannot_report_to_themselves() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    let alice = create(&engine, create_request("alice", "5550001", Vec::new())).await;

    let update = UpdateUserRequest {
        employment: vec![employment(date(2024, 1, 1), None, Some(alice))],
        ..Default::default()
    };
    let outcome = engine.update_user(ORG, alice, update).await;
    assert_eq!(outcome.reason, Some(ErrorKind::InvalidInput));
    assert_eq!(store.job_profile_count().await, 0);
}

#[tokio::test]
async fn test_deactivate_marks_user_inactive() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    let alice = create(&engine, create_request("alice", "5550001", Vec::new())).await;

    let outcome = engine
        .deactivate_user(ORG, alice, Some(date(2025, 6, 30)))
        .await;
    assert!(outcome.success);
    assert_eq!(outcome.data.unwrap().status, UserStatus::Inactive);

    let view = engine.get_user(ORG, alice).await.data.unwrap();
    assert_eq!(view.status, UserStatus::Inactive);
    assert_eq!(view.end_date, Some(date(2025, 6, 30)));

    let today = Utc::now().date_naive();
    let again = engine.deactivate_user(ORG, alice, None).await;
    assert!(again.success);
    let view = engine.get_user(ORG, alice).await.data.unwrap();
    assert!(view.end_date.unwrap() >= today);
}

#[tokio::test]
async fn test_failed_save_leaves_linked_rows_behind() {
    let store = Arc::new(InMemoryStore::new());
    let alice = create(
        &engine_for(&store),
        create_request("alice", "5550001", vec![employment(date(2024, 1, 1), None, None)]),
    )
    .await;

    let stores = Stores {
        users: Arc::new(FailingSaves {
            inner: store.clone(),
        }),
        job_profiles: store.clone(),
        reportees: store.clone(),
    };
    let engine = IdentityEngine::new(stores, EngineConfig::default());

    let outcome = engine
        .create_user(
            ORG,
            create_request(
                "bob",
                "5550002",
                vec![employment(date(2024, 3, 1), None, Some(alice))],
            ),
        )
        .await;

    assert_eq!(outcome.reason, Some(ErrorKind::Internal));
    assert_eq!(store.user_count().await, 1);
    // nothing rolls back the job profile and edge written before the save
    assert_eq!(store.job_profile_count().await, 2);
    assert_eq!(store.relation_count().await, 1);
}

#[tokio::test]
async fn test_list_projects_requested_fields() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_for(&store);
    create(&engine, create_request("alice", "5550001", Vec::new())).await;
    create(&engine, create_request("bob", "5550002", Vec::new())).await;

    let outcome = engine
        .list_users(ORG, &["username".to_string(), "status".to_string()])
        .await;
    let mut rows = outcome.data.unwrap();
    rows.sort_by_key(|row| row["username"].as_str().map(str::to_string));

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0]["username"], json!("alice"));
    assert_eq!(rows[1]["status"], json!("Active"));

    let bad = engine.list_users(ORG, &["salary".to_string()]).await;
    assert_eq!(bad.reason, Some(ErrorKind::InvalidInput));
}
