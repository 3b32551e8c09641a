//! End-to-end report and scheduling scenarios against the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use congregate_core::models::{
    AttendanceSheet, DateWindow, Member, OrgAssignment, PeriodOwner, ServicePeriodInput, SheetKind,
    SheetRow, SubEntity, SubEntityKind,
};
use congregate_core::notify::LogNotifier;
use congregate_core::report::{ReportError, ReportRequest, ReportService, ReportSettings};
use congregate_core::scheduler::{PeriodField, ScheduleError, Scheduler};
use congregate_core::scope::{Caller, MemberSortColumn, ReportSession, Role, StatusFilter};
use congregate_core::store::{Dataset, MemoryStore};

const ADMIN_ID: i64 = 1;
const TRIBE_MANAGER_ID: i64 = 2;
const NEWCOMER_ID: i64 = 10;
const VETERAN_ID: i64 = 11;
const SPLIT_ID: i64 = 12;
const OUTSIDER_ID: i64 = 13;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

fn at(m: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, m, day, 9, 30, 0).unwrap()
}

fn member(id: i64, name: &str, created_at: DateTime<Utc>, tribe_id: Option<i64>) -> Member {
    Member {
        id,
        name: name.to_string(),
        phone: Some(format!("+243 81 000 00{}", id)),
        created_at,
        assignment: OrgAssignment {
            tribe_id,
            ..OrgAssignment::default()
        },
    }
}

fn row(member_id: i64, date: NaiveDate, present: bool, service: Option<bool>) -> SheetRow {
    SheetRow {
        member_id,
        date,
        present,
        service_present: service,
        meeting_present: None,
    }
}

fn june() -> DateWindow {
    DateWindow::new(d(6, 1), d(6, 30))
}

fn dataset() -> Dataset {
    Dataset {
        members: vec![
            member(ADMIN_ID, "Pastor Admin", at(1, 1), None),
            member(TRIBE_MANAGER_ID, "Judith Manager", at(1, 1), Some(100)),
            member(NEWCOMER_ID, "Esther Newcomer", at(6, 15), Some(100)),
            member(VETERAN_ID, "Samuel Veteran", at(5, 1), Some(100)),
            member(SPLIT_ID, "Miriam Split", at(6, 3), None),
            member(OUTSIDER_ID, "Late Arrival", at(7, 2), Some(100)),
        ],
        sub_entities: vec![
            SubEntity {
                id: 100,
                kind: SubEntityKind::Tribe,
                name: "Judah".to_string(),
                manager_id: TRIBE_MANAGER_ID,
                assistant_manager_ids: vec![],
            },
            SubEntity {
                id: 200,
                kind: SubEntityKind::Tribe,
                name: "Levi".to_string(),
                manager_id: ADMIN_ID,
                assistant_manager_ids: vec![],
            },
        ],
        sheets: vec![
            AttendanceSheet {
                id: 1,
                kind: SheetKind::Gathering,
                span: june(),
                rows: vec![
                    row(NEWCOMER_ID, d(6, 16), true, Some(true)),
                    row(NEWCOMER_ID, d(6, 23), false, None),
                    row(VETERAN_ID, d(5, 5), true, None),
                    row(VETERAN_ID, d(5, 12), true, None),
                    row(VETERAN_ID, d(6, 9), false, Some(false)),
                ],
            },
            AttendanceSheet {
                id: 2,
                kind: SheetKind::CrossEntity,
                span: DateWindow::new(d(6, 9), d(6, 9)),
                rows: vec![row(VETERAN_ID, d(6, 9), true, None)],
            },
        ],
        service_periods: vec![],
    }
}

fn admin() -> Caller {
    Caller {
        member_id: ADMIN_ID,
        role: Role::Administrator,
        assignment: OrgAssignment::default(),
    }
}

fn request(caller: Caller, status: StatusFilter) -> ReportRequest {
    ReportRequest {
        caller,
        window: june(),
        status,
        query: String::new(),
        take: 50,
        sort_column: MemberSortColumn::Name,
        ascending: true,
    }
}

fn service() -> ReportService<MemoryStore> {
    ReportService::new(Arc::new(MemoryStore::new(dataset())), ReportSettings::default())
}

#[tokio::test]
async fn new_filter_keeps_members_created_inside_window() {
    let report = service()
        .attendance_report(&request(admin(), StatusFilter::New), &mut ReportSession::new())
        .await
        .unwrap();

    let ids: Vec<i64> = report.views.iter().map(|v| v.member.id).collect();
    assert!(ids.contains(&NEWCOMER_ID));
    assert!(ids.contains(&SPLIT_ID));
    assert!(!ids.contains(&VETERAN_ID));
    assert!(!ids.contains(&OUTSIDER_ID));
    assert_eq!(report.total_matching_member_count, 2);

    let newcomer = report.views.iter().find(|v| v.member.id == NEWCOMER_ID).unwrap();
    let resume = newcomer.current_resume.unwrap();
    assert_eq!(resume.occurrence_count, 2);
    assert_eq!(resume.attendance_count, 1);
    assert_eq!(resume.service_attendance_count, 1);
    assert!(newcomer.previous_resume.is_none());
    assert!(newcomer.previous_regularity.is_none());

    // All five June Sundays are listed, unrecorded ones as None
    let recorded: Vec<Option<bool>> = newcomer.occurrences.iter().map(|o| o.present).collect();
    assert_eq!(recorded, vec![None, None, Some(true), Some(false), None]);
}

#[tokio::test]
async fn member_without_data_has_no_resume() {
    let report = service()
        .attendance_report(&request(admin(), StatusFilter::New), &mut ReportSession::new())
        .await
        .unwrap();

    let split = report.views.iter().find(|v| v.member.id == SPLIT_ID).unwrap();
    assert!(split.current_resume.is_none());
    assert!(split.current_regularity.is_none());
    assert_eq!(report.regularity_breakdown.no_data, 1);
}

#[tokio::test]
async fn cross_source_presence_is_merged_and_flagged() {
    let report = service()
        .attendance_report(&request(admin(), StatusFilter::Old), &mut ReportSession::new())
        .await
        .unwrap();

    let veteran = report.views.iter().find(|v| v.member.id == VETERAN_ID).unwrap();
    let june_9 = veteran.occurrences.iter().find(|o| o.date == d(6, 9)).unwrap();
    assert_eq!(june_9.present, Some(true));
    assert!(june_9.has_conflict);
    assert_eq!(june_9.service_present, Some(false));

    let current = veteran.current_resume.unwrap();
    assert_eq!(current.attendance_count, 1);
    assert_eq!(current.occurrence_count, 1);

    let previous = veteran.previous_resume.unwrap();
    assert_eq!(previous.attendance_count, 2);
    assert_eq!(previous.occurrence_count, 2);
}

#[tokio::test]
async fn tribe_manager_sees_only_own_tribe() {
    let caller = Caller {
        member_id: TRIBE_MANAGER_ID,
        role: Role::TribeManager,
        assignment: OrgAssignment {
            tribe_id: Some(100),
            ..OrgAssignment::default()
        },
    };
    let report = service()
        .attendance_report(&request(caller, StatusFilter::All), &mut ReportSession::new())
        .await
        .unwrap();

    let mut ids: Vec<i64> = report.views.iter().map(|v| v.member.id).collect();
    ids.sort();
    assert_eq!(ids, vec![TRIBE_MANAGER_ID, NEWCOMER_ID, VETERAN_ID]);
}

#[tokio::test]
async fn manager_of_another_tribe_sees_nothing() {
    // Claims tribe 100 but does not run it
    let caller = Caller {
        member_id: VETERAN_ID,
        role: Role::TribeManager,
        assignment: OrgAssignment {
            tribe_id: Some(100),
            ..OrgAssignment::default()
        },
    };
    let report = service()
        .attendance_report(&request(caller, StatusFilter::All), &mut ReportSession::new())
        .await
        .unwrap();
    assert!(report.views.is_empty());
    assert_eq!(report.total_matching_member_count, 0);
}

#[tokio::test]
async fn unknown_role_fails_closed() {
    let caller = Caller {
        member_id: ADMIN_ID,
        role: Role::from_tag("root"),
        assignment: OrgAssignment::default(),
    };
    let report = service()
        .attendance_report(&request(caller, StatusFilter::All), &mut ReportSession::new())
        .await
        .unwrap();
    assert!(report.views.is_empty());
    assert_eq!(report.total_matching_member_count, 0);
}

#[tokio::test]
async fn cumulative_take_reveals_more_rows() {
    let service = service();
    let mut session = ReportSession::new();

    let mut first = request(admin(), StatusFilter::All);
    first.take = 2;
    let report = service.attendance_report(&first, &mut session).await.unwrap();
    assert_eq!(report.views.len(), 2);
    assert_eq!(report.total_matching_member_count, 5);

    let mut more = first.clone();
    more.take = 4;
    let report = service.attendance_report(&more, &mut session).await.unwrap();
    assert_eq!(report.views.len(), 4);

    let mut smaller = first.clone();
    smaller.take = 1;
    let report = service.attendance_report(&smaller, &mut session).await.unwrap();
    assert_eq!(report.views.len(), 4);
}

#[tokio::test]
async fn free_text_query_matches_name_and_phone() {
    let service = service();
    let mut by_name = request(admin(), StatusFilter::All);
    by_name.query = "  ESTHER ".to_string();
    let report = service.attendance_report(&by_name, &mut ReportSession::new()).await.unwrap();
    assert_eq!(report.views.len(), 1);
    assert_eq!(report.views[0].member.id, NEWCOMER_ID);

    let mut by_phone = request(admin(), StatusFilter::All);
    by_phone.query = "0011".to_string();
    let report = service.attendance_report(&by_phone, &mut ReportSession::new()).await.unwrap();
    assert_eq!(report.views.len(), 1);
    assert_eq!(report.views[0].member.id, VETERAN_ID);
}

#[tokio::test]
async fn inverted_window_is_rejected() {
    let mut bad = request(admin(), StatusFilter::All);
    bad.window = DateWindow::new(d(6, 30), d(6, 1));
    assert!(service().attendance_report(&bad, &mut ReportSession::new()).await.is_err());
}

#[tokio::test]
async fn window_at_calendar_limit_is_rejected() {
    let mut far = request(admin(), StatusFilter::All);
    far.window = DateWindow::new(d(6, 1), NaiveDate::MAX);
    let result = service().attendance_report(&far, &mut ReportSession::new()).await;
    assert!(matches!(result, Err(ReportError::OutOfRange(_))));
}

#[tokio::test]
async fn duplicate_service_window_per_tribe() {
    let store = Arc::new(MemoryStore::new(dataset()));
    let scheduler = Scheduler::new(Arc::clone(&store), LogNotifier);
    let july = DateWindow::new(d(7, 1), d(7, 31));

    scheduler
        .create(ServicePeriodInput { owner: PeriodOwner::Tribe(100), window: july })
        .await
        .unwrap();

    let err = scheduler
        .create(ServicePeriodInput { owner: PeriodOwner::Tribe(100), window: july })
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation { field: PeriodField::From, .. }));

    let other = scheduler
        .create(ServicePeriodInput { owner: PeriodOwner::Tribe(200), window: july })
        .await;
    assert!(other.is_ok());

    assert_eq!(store.dataset().await.service_periods.len(), 2);
}

#[tokio::test]
async fn sample_snapshot_loads_and_reports() {
    use congregate_core::store::Snapshot;

    let snapshot: Snapshot<Dataset> =
        serde_json::from_str(include_str!("../../../demos/sample-data.json")).unwrap();
    assert_eq!(snapshot.data.members.len(), 5);

    let service = ReportService::new(Arc::new(MemoryStore::new(snapshot.data)), ReportSettings::default());
    let report = service
        .attendance_report(&request(admin(), StatusFilter::All), &mut ReportSession::new())
        .await
        .unwrap();
    assert_eq!(report.total_matching_member_count, 5);

    let samuel = report.views.iter().find(|v| v.member.name == "Samuel Ilunga").unwrap();
    let june_9 = samuel.occurrences.iter().find(|o| o.date == d(6, 9)).unwrap();
    assert!(june_9.has_conflict);
    assert_eq!(june_9.present, Some(true));
}
