//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use aula_core::{
  attendance::AttendancePolicy,
  school::{Course, NewCourse, NewStudent, NewSubject, Student, Subject},
  staff::{Actor, NewStaff, Role, Staff},
  store::SchoolStore,
};
use aula_store_sqlite::SqliteStore;
use axum::{
  Extension, Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
  response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

struct Fixture {
  store:       Arc<SqliteStore>,
  coordinator: Staff,
  teacher_x:   Staff,
  teacher_z:   Staff,
  course:      Course,
  subject:     Subject,
  student:     Student,
}

async fn add_staff(store: &SqliteStore, username: &str, role: Role) -> Staff {
  store
    .add_staff(NewStaff {
      username:      username.into(),
      full_name:     format!("{username} full"),
      national_id:   None,
      role,
      is_superuser:  false,
      password_hash: "$argon2id$placeholder".into(),
    })
    .await
    .unwrap()
}

async fn fixture() -> Fixture {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let coordinator = add_staff(&store, "utp", Role::Coordinator).await;
  let teacher_x = add_staff(&store, "xavier", Role::Teacher).await;
  let teacher_z = add_staff(&store, "zoe", Role::Teacher).await;

  let course = store
    .add_course(NewCourse {
      year:         "2025".into(),
      name:         "1° Medio".into(),
      room:         "B".into(),
      lead_teacher: None,
    })
    .await
    .unwrap();
  let subject = store
    .add_subject(NewSubject {
      course_id:   course.course_id,
      teacher_id:  teacher_x.staff_id,
      name:        "Historia".into(),
      description: String::new(),
    })
    .await
    .unwrap();
  let student = store
    .add_student(NewStudent {
      national_id:       "12.345.678-5".into(),
      given_names:       "Ana".into(),
      family_names:      "Pérez".into(),
      birth_date:        None,
      emergency_contact: None,
      course_id:         Some(course.course_id),
    })
    .await
    .unwrap();

  Fixture {
    store: Arc::new(store),
    coordinator,
    teacher_x,
    teacher_z,
    course,
    subject,
    student,
  }
}

fn app(f: &Fixture, as_staff: &Staff) -> Router {
  api_router(f.store.clone(), AttendancePolicy::default()).layer(Extension(Actor::from(as_staff)))
}

async fn send(
  app: Router,
  method: &str,
  uri: &str,
  headers: Vec<(header::HeaderName, String)>,
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  app.oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn gradebook_uri(f: &Fixture) -> String {
  format!("/gradebook/{}/{}", f.course.course_id, f.subject.subject_id)
}

// ── Administration ──────────────────────────────────────────────────────────

#[tokio::test]
async fn only_coordinators_create_courses() {
  let f = fixture().await;
  let body = json!({ "year": "2025", "name": "2° Medio", "room": "C" });

  let resp = send(app(&f, &f.teacher_x), "POST", "/courses", vec![], Some(body.clone())).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(app(&f, &f.coordinator), "POST", "/courses", vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let dup = json!({ "year": "2025", "name": "2° MEDIO", "room": "c" });
  let resp = send(app(&f, &f.coordinator), "POST", "/courses", vec![], Some(dup)).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn course_creation_is_audited() {
  let f = fixture().await;
  let body = json!({ "year": "2026", "name": "3° Medio", "room": "D" });
  let resp = send(app(&f, &f.coordinator), "POST", "/courses", vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp = send(app(&f, &f.teacher_x), "GET", "/audit", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp =
    send(app(&f, &f.coordinator), "GET", "/audit?entity_kind=course", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let entries = json_body(resp).await;
  let entries = entries.as_array().unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0]["action"], "create");
  assert_eq!(entries[0]["entity_repr"], "2026 3° Medio (D)");
}

#[tokio::test]
async fn invalid_national_id_is_a_bad_request() {
  let f = fixture().await;
  let body = json!({
    "national_id": "12345",
    "given_names": "Luis",
    "family_names": "Soto",
  });
  let resp = send(app(&f, &f.teacher_x), "POST", "/students", vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_superusers_create_superusers() {
  let f = fixture().await;
  let body = json!({
    "username": "root2",
    "role": "admin",
    "is_superuser": true,
    "password": "pw",
  });
  let resp = send(app(&f, &f.coordinator), "POST", "/staff", vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn created_staff_hides_the_password_hash() {
  let f = fixture().await;
  let body = json!({ "username": "mrojas", "role": "teacher", "password": "pw" });
  let resp = send(app(&f, &f.coordinator), "POST", "/staff", vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let staff = json_body(resp).await;
  assert!(staff.get("password_hash").is_none());

  let stored = f.store.find_staff_by_username("MROJAS".into()).await.unwrap().unwrap();
  assert!(crate::password::verify_password("pw", &stored.password_hash));
}

// ── Edits ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn course_rename_checks_identity_and_is_audited() {
  let f = fixture().await;
  let uri = format!("/courses/{}", f.course.course_id);
  let other = json!({ "year": "2025", "name": "2° Medio", "room": "B" });
  let resp = send(app(&f, &f.coordinator), "POST", "/courses", vec![], Some(other)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let clash = json!({ "year": "2025", "name": "2° MEDIO", "room": "b" });
  let resp = send(app(&f, &f.teacher_x), "PUT", &uri, vec![], Some(clash.clone())).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let resp = send(app(&f, &f.coordinator), "PUT", &uri, vec![], Some(clash)).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let rename = json!({ "year": "2025", "name": "1° Medio", "room": "C" });
  let resp = send(app(&f, &f.coordinator), "PUT", &uri, vec![], Some(rename)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["room"], "C");

  let resp =
    send(app(&f, &f.coordinator), "GET", "/audit?action=update", vec![], None).await;
  let entries = json_body(resp).await;
  assert_eq!(entries[0]["summary"], "Renamed course 2025 1° Medio (B) to 2025 1° Medio (C)");
}

#[tokio::test]
async fn subject_and_student_edits() {
  let f = fixture().await;
  let subject_uri = format!("/subjects/{}", f.subject.subject_id);
  let body = json!({ "name": "Historia y Geografía", "description": "Ciencias sociales" });
  let resp = send(app(&f, &f.coordinator), "PUT", &subject_uri, vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["name"], "Historia y Geografía");

  let other = json!({
    "national_id": "9.876.543-k",
    "given_names": "Luis",
    "family_names": "Soto",
  });
  let resp = send(app(&f, &f.teacher_z), "POST", "/students", vec![], Some(other)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let student_uri = format!("/students/{}", f.student.student_id);
  let taken = json!({
    "national_id": "9.876.543-K",
    "given_names": "Ana",
    "family_names": "Pérez",
  });
  let resp = send(app(&f, &f.teacher_z), "PUT", &student_uri, vec![], Some(taken)).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let fixed = json!({
    "national_id": "12.345.678-5",
    "given_names": "Ana María",
    "family_names": "Pérez",
    "emergency_contact": "+56 9 8765 4321",
  });
  let resp = send(app(&f, &f.teacher_z), "PUT", &student_uri, vec![], Some(fixed)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let student = json_body(resp).await;
  assert_eq!(student["given_names"], "Ana María");
  assert_eq!(student["course_id"], json!(f.course.course_id));
}

#[tokio::test]
async fn staff_edits_and_deletion() {
  let f = fixture().await;
  let z_uri = format!("/staff/{}", f.teacher_z.staff_id);

  let taken = json!({ "username": "XAVIER", "role": "teacher" });
  let resp = send(app(&f, &f.coordinator), "PUT", &z_uri, vec![], Some(taken)).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let promote = json!({ "username": "zoe", "role": "teacher", "is_superuser": true });
  let resp = send(app(&f, &f.coordinator), "PUT", &z_uri, vec![], Some(promote)).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let edit = json!({ "username": "zvidal", "full_name": "Zoe Vidal", "role": "inspector" });
  let resp = send(app(&f, &f.coordinator), "PUT", &z_uri, vec![], Some(edit)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let staff = json_body(resp).await;
  assert_eq!(staff["role"], "inspector");
  assert!(staff.get("password_hash").is_none());

  // Xavier still teaches Historia.
  let x_uri = format!("/staff/{}", f.teacher_x.staff_id);
  let resp = send(app(&f, &f.coordinator), "DELETE", &x_uri, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let own = format!("/staff/{}", f.coordinator.staff_id);
  let resp = send(app(&f, &f.coordinator), "DELETE", &own, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(app(&f, &f.coordinator), "DELETE", &z_uri, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  assert!(f.store.get_staff(f.teacher_z.staff_id).await.unwrap().is_none());
}

#[tokio::test]
async fn passwords_change_by_owner_or_coordinator() {
  let f = fixture().await;
  let x_uri = format!("/staff/{}/password", f.teacher_x.staff_id);

  let body = json!({ "password": "nueva" });
  let resp = send(app(&f, &f.teacher_z), "PUT", &x_uri, vec![], Some(body.clone())).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(app(&f, &f.teacher_x), "PUT", &x_uri, vec![], Some(json!({ "password": "" })))
    .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(app(&f, &f.teacher_x), "PUT", &x_uri, vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  let stored = f.store.get_staff(f.teacher_x.staff_id).await.unwrap().unwrap();
  assert!(crate::password::verify_password("nueva", &stored.password_hash));

  let z_uri = format!("/staff/{}/password", f.teacher_z.staff_id);
  let resp =
    send(app(&f, &f.coordinator), "PUT", &z_uri, vec![], Some(json!({ "password": "reset" })))
      .await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp =
    send(app(&f, &f.coordinator), "GET", "/audit?entity_kind=staff", vec![], None).await;
  let entries = json_body(resp).await;
  let summaries: Vec<_> =
    entries.as_array().unwrap().iter().map(|e| e["summary"].as_str().unwrap()).collect();
  assert!(summaries.contains(&"xavier changed their password"));
  assert!(summaries.contains(&"Reset the password of zoe"));
}

// ── Visibility ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn teachers_only_see_their_subjects() {
  let f = fixture().await;
  let uri = format!("/courses/{}/subjects", f.course.course_id);

  let resp = send(app(&f, &f.teacher_x), "GET", &uri, vec![], None).await;
  assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

  let resp = send(app(&f, &f.teacher_z), "GET", &uri, vec![], None).await;
  assert!(json_body(resp).await.as_array().unwrap().is_empty());

  // Making Z the lead teacher opens every subject of the course.
  let lead_uri = format!("/courses/{}/lead-teacher", f.course.course_id);
  let body = json!({ "teacher_id": f.teacher_z.staff_id });
  let resp = send(app(&f, &f.coordinator), "PUT", &lead_uri, vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = send(app(&f, &f.teacher_z), "GET", &uri, vec![], None).await;
  assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
}

// ── Gradebook ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn gradebook_is_read_only_without_edit_permission() {
  let f = fixture().await;
  let resp = send(app(&f, &f.teacher_z), "GET", &gradebook_uri(&f), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let etag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();
  let book = json_body(resp).await;
  assert_eq!(book["can_edit"], false);
  assert_eq!(book["rows"].as_array().unwrap().len(), 1);

  let sid = f.student.student_id;
  let body = json!({ "values": { format!("slot_{sid}_1"): "6.0" } });
  let resp =
    send(app(&f, &f.teacher_z), "POST", &gradebook_uri(&f), vec![], Some(body.clone())).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let resp = send(
    app(&f, &f.teacher_z),
    "POST",
    &gradebook_uri(&f),
    vec![(header::IF_MATCH, etag)],
    Some(body),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert!(f.store.grades_for_subject(f.subject.subject_id).await.unwrap().is_empty());

  let resp = send(app(&f, &f.teacher_x), "GET", &gradebook_uri(&f), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(resp.headers().contains_key(header::ETAG));
  let book = json_body(resp).await;
  assert_eq!(book["rows"].as_array().unwrap().len(), 1);
  assert_eq!(book["can_edit"], true);
}

#[tokio::test]
async fn batch_save_reports_skipped_cells() {
  let f = fixture().await;
  let sid = f.student.student_id;
  let elsewhere = f
    .store
    .add_student(NewStudent {
      national_id:       "7.654.321-6".into(),
      given_names:       "Luis".into(),
      family_names:      "Rivas".into(),
      birth_date:        None,
      emergency_contact: None,
      course_id:         None,
    })
    .await
    .unwrap()
    .student_id;
  let body = json!({ "values": {
    format!("slot_{sid}_1"): "5,5",
    format!("slot_{sid}_2"): "abc",
    format!("slot_{sid}_3"): "8",
    format!("slot_{sid}_4"): "",
    format!("slot_{elsewhere}_1"): "6",
    "csrf_token": "ignored",
  }});

  let resp = send(app(&f, &f.teacher_x), "POST", &gradebook_uri(&f), vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let report = json_body(resp).await;
  assert_eq!(report["accepted"], 1);
  assert_eq!(report["skipped"].as_array().unwrap().len(), 3);
  assert_eq!(report["message"], "1 change saved");

  let grades = f.store.grades_for_subject(f.subject.subject_id).await.unwrap();
  assert_eq!(grades.len(), 1);
  assert!((grades[0].value - 5.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn batch_naming_an_unknown_student_is_not_found() {
  let f = fixture().await;
  let sid = f.student.student_id;
  let ghost = uuid::Uuid::new_v4();
  let body = json!({ "values": {
    format!("slot_{sid}_1"): "6.0",
    format!("slot_{ghost}_1"): "5.0",
  }});

  let resp = send(app(&f, &f.teacher_x), "POST", &gradebook_uri(&f), vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert!(f.store.grades_for_subject(f.subject.subject_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn stale_if_match_is_rejected() {
  let f = fixture().await;
  let sid = f.student.student_id;

  let resp = send(app(&f, &f.teacher_x), "GET", &gradebook_uri(&f), vec![], None).await;
  let etag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();

  let first = json!({ "values": { format!("slot_{sid}_1"): "4.0" } });
  let resp = send(
    app(&f, &f.teacher_x),
    "POST",
    &gradebook_uri(&f),
    vec![(header::IF_MATCH, etag.clone())],
    Some(first),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let fresh = resp.headers()[header::ETAG].to_str().unwrap().to_owned();
  assert_ne!(fresh, etag);

  let second = json!({ "values": { format!("slot_{sid}_1"): "7.0" } });
  let resp = send(
    app(&f, &f.coordinator),
    "POST",
    &gradebook_uri(&f),
    vec![(header::IF_MATCH, etag)],
    Some(second),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

  let grades = f.store.grades_for_subject(f.subject.subject_id).await.unwrap();
  assert!((grades[0].value - 4.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn subject_from_another_course_is_not_found() {
  let f = fixture().await;
  let uri = format!("/gradebook/{}/{}", uuid::Uuid::new_v4(), f.subject.subject_id);
  let resp = send(app(&f, &f.coordinator), "GET", &uri, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Attendance ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_day_skips_students_outside_the_course() {
  let f = fixture().await;
  let uri = format!("/courses/{}/attendance", f.course.course_id);
  let outsider = uuid::Uuid::new_v4();
  let body = json!({
    "date": "2025-03-10",
    "statuses": {
      f.student.student_id.to_string(): "Presente",
      outsider.to_string(): "present",
    },
  });

  let resp = send(app(&f, &f.teacher_z), "POST", &uri, vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let result = json_body(resp).await;
  assert_eq!(result["saved"], 1);
  assert_eq!(result["skipped"].as_array().unwrap().len(), 1);

  let summary_uri = format!("/students/{}/attendance", f.student.student_id);
  let resp = send(app(&f, &f.teacher_z), "GET", &summary_uri, vec![], None).await;
  let summary = json_body(resp).await;
  assert_eq!(summary["total"], 1);
  assert_eq!(summary["percentage"], 100.0);

  let resp = send(app(&f, &f.teacher_z), "GET", &format!("{uri}/history"), vec![], None).await;
  let history = json_body(resp).await;
  assert_eq!(history[0]["date"], "2025-03-10");
}

// ── Notes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_author_or_a_coordinator_deletes_notes() {
  let f = fixture().await;
  let uri = format!("/students/{}/notes", f.student.student_id);
  let resp = send(
    app(&f, &f.teacher_x),
    "POST",
    &uri,
    vec![],
    Some(json!({ "text": "Participa activamente." })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let note_id = json_body(resp).await["note_id"].as_str().unwrap().to_owned();
  let note_uri = format!("/notes/{note_id}");

  let resp = send(app(&f, &f.teacher_z), "DELETE", &note_uri, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(app(&f, &f.teacher_x), "DELETE", &note_uri, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = send(app(&f, &f.teacher_x), "DELETE", &note_uri, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn student_report_renders_markdown() {
  let f = fixture().await;
  let uri = format!("/reports/students/{}?format=markdown", f.student.student_id);
  let resp = send(app(&f, &f.teacher_z), "GET", &uri, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(
    resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/markdown")
  );
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let text = String::from_utf8(bytes.to_vec()).unwrap();
  assert!(text.starts_with("# Progress report: Ana Pérez"));
  assert!(text.contains("| Historia |"));
}

#[tokio::test]
async fn unknown_student_report_is_not_found() {
  let f = fixture().await;
  let uri = format!("/reports/students/{}", uuid::Uuid::new_v4());
  let resp = send(app(&f, &f.coordinator), "GET", &uri, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
