//! [`SqliteStore`], the SQLite implementation of [`SchoolStore`].

use std::path::Path;

use aula_core::{
  attendance::{AttendanceQuery, AttendanceRecord, NewAttendance},
  audit::{AuditEntry, AuditQuery, NewAuditEntry},
  grade::{Grade, GradeWrite, UpsertOutcome},
  school::{
    Course, CourseEdit, NewCourse, NewNote, NewStudent, NewSubject, Note, Student, StudentEdit,
    Subject, SubjectEdit, grade_level_key,
  },
  staff::{NewStaff, Staff, StaffEdit},
  store::SchoolStore,
};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    ATTENDANCE_COLUMNS, AUDIT_COLUMNS, COURSE_COLUMNS, GRADE_COLUMNS, NOTE_COLUMNS, RawAttendance,
    RawAudit, RawCourse, RawGrade, RawNote, RawStaff, RawStudent, RawSubject, STAFF_COLUMNS,
    STUDENT_COLUMNS, SUBJECT_COLUMNS, encode_date, encode_dt, encode_uuid, fold_key, now,
  },
  schema::SCHEMA,
};

type FromRow<T> = for<'r> fn(&rusqlite::Row<'r>) -> rusqlite::Result<T>;

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn opt_uuid(id: Option<Uuid>) -> Value { id.map_or(Value::Null, |id| text(encode_uuid(id))) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A school store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a single-row query; `None` when nothing matches.
  async fn fetch_optional<T: Send + 'static>(
    &self,
    sql: String,
    params: Vec<Value>,
    from_row: FromRow<T>,
  ) -> Result<Option<T>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), from_row).optional()?)
        })
        .await?,
    )
  }

  async fn fetch_all<T: Send + 'static>(
    &self,
    sql: String,
    params: Vec<Value>,
    from_row: FromRow<T>,
  ) -> Result<Vec<T>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(rusqlite::params_from_iter(params), from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  /// Execute one statement and return the number of affected rows.
  async fn execute(&self, sql: &'static str, params: Vec<Value>) -> Result<usize> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(conn.execute(sql, rusqlite::params_from_iter(params))?))
        .await?,
    )
  }
}

// ─── SchoolStore impl ────────────────────────────────────────────────────────

impl SchoolStore for SqliteStore {
  type Error = crate::Error;

  // ── Staff ─────────────────────────────────────────────────────────────────

  async fn add_staff(&self, input: NewStaff) -> Result<Staff> {
    let staff = Staff {
      staff_id:      Uuid::new_v4(),
      username:      input.username.trim().to_owned(),
      full_name:     input.full_name.trim().to_owned(),
      national_id:   input.national_id,
      role:          input.role,
      is_superuser:  input.is_superuser,
      password_hash: input.password_hash,
      created_at:    now(),
    };

    self
      .execute(
        "INSERT INTO staff (
           staff_id, username, full_name, national_id, role, is_superuser,
           password_hash, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        vec![
          text(encode_uuid(staff.staff_id)),
          text(staff.username.clone()),
          text(staff.full_name.clone()),
          staff.national_id.clone().map_or(Value::Null, text),
          text(staff.role.to_string()),
          Value::Integer(i64::from(staff.is_superuser)),
          text(staff.password_hash.clone()),
          text(encode_dt(staff.created_at)),
        ],
      )
      .await?;

    Ok(staff)
  }

  async fn get_staff(&self, id: Uuid) -> Result<Option<Staff>> {
    self
      .fetch_optional(
        format!("SELECT {STAFF_COLUMNS} FROM staff WHERE staff_id = ?1"),
        vec![text(encode_uuid(id))],
        RawStaff::from_row,
      )
      .await?
      .map(RawStaff::into_staff)
      .transpose()
  }

  async fn find_staff_by_username(&self, username: String) -> Result<Option<Staff>> {
    self
      .fetch_optional(
        format!("SELECT {STAFF_COLUMNS} FROM staff WHERE username = ?1"),
        vec![text(username.trim())],
        RawStaff::from_row,
      )
      .await?
      .map(RawStaff::into_staff)
      .transpose()
  }

  async fn list_staff(&self) -> Result<Vec<Staff>> {
    self
      .fetch_all(
        format!("SELECT {STAFF_COLUMNS} FROM staff ORDER BY username"),
        vec![],
        RawStaff::from_row,
      )
      .await?
      .into_iter()
      .map(RawStaff::into_staff)
      .collect()
  }

  async fn update_staff(&self, id: Uuid, input: StaffEdit) -> Result<Option<Staff>> {
    let changed = self
      .execute(
        "UPDATE staff
         SET username = ?2, full_name = ?3, national_id = ?4, role = ?5, is_superuser = ?6
         WHERE staff_id = ?1",
        vec![
          text(encode_uuid(id)),
          text(input.username.trim()),
          text(input.full_name.trim()),
          input.national_id.map_or(Value::Null, text),
          text(input.role.to_string()),
          Value::Integer(i64::from(input.is_superuser)),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_staff(id).await
  }

  async fn set_password(&self, id: Uuid, password_hash: String) -> Result<bool> {
    let changed = self
      .execute(
        "UPDATE staff SET password_hash = ?2 WHERE staff_id = ?1",
        vec![text(encode_uuid(id)), text(password_hash)],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn delete_staff(&self, id: Uuid) -> Result<bool> {
    let changed = self
      .execute("DELETE FROM staff WHERE staff_id = ?1", vec![text(encode_uuid(id))])
      .await
      .map_err(|e| match e {
        Error::MissingReference(_) => {
          Error::InUse(format!("staff member {id} still teaches, graded or wrote notes"))
        }
        other => other,
      })?;
    Ok(changed > 0)
  }

  // ── Courses ───────────────────────────────────────────────────────────────

  async fn add_course(&self, input: NewCourse) -> Result<Course> {
    let course = Course {
      course_id:    Uuid::new_v4(),
      year:         input.year,
      name:         input.name,
      room:         input.room,
      lead_teacher: input.lead_teacher,
      created_at:   now(),
    };

    self
      .execute(
        "INSERT INTO courses (course_id, year, name, room, course_key, lead_teacher, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        vec![
          text(encode_uuid(course.course_id)),
          text(course.year.clone()),
          text(course.name.clone()),
          text(course.room.clone()),
          text(fold_key(&[&course.year, &course.name, &course.room])),
          opt_uuid(course.lead_teacher),
          text(encode_dt(course.created_at)),
        ],
      )
      .await?;

    Ok(course)
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
    self
      .fetch_optional(
        format!("SELECT {COURSE_COLUMNS} FROM courses WHERE course_id = ?1"),
        vec![text(encode_uuid(id))],
        RawCourse::from_row,
      )
      .await?
      .map(RawCourse::into_course)
      .transpose()
  }

  /// Newest year first; within a year, grade levels in school order.
  async fn list_courses(&self) -> Result<Vec<Course>> {
    let mut courses = self
      .fetch_all(format!("SELECT {COURSE_COLUMNS} FROM courses"), vec![], RawCourse::from_row)
      .await?
      .into_iter()
      .map(RawCourse::into_course)
      .collect::<Result<Vec<_>>>()?;

    courses.sort_by(|a, b| {
      b.year
        .cmp(&a.year)
        .then_with(|| grade_level_key(&a.name).cmp(&grade_level_key(&b.name)))
        .then_with(|| a.room.to_lowercase().cmp(&b.room.to_lowercase()))
    });
    Ok(courses)
  }

  async fn update_course(&self, id: Uuid, input: CourseEdit) -> Result<Option<Course>> {
    let changed = self
      .execute(
        "UPDATE courses SET year = ?2, name = ?3, room = ?4, course_key = ?5 WHERE course_id = ?1",
        vec![
          text(encode_uuid(id)),
          text(input.year.clone()),
          text(input.name.clone()),
          text(input.room.clone()),
          text(fold_key(&[&input.year, &input.name, &input.room])),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_course(id).await
  }

  async fn set_lead_teacher(
    &self,
    course_id: Uuid,
    teacher_id: Option<Uuid>,
  ) -> Result<Option<Course>> {
    let changed = self
      .execute(
        "UPDATE courses SET lead_teacher = ?2 WHERE course_id = ?1",
        vec![text(encode_uuid(course_id)), opt_uuid(teacher_id)],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_course(course_id).await
  }

  async fn delete_course(&self, id: Uuid) -> Result<bool> {
    let changed = self
      .execute("DELETE FROM courses WHERE course_id = ?1", vec![text(encode_uuid(id))])
      .await?;
    Ok(changed > 0)
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn add_subject(&self, input: NewSubject) -> Result<Subject> {
    let subject = Subject {
      subject_id:  Uuid::new_v4(),
      course_id:   input.course_id,
      teacher_id:  input.teacher_id,
      name:        input.name,
      description: input.description,
      created_at:  now(),
    };

    self
      .execute(
        "INSERT INTO subjects (
           subject_id, course_id, teacher_id, name, name_key, description, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        vec![
          text(encode_uuid(subject.subject_id)),
          text(encode_uuid(subject.course_id)),
          text(encode_uuid(subject.teacher_id)),
          text(subject.name.clone()),
          text(fold_key(&[&subject.name])),
          text(subject.description.clone()),
          text(encode_dt(subject.created_at)),
        ],
      )
      .await?;

    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    self
      .fetch_optional(
        format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE subject_id = ?1"),
        vec![text(encode_uuid(id))],
        RawSubject::from_row,
      )
      .await?
      .map(RawSubject::into_subject)
      .transpose()
  }

  async fn list_subjects(&self, course_id: Option<Uuid>) -> Result<Vec<Subject>> {
    self
      .fetch_all(
        format!(
          "SELECT {SUBJECT_COLUMNS} FROM subjects
           WHERE (?1 IS NULL OR course_id = ?1)
           ORDER BY name_key"
        ),
        vec![opt_uuid(course_id)],
        RawSubject::from_row,
      )
      .await?
      .into_iter()
      .map(RawSubject::into_subject)
      .collect()
  }

  async fn update_subject(&self, id: Uuid, input: SubjectEdit) -> Result<Option<Subject>> {
    let changed = self
      .execute(
        "UPDATE subjects SET name = ?2, name_key = ?3, description = ?4 WHERE subject_id = ?1",
        vec![
          text(encode_uuid(id)),
          text(input.name.clone()),
          text(fold_key(&[&input.name])),
          text(input.description),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_subject(id).await
  }

  async fn set_subject_teacher(&self, subject_id: Uuid, teacher_id: Uuid) -> Result<Option<Subject>> {
    let changed = self
      .execute(
        "UPDATE subjects SET teacher_id = ?2 WHERE subject_id = ?1",
        vec![text(encode_uuid(subject_id)), text(encode_uuid(teacher_id))],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_subject(subject_id).await
  }

  async fn delete_subject(&self, id: Uuid) -> Result<bool> {
    let changed = self
      .execute("DELETE FROM subjects WHERE subject_id = ?1", vec![text(encode_uuid(id))])
      .await?;
    Ok(changed > 0)
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let student = Student {
      student_id:        Uuid::new_v4(),
      national_id:       input.national_id,
      given_names:       input.given_names,
      family_names:      input.family_names,
      birth_date:        input.birth_date,
      emergency_contact: input.emergency_contact,
      course_id:         input.course_id,
      created_at:        now(),
    };

    self
      .execute(
        "INSERT INTO students (
           student_id, national_id, given_names, family_names, birth_date,
           emergency_contact, course_id, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        vec![
          text(encode_uuid(student.student_id)),
          text(student.national_id.clone()),
          text(student.given_names.clone()),
          text(student.family_names.clone()),
          student.birth_date.map_or(Value::Null, |d| text(encode_date(d))),
          student.emergency_contact.clone().map_or(Value::Null, text),
          opt_uuid(student.course_id),
          text(encode_dt(student.created_at)),
        ],
      )
      .await?;

    Ok(student)
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    self
      .fetch_optional(
        format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1"),
        vec![text(encode_uuid(id))],
        RawStudent::from_row,
      )
      .await?
      .map(RawStudent::into_student)
      .transpose()
  }

  async fn list_students(&self, course_id: Option<Uuid>) -> Result<Vec<Student>> {
    self
      .fetch_all(
        format!(
          "SELECT {STUDENT_COLUMNS} FROM students
           WHERE (?1 IS NULL OR course_id = ?1)
           ORDER BY family_names COLLATE NOCASE, given_names COLLATE NOCASE"
        ),
        vec![opt_uuid(course_id)],
        RawStudent::from_row,
      )
      .await?
      .into_iter()
      .map(RawStudent::into_student)
      .collect()
  }

  async fn update_student(&self, id: Uuid, input: StudentEdit) -> Result<Option<Student>> {
    let changed = self
      .execute(
        "UPDATE students
         SET national_id = ?2, given_names = ?3, family_names = ?4, birth_date = ?5,
             emergency_contact = ?6
         WHERE student_id = ?1",
        vec![
          text(encode_uuid(id)),
          text(input.national_id),
          text(input.given_names),
          text(input.family_names),
          input.birth_date.map_or(Value::Null, |d| text(encode_date(d))),
          input.emergency_contact.map_or(Value::Null, text),
        ],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_student(id).await
  }

  async fn assign_student_course(
    &self,
    student_id: Uuid,
    course_id: Option<Uuid>,
  ) -> Result<Option<Student>> {
    let changed = self
      .execute(
        "UPDATE students SET course_id = ?2 WHERE student_id = ?1",
        vec![text(encode_uuid(student_id)), opt_uuid(course_id)],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_student(student_id).await
  }

  async fn delete_student(&self, id: Uuid) -> Result<bool> {
    let changed = self
      .execute("DELETE FROM students WHERE student_id = ?1", vec![text(encode_uuid(id))])
      .await?;
    Ok(changed > 0)
  }

  // ── Grades ────────────────────────────────────────────────────────────────

  async fn upsert_grade(&self, input: GradeWrite) -> Result<(Grade, UpsertOutcome)> {
    let grade_id = encode_uuid(Uuid::new_v4());
    let student_id = encode_uuid(input.student_id);
    let subject_id = encode_uuid(input.subject_id);
    let slot = input.slot.get();
    let recorded_by = encode_uuid(input.recorded_by);
    let at = encode_dt(now());

    let (raw, outcome) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists = tx
          .query_row(
            "SELECT 1 FROM grades WHERE student_id = ?1 AND subject_id = ?2 AND slot = ?3",
            rusqlite::params![student_id, subject_id, slot],
            |_| Ok(()),
          )
          .optional()?
          .is_some();

        tx.execute(
          "INSERT INTO grades (
             grade_id, student_id, subject_id, slot, value, recorded_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
           ON CONFLICT (student_id, subject_id, slot) DO UPDATE SET
             value       = excluded.value,
             recorded_by = excluded.recorded_by,
             updated_at  = excluded.updated_at",
          rusqlite::params![grade_id, student_id, subject_id, slot, input.value, recorded_by, at],
        )?;

        let raw = tx.query_row(
          &format!(
            "SELECT {GRADE_COLUMNS} FROM grades
             WHERE student_id = ?1 AND subject_id = ?2 AND slot = ?3"
          ),
          rusqlite::params![student_id, subject_id, slot],
          RawGrade::from_row,
        )?;
        tx.commit()?;

        let outcome = if exists { UpsertOutcome::Updated } else { UpsertOutcome::Created };
        Ok((raw, outcome))
      })
      .await?;

    Ok((raw.into_grade()?, outcome))
  }

  async fn grades_for_subject(&self, subject_id: Uuid) -> Result<Vec<Grade>> {
    self
      .fetch_all(
        format!(
          "SELECT {GRADE_COLUMNS} FROM grades WHERE subject_id = ?1 ORDER BY student_id, slot"
        ),
        vec![text(encode_uuid(subject_id))],
        RawGrade::from_row,
      )
      .await?
      .into_iter()
      .map(RawGrade::into_grade)
      .collect()
  }

  async fn grades_for_student(&self, student_id: Uuid) -> Result<Vec<Grade>> {
    self
      .fetch_all(
        format!(
          "SELECT {GRADE_COLUMNS} FROM grades WHERE student_id = ?1 ORDER BY subject_id, slot"
        ),
        vec![text(encode_uuid(student_id))],
        RawGrade::from_row,
      )
      .await?
      .into_iter()
      .map(RawGrade::into_grade)
      .collect()
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn record_attendance(&self, input: NewAttendance) -> Result<AttendanceRecord> {
    let record_id = encode_uuid(Uuid::new_v4());
    let student_id = encode_uuid(input.student_id);
    let course_id = encode_uuid(input.course_id);
    let date = encode_date(input.date);
    let status = input.status.trim().to_owned();
    let at = encode_dt(now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO attendance (record_id, student_id, course_id, date, status, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (student_id, course_id, date) DO UPDATE SET
             status     = excluded.status,
             updated_at = excluded.updated_at",
          rusqlite::params![record_id, student_id, course_id, date, status, at],
        )?;
        let raw = tx.query_row(
          &format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance
             WHERE student_id = ?1 AND course_id = ?2 AND date = ?3"
          ),
          rusqlite::params![student_id, course_id, date],
          RawAttendance::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_record()
  }

  async fn list_attendance(&self, query: AttendanceQuery) -> Result<Vec<AttendanceRecord>> {
    self
      .fetch_all(
        format!(
          "SELECT {ATTENDANCE_COLUMNS} FROM attendance
           WHERE (?1 IS NULL OR student_id = ?1)
             AND (?2 IS NULL OR course_id = ?2)
             AND (?3 IS NULL OR date = ?3)
           ORDER BY date, student_id"
        ),
        vec![
          opt_uuid(query.student_id),
          opt_uuid(query.course_id),
          query.date.map_or(Value::Null, |d| text(encode_date(d))),
        ],
        RawAttendance::from_row,
      )
      .await?
      .into_iter()
      .map(RawAttendance::into_record)
      .collect()
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  async fn add_note(&self, input: NewNote) -> Result<Note> {
    let note = Note {
      note_id:    Uuid::new_v4(),
      student_id: input.student_id,
      author_id:  input.author_id,
      text:       input.text,
      created_at: now(),
    };

    self
      .execute(
        "INSERT INTO notes (note_id, student_id, author_id, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        vec![
          text(encode_uuid(note.note_id)),
          text(encode_uuid(note.student_id)),
          text(encode_uuid(note.author_id)),
          text(note.text.clone()),
          text(encode_dt(note.created_at)),
        ],
      )
      .await?;

    Ok(note)
  }

  async fn get_note(&self, id: Uuid) -> Result<Option<Note>> {
    self
      .fetch_optional(
        format!("SELECT {NOTE_COLUMNS} FROM notes WHERE note_id = ?1"),
        vec![text(encode_uuid(id))],
        RawNote::from_row,
      )
      .await?
      .map(RawNote::into_note)
      .transpose()
  }

  async fn list_notes(&self, student_id: Uuid) -> Result<Vec<Note>> {
    self
      .fetch_all(
        format!(
          "SELECT {NOTE_COLUMNS} FROM notes WHERE student_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ),
        vec![text(encode_uuid(student_id))],
        RawNote::from_row,
      )
      .await?
      .into_iter()
      .map(RawNote::into_note)
      .collect()
  }

  async fn delete_note(&self, id: Uuid) -> Result<bool> {
    let changed = self
      .execute("DELETE FROM notes WHERE note_id = ?1", vec![text(encode_uuid(id))])
      .await?;
    Ok(changed > 0)
  }

  // ── Audit log ─────────────────────────────────────────────────────────────

  async fn append_audit(&self, input: NewAuditEntry) -> Result<AuditEntry> {
    let entry = AuditEntry {
      audit_id:    Uuid::new_v4(),
      actor_id:    input.actor_id,
      entity_kind: input.entity_kind,
      entity_id:   input.entity_id,
      entity_repr: input.entity_repr,
      action:      input.action,
      summary:     input.summary,
      recorded_at: now(),
    };

    self
      .execute(
        "INSERT INTO audit_log (
           audit_id, actor_id, entity_kind, entity_id, entity_repr, action, summary, recorded_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        vec![
          text(encode_uuid(entry.audit_id)),
          text(encode_uuid(entry.actor_id)),
          text(entry.entity_kind.to_string()),
          opt_uuid(entry.entity_id),
          text(entry.entity_repr.clone()),
          text(entry.action.to_string()),
          text(entry.summary.clone()),
          text(encode_dt(entry.recorded_at)),
        ],
      )
      .await?;

    Ok(entry)
  }

  async fn list_audit(&self, query: AuditQuery) -> Result<Vec<AuditEntry>> {
    // SQLite treats a negative LIMIT as unbounded.
    let limit = query.limit.and_then(|l| i64::try_from(l).ok()).unwrap_or(-1);

    self
      .fetch_all(
        format!(
          "SELECT {AUDIT_COLUMNS} FROM audit_log
           WHERE (?1 IS NULL OR actor_id = ?1)
             AND (?2 IS NULL OR action = ?2)
             AND (?3 IS NULL OR entity_kind = ?3)
           ORDER BY recorded_at DESC, rowid DESC
           LIMIT ?4"
        ),
        vec![
          opt_uuid(query.actor_id),
          query.action.map_or(Value::Null, |a| text(a.to_string())),
          query.entity_kind.map_or(Value::Null, |k| text(k.to_string())),
          Value::Integer(limit),
        ],
        RawAudit::from_row,
      )
      .await?
      .into_iter()
      .map(RawAudit::into_entry)
      .collect()
  }

  async fn delete_audit(&self, id: Uuid) -> Result<bool> {
    let changed = self
      .execute("DELETE FROM audit_log WHERE audit_id = ?1", vec![text(encode_uuid(id))])
      .await?;
    Ok(changed > 0)
  }

  async fn clear_audit(&self) -> Result<usize> {
    let removed = self.execute("DELETE FROM audit_log", vec![]).await?;
    tracing::info!(removed, "cleared audit log");
    Ok(removed)
  }
}
