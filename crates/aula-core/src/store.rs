//! The `SchoolStore` trait.
//!
//! Implemented by storage backends (e.g. `aula-store-sqlite`). The gradebook,
//! report and HTTP layers depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  attendance::{AttendanceQuery, AttendanceRecord, NewAttendance},
  audit::{AuditEntry, AuditQuery, NewAuditEntry},
  grade::{Grade, GradeWrite, UpsertOutcome},
  school::{
    Course, CourseEdit, NewCourse, NewNote, NewStudent, NewSubject, Note, Student, StudentEdit,
    Subject, SubjectEdit,
  },
  staff::{NewStaff, Staff, StaffEdit},
};

/// Backend errors that callers need to tell apart.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// A unique constraint was violated (duplicate username, course, ...).
  fn is_conflict(&self) -> bool;

  /// The input referred to a record that does not exist.
  fn is_missing_reference(&self) -> bool { false }

  /// A delete was refused because other records still point at the target.
  fn is_in_use(&self) -> bool { false }
}

/// Abstraction over an AulaClass storage backend.
///
/// Lookups return `Ok(None)` for missing records; mutations addressed by id
/// return `Ok(None)` / `Ok(false)` when the target does not exist. Unique
/// constraint violations are backend errors.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait SchoolStore: Send + Sync {
  type Error: StoreError;

  // ── Staff ─────────────────────────────────────────────────────────────

  fn add_staff(
    &self,
    input: NewStaff,
  ) -> impl Future<Output = Result<Staff, Self::Error>> + Send + '_;

  fn get_staff(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Staff>, Self::Error>> + Send + '_;

  /// Usernames compare case-insensitively.
  fn find_staff_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Staff>, Self::Error>> + Send + '_;

  /// All staff, ordered by username.
  fn list_staff(&self) -> impl Future<Output = Result<Vec<Staff>, Self::Error>> + Send + '_;

  /// Replace the account data of `id`; the password hash is kept. A username
  /// taken by someone else (ignoring case) is a conflict.
  fn update_staff(
    &self,
    id: Uuid,
    input: StaffEdit,
  ) -> impl Future<Output = Result<Option<Staff>, Self::Error>> + Send + '_;

  /// Store a new argon2 PHC string for `id`.
  fn set_password(
    &self,
    id: Uuid,
    password_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Courses led by the staff member lose their lead teacher. A staff member
  /// who still teaches a subject, recorded a grade or wrote a note cannot be
  /// deleted; the error reports [`StoreError::is_in_use`].
  fn delete_staff(&self, id: Uuid) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Courses ───────────────────────────────────────────────────────────

  /// The input is expected to be [normalized](NewCourse::normalized).
  fn add_course(
    &self,
    input: NewCourse,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn list_courses(&self) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  /// Rename a course. The input is expected to be
  /// [normalized](CourseEdit::normalized); identity stays unique ignoring case.
  fn update_course(
    &self,
    id: Uuid,
    input: CourseEdit,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn set_lead_teacher(
    &self,
    course_id: Uuid,
    teacher_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// Deletes the course with its subjects, their grades, and the course's
  /// attendance. Enrolled students are detached, not deleted.
  fn delete_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  fn add_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Subjects ordered by name, optionally restricted to one course.
  fn list_subjects(
    &self,
    course_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  /// Rename or redescribe a subject; names stay unique within the course.
  fn update_subject(
    &self,
    id: Uuid,
    input: SubjectEdit,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  fn set_subject_teacher(
    &self,
    subject_id: Uuid,
    teacher_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Deletes the subject and every grade recorded for it.
  fn delete_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────

  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Students ordered by family then given names, optionally restricted to
  /// one course.
  fn list_students(
    &self,
    course_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  /// Replace a student's personal data. A national id already used by
  /// another student is a conflict.
  fn update_student(
    &self,
    id: Uuid,
    input: StudentEdit,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn assign_student_course(
    &self,
    student_id: Uuid,
    course_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Deletes the student with their grades, attendance and notes.
  fn delete_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Grades ────────────────────────────────────────────────────────────

  /// Create or overwrite the grade in `(student, subject, slot)`. The store
  /// stamps timestamps and reports whether a row was created or updated.
  fn upsert_grade(
    &self,
    input: GradeWrite,
  ) -> impl Future<Output = Result<(Grade, UpsertOutcome), Self::Error>> + Send + '_;

  fn grades_for_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Grade>, Self::Error>> + Send + '_;

  fn grades_for_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Grade>, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  /// Create or overwrite the record for `(student, course, date)`.
  fn record_attendance(
    &self,
    input: NewAttendance,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Records matching `query`, ordered by date then student.
  fn list_attendance(
    &self,
    query: AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  // ── Notes ─────────────────────────────────────────────────────────────

  fn add_note(
    &self,
    input: NewNote,
  ) -> impl Future<Output = Result<Note, Self::Error>> + Send + '_;

  fn get_note(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Note>, Self::Error>> + Send + '_;

  /// A student's notes, newest first.
  fn list_notes(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Note>, Self::Error>> + Send + '_;

  fn delete_note(&self, id: Uuid) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Audit log ─────────────────────────────────────────────────────────

  fn append_audit(
    &self,
    input: NewAuditEntry,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  fn list_audit(
    &self,
    query: AuditQuery,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;

  fn delete_audit(&self, id: Uuid) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove every entry; returns how many were removed.
  fn clear_audit(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
