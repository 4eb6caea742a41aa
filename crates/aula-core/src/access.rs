//! Role- and assignment-based permission checks.
//!
//! Every function here is a pure predicate over an [`Actor`] and the records
//! involved. Callers rebuild the actor from storage on each request.

use crate::{
  school::{Course, Subject},
  staff::{Actor, Role},
};

/// Coordinators, admins and superusers manage every course.
pub fn is_coordinator(actor: &Actor) -> bool {
  actor.is_superuser() || matches!(actor.role(), Role::Coordinator | Role::Admin)
}

pub fn is_lead_teacher(actor: &Actor, course: &Course) -> bool {
  course.lead_teacher == Some(actor.staff_id())
}

/// May `actor` change grades of `subject` in `course`?
///
/// Granted to coordinators (and superusers), to the course's lead teacher, and
/// to the subject's teacher.
pub fn can_edit(actor: &Actor, course: &Course, subject: &Subject) -> bool {
  is_coordinator(actor)
    || is_lead_teacher(actor, course)
    || subject.teacher_id == actor.staff_id()
}

/// The subjects of `course` whose gradebook `actor` may open.
///
/// Coordinators and the lead teacher see all of them; other teachers only the
/// ones they teach; inspectors none.
pub fn visible_subjects<'a>(
  actor: &Actor,
  course: &Course,
  subjects: &'a [Subject],
) -> Vec<&'a Subject> {
  let in_course = subjects.iter().filter(|s| s.course_id == course.course_id);

  if is_coordinator(actor) || is_lead_teacher(actor, course) {
    return in_course.collect();
  }
  match actor.role() {
    Role::Teacher => in_course.filter(|s| s.teacher_id == actor.staff_id()).collect(),
    _ => Vec::new(),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn course(lead: Option<Uuid>) -> Course {
    Course {
      course_id:    Uuid::new_v4(),
      year:         "2025".into(),
      name:         "3° Medio".into(),
      room:         "B-2".into(),
      lead_teacher: lead,
      created_at:   Utc::now(),
    }
  }

  fn subject(course: &Course, teacher: Uuid, name: &str) -> Subject {
    Subject {
      subject_id:  Uuid::new_v4(),
      course_id:   course.course_id,
      teacher_id:  teacher,
      name:        name.into(),
      description: String::new(),
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn subject_teacher_is_limited_to_their_subject() {
    let teacher = Actor::new(Uuid::new_v4(), Role::Teacher, false);
    let other = Uuid::new_v4();
    let y = course(None);
    let x = subject(&y, teacher.staff_id(), "Física");
    let mut z = subject(&y, other, "Química");

    assert!(can_edit(&teacher, &y, &x));
    assert!(!can_edit(&teacher, &y, &z));

    z.teacher_id = teacher.staff_id();
    assert!(can_edit(&teacher, &y, &z));
  }

  #[test]
  fn lead_teacher_edits_every_subject_of_their_course() {
    let lead = Actor::new(Uuid::new_v4(), Role::Teacher, false);
    let y = course(Some(lead.staff_id()));
    let z = subject(&y, Uuid::new_v4(), "Química");
    assert!(can_edit(&lead, &y, &z));

    let elsewhere = course(None);
    let w = subject(&elsewhere, Uuid::new_v4(), "Arte");
    assert!(!can_edit(&lead, &elsewhere, &w));
  }

  #[test]
  fn coordinators_and_superusers_edit_anything() {
    let y = course(None);
    let z = subject(&y, Uuid::new_v4(), "Química");
    assert!(can_edit(&Actor::new(Uuid::new_v4(), Role::Coordinator, false), &y, &z));
    assert!(can_edit(&Actor::new(Uuid::new_v4(), Role::Admin, false), &y, &z));
    assert!(can_edit(&Actor::new(Uuid::new_v4(), Role::Inspector, true), &y, &z));
    assert!(!can_edit(&Actor::new(Uuid::new_v4(), Role::Inspector, false), &y, &z));
  }

  #[test]
  fn visibility_follows_role() {
    let teacher = Actor::new(Uuid::new_v4(), Role::Teacher, false);
    let y = course(None);
    let subjects = vec![
      subject(&y, teacher.staff_id(), "Física"),
      subject(&y, Uuid::new_v4(), "Química"),
    ];

    assert_eq!(visible_subjects(&teacher, &y, &subjects).len(), 1);

    let utp = Actor::new(Uuid::new_v4(), Role::Coordinator, false);
    assert_eq!(visible_subjects(&utp, &y, &subjects).len(), 2);

    let inspector = Actor::new(Uuid::new_v4(), Role::Inspector, false);
    assert!(visible_subjects(&inspector, &y, &subjects).is_empty());

    let lead_course = Course { lead_teacher: Some(teacher.staff_id()), ..y.clone() };
    assert_eq!(visible_subjects(&teacher, &lead_course, &subjects).len(), 2);
  }
}
