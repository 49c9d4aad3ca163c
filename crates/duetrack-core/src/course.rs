//! Courses and the course registry.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::deadline::{Deadline, Status};
use crate::time::{CalendarFormatError, CalendarTime};

/// A named collection of deadlines keyed by assignment name.
///
/// Deadlines are expected to carry the course's name; this is not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    name: String,
    deadlines: BTreeMap<String, Deadline>,
}

impl Course {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deadlines: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a deadline under its own name, replacing any previous one.
    pub fn add_deadline(&mut self, deadline: Deadline) -> Option<Deadline> {
        let key = deadline.name().to_string();
        self.add_deadline_as(key, deadline)
    }

    /// Inserts a deadline under an explicit key, replacing any previous one.
    pub fn add_deadline_as(
        &mut self,
        name: impl Into<String>,
        deadline: Deadline,
    ) -> Option<Deadline> {
        self.deadlines.insert(name.into(), deadline)
    }

    /// Builds and inserts a deadline for this course.
    ///
    /// Nothing is inserted when the date is invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn add_new_deadline(
        &mut self,
        name: &str,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        status: Status,
        link: Option<String>,
    ) -> Result<(), CalendarFormatError> {
        let deadline = Deadline::new(
            year,
            month,
            day,
            hour,
            minute,
            name,
            self.name.clone(),
            status,
            link,
        )?;
        self.add_deadline_as(name, deadline);
        Ok(())
    }

    /// Merges `other` into this course when the names match exactly.
    ///
    /// Returns the number of assignment names that were not present before.
    /// A course with a different name is ignored and 0 is returned.
    pub fn append(&mut self, other: &Course) -> usize {
        if other.name != self.name {
            tracing::debug!(
                target_course = %self.name,
                other_course = %other.name,
                "Skipping append of a different course"
            );
            return 0;
        }
        other
            .deadlines
            .iter()
            .filter(|(key, deadline)| {
                self.deadlines
                    .insert((*key).clone(), (*deadline).clone())
                    .is_none()
            })
            .count()
    }

    /// Removes a deadline by assignment name.
    pub fn remove_deadline(&mut self, name: &str) -> Option<Deadline> {
        self.deadlines.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Deadline> {
        self.deadlines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deadlines.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Iterates `(assignment name, deadline)` pairs in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Deadline> {
        self.deadlines.iter()
    }

    pub fn deadlines(&self) -> impl Iterator<Item = &Deadline> {
        self.deadlines.values()
    }

    /// Assignment names ordered by due time; equal due times keep name order.
    pub fn sorted_deadline_names(&self) -> Vec<&str> {
        let mut entries: Vec<_> = self.deadlines.iter().collect();
        // Stable sort over name-ordered entries.
        entries.sort_by(|(_, a), (_, b)| a.cmp_due(b));
        entries.into_iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Assignment names ordered by due time, latest first.
    pub fn reverse_sorted_deadline_names(&self) -> Vec<&str> {
        let mut entries: Vec<_> = self.deadlines.iter().collect();
        entries.sort_by(|(a_name, a), (b_name, b)| b.cmp_due(a).then_with(|| a_name.cmp(b_name)));
        entries.into_iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a Course {
    type Item = (&'a String, &'a Deadline);
    type IntoIter = btree_map::Iter<'a, String, Deadline>;

    fn into_iter(self) -> Self::IntoIter {
        self.deadlines.iter()
    }
}

/// All known courses, keyed by course name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseRegistry {
    courses: BTreeMap<String, Course>,
}

impl CourseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the named course, creating an empty one if needed.
    pub fn course_mut_or_create(&mut self, name: &str) -> &mut Course {
        self.courses
            .entry(name.to_string())
            .or_insert_with(|| Course::new(name))
    }

    /// Adds a deadline to the course named by the deadline.
    pub fn insert_deadline(&mut self, deadline: Deadline) -> Option<Deadline> {
        let course = deadline.course().to_string();
        self.course_mut_or_create(&course).add_deadline(deadline)
    }

    /// Adds a whole course, merging with an existing one of the same name.
    ///
    /// Returns the number of new assignment names.
    pub fn insert_course(&mut self, course: Course) -> usize {
        match self.courses.entry(course.name.clone()) {
            btree_map::Entry::Occupied(mut existing) => existing.get_mut().append(&course),
            btree_map::Entry::Vacant(slot) => slot.insert(course).len(),
        }
    }

    /// Merges every course of `other` into this registry.
    ///
    /// Returns the number of new assignment names.
    pub fn merge(&mut self, other: CourseRegistry) -> usize {
        other
            .courses
            .into_values()
            .map(|course| self.insert_course(course))
            .sum()
    }

    /// Removes a deadline, dropping its course when it becomes empty.
    pub fn remove_deadline(&mut self, course: &str, name: &str) -> Option<Deadline> {
        let entry = self.courses.get_mut(course)?;
        let removed = entry.remove_deadline(name);
        if entry.is_empty() {
            self.courses.remove(course);
        }
        removed
    }

    pub fn get(&self, course: &str) -> Option<&Course> {
        self.courses.get(course)
    }

    pub fn get_deadline(&self, course: &str, name: &str) -> Option<&Deadline> {
        self.courses.get(course)?.get(name)
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    /// Number of courses.
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Total number of deadlines across all courses.
    pub fn deadline_count(&self) -> usize {
        self.courses.values().map(Course::len).sum()
    }

    /// Courses whose names are not in `ignored`.
    pub fn visible<'a>(&'a self, ignored: &'a [String]) -> impl Iterator<Item = &'a Course> + 'a {
        self.courses
            .values()
            .filter(move |course| !ignored.iter().any(|name| name == course.name()))
    }

    /// All deadlines due after `reference`, soonest first.
    pub fn upcoming(&self, reference: &CalendarTime) -> Vec<&Deadline> {
        let mut deadlines: Vec<_> = self
            .courses
            .values()
            .flat_map(|course| course.deadlines())
            .filter(|deadline| !deadline.is_overdue(reference))
            .collect();
        deadlines.sort();
        deadlines
    }

    /// All deadlines, soonest first.
    pub fn all_sorted(&self) -> Vec<&Deadline> {
        let mut deadlines: Vec<_> = self
            .courses
            .values()
            .flat_map(|course| course.deadlines())
            .collect();
        deadlines.sort();
        deadlines
    }
}

impl FromIterator<Deadline> for CourseRegistry {
    fn from_iter<I: IntoIterator<Item = Deadline>>(iter: I) -> Self {
        let mut registry = Self::new();
        for deadline in iter {
            registry.insert_deadline(deadline);
        }
        registry
    }
}
