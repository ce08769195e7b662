//! Controls, courses and the registry that owns them.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    engine::traits::CourseSource,
    types::{ControlId, CourseId, FINISH_CONTROL, LegPair, START_CONTROL},
};

/// Registry mutation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The id collides with the start or finish marker.
    #[error("control id {0} is reserved for the start/finish marker")]
    ReservedControlId(ControlId),
    /// A course references a control that is not registered.
    #[error("course {course} references unknown control {control}")]
    UnknownControl {
        course: CourseId,
        control: ControlId,
    },
    /// A control with this id is already registered.
    #[error("control {0} already registered")]
    DuplicateControl(ControlId),
    /// A course with this id is already registered.
    #[error("course {0} already registered")]
    DuplicateCourse(CourseId),
}

/// A physical control; it accepts punches from any of its codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Registry id.
    pub id: ControlId,
    /// Punch codes accepted at this control.
    pub codes: Vec<u32>,
}

impl Control {
    /// Control with a single code equal to its id.
    pub fn new(id: ControlId) -> Self {
        Self { id, codes: vec![id] }
    }

    /// True when `code` is one of this control's codes.
    pub fn accepts(&self, code: u32) -> bool {
        self.codes.contains(&code)
    }
}

/// An ordered sequence of controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Registry id.
    pub id: CourseId,
    /// Display name.
    pub name: String,
    /// Controls in visiting order, start and finish excluded.
    pub controls: Vec<ControlId>,
    /// Control revisited to form loops, if the course has loops.
    pub common_control: Option<ControlId>,
    /// Shorter variant used when a runner takes a shortcut.
    pub shortened: Option<CourseId>,
}

impl Course {
    /// Plain course without loops or a shortened variant.
    pub fn new(id: CourseId, name: impl Into<String>, controls: Vec<ControlId>) -> Self {
        Self {
            id,
            name: name.into(),
            controls,
            common_control: None,
            shortened: None,
        }
    }

    /// Every directed leg the course runs, start and finish included.
    pub fn leg_pairs(&self) -> Vec<LegPair> {
        let mut out = Vec::with_capacity(self.controls.len() + 1);
        let mut prev = START_CONTROL;
        for &ctrl in &self.controls {
            out.push((prev, ctrl));
            prev = ctrl;
        }
        out.push((prev, FINISH_CONTROL));
        out
    }

    /// Leg pairs sorted so that two courses running the same legs in a
    /// different order compare equal.
    pub fn course_key(&self) -> Vec<LegPair> {
        let mut key = self.leg_pairs();
        key.sort_unstable();
        key
    }

    /// Positions in [`Course::controls`] that visit the common control.
    pub fn loop_marks(&self) -> Vec<usize> {
        let Some(common) = self.common_control else {
            return Vec::new();
        };
        self.controls
            .iter()
            .enumerate()
            .filter_map(|(idx, &c)| (c == common).then_some(idx))
            .collect()
    }

    /// Number of loops closed at the common control.
    pub fn loop_count(&self) -> usize {
        self.loop_marks().len().saturating_sub(1)
    }
}

/// Owning registry; classes reference courses and controls by id only.
#[derive(Debug, Default, Clone)]
pub struct CourseRegistry {
    controls: HashMap<ControlId, Control>,
    courses: HashMap<CourseId, Course>,
}

impl CourseRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a control.
    pub fn add_control(&mut self, control: Control) -> Result<(), RegistryError> {
        if control.id == START_CONTROL || control.id == FINISH_CONTROL {
            return Err(RegistryError::ReservedControlId(control.id));
        }
        if self.controls.contains_key(&control.id) {
            return Err(RegistryError::DuplicateControl(control.id));
        }
        self.controls.insert(control.id, control);
        Ok(())
    }

    /// Registers a course; every control it visits must already exist.
    pub fn add_course(&mut self, course: Course) -> Result<(), RegistryError> {
        if self.courses.contains_key(&course.id) {
            return Err(RegistryError::DuplicateCourse(course.id));
        }
        if let Some(&missing) = course
            .controls
            .iter()
            .find(|c| !self.controls.contains_key(*c))
        {
            return Err(RegistryError::UnknownControl {
                course: course.id,
                control: missing,
            });
        }
        self.courses.insert(course.id, course);
        Ok(())
    }

    /// Registers a control per id, each accepting its own id as code.
    pub fn add_simple_controls(
        &mut self,
        ids: impl IntoIterator<Item = ControlId>,
    ) -> Result<(), RegistryError> {
        for id in ids {
            if !self.controls.contains_key(&id) {
                self.add_control(Control::new(id))?;
            }
        }
        Ok(())
    }

    /// All registered courses, in no particular order.
    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }
}

impl CourseSource for CourseRegistry {
    fn course(&self, id: CourseId) -> Option<&Course> {
        self.courses.get(&id)
    }

    fn control(&self, id: ControlId) -> Option<&Control> {
        self.controls.get(&id)
    }
}
