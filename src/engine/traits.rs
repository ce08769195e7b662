use crate::{
    course::{Control, Course},
    types::{ControlId, CourseId},
};

/// Read access to shared courses and controls, resolved by id.
pub trait CourseSource {
    /// Course with this id.
    fn course(&self, id: CourseId) -> Option<&Course>;
    /// Control with this id.
    fn control(&self, id: ControlId) -> Option<&Control>;
}
