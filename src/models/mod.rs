pub mod assignment;
pub mod course;
pub mod semester;

pub use assignment::{
    Assignment, AssignmentWithCourse, NewAssignmentRequest, UpdateAssignmentRequest,
};
pub use course::{Course, NewCourseRequest, UpdateCourseRequest};
pub use semester::{NewSemesterRequest, Semester, UpdateSemesterRequest};
