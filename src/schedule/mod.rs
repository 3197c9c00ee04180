pub mod codec;
pub mod projector;
pub mod slot;

pub use projector::{CourseSchedule, Occurrence};
pub use slot::{Frequency, ScheduleSlot, SessionType, SlotError};
