pub mod availability;
pub mod calendar;
pub mod doctor;
pub mod resolver;
pub mod slots;

pub use availability::AvailabilityService;
pub use calendar::{weekday_index, WorkingHoursCalendar};
pub use doctor::DoctorService;
pub use resolver::AvailabilityResolver;
pub use slots::SlotGenerator;
