pub mod booking;
pub mod guard;
pub mod lifecycle;

pub use booking::AppointmentBookingService;
pub use guard::BookingGuard;
pub use lifecycle::AppointmentLifecycleService;
