//! Booking engine: console state transitions and their relay side effects.

mod engine;
mod error;
mod lanes;
mod locks;
pub mod validate;


pub use engine::{
    Booking, BookingEngine, ConsoleStatus, DEFAULT_RELAY_DEADLINE, Payment, PaymentRequest,
    PowerOutcome, Reset, ResetAll,
};
pub use error::{BookingError, Result};
pub use locks::{ConsoleGuard, ConsoleLocks};
