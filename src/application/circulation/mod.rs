pub mod circulation_service;
pub mod errors;
pub mod queries;
pub mod reservation_sweep;

pub use circulation_service::{
    BorrowReceipt, Fulfillment, PaymentReceipt, ReservationReceipt, ReturnReceipt, adjust_fine,
    borrow, cancel_reservation, pay_fine, record_payment, reserve, return_loan,
    update_reservation_status,
};
pub use errors::{CirculationError, Entity, Result};
pub use queries::{
    FineSummary, PaymentHistory, fine_summary, open_loans, past_due_loans, payment_history,
    reservations_of,
};
pub use reservation_sweep::sweep_expired_reservations;
