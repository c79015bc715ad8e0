pub mod access;
pub mod commands;
pub mod errors;
pub mod fine;
pub mod inventory;
pub mod loan;
pub mod reservation;
pub mod value_objects;

pub use errors::*;
pub use fine::{Fine, FineStatus, Payment};
pub use inventory::BookStock;
pub use loan::{Loan, LoanClosure, LoanStatus};
pub use reservation::{Reservation, ReservationStatus};
pub use value_objects::*;
