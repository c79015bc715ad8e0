pub mod fine_ledger;
pub mod inventory_ledger;
pub mod loan_registry;
pub mod reservation_queue;
pub mod unit_of_work;

pub use fine_ledger::FineLedger;
pub use inventory_ledger::InventoryLedger;
pub use loan_registry::LoanRegistry;
pub use reservation_queue::ReservationQueue;
pub use unit_of_work::{CirculationStore, UnitOfWork};
