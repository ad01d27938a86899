pub mod booking;
pub mod ledger;
pub mod lifecycle;
pub mod supabase;

pub use booking::{BookingSettings, SchedulingCoordinator};
pub use ledger::{BookingLedger, InMemoryLedger, LedgerError, LedgerRepository};
pub use lifecycle::AppointmentLifecycleService;
pub use supabase::SupabaseLedgerRepository;
