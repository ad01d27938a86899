pub mod availability;
pub mod repository;
pub mod slots;
pub mod supabase;

pub use availability::AvailabilityService;
pub use repository::{AvailabilityRepository, InMemoryAvailabilityRepository};
pub use slots::{intervals_overlap, SlotGenerator};
pub use supabase::SupabaseAvailabilityRepository;
