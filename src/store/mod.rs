pub mod memory;
pub mod session;

pub use memory::MemoryDealStore;
pub use session::SessionFile;
