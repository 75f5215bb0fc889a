pub mod supabase;
pub mod supabase_auth;
pub mod supabase_store;
pub mod util;

pub use supabase::SupabaseClient;
pub use supabase_auth::SupabaseAuth;
pub use supabase_store::SupabaseDealStore;
