pub mod flaky;
pub mod workspace;

pub use flaky::{FlakyStore, StoreOp};
pub use workspace::TestWorkspace;
