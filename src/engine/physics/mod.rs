pub mod arrow;
pub mod batch;
pub mod gravity;
pub mod gravity_manager;
pub mod kernels;
pub mod pipeline;
pub mod probe;

pub use arrow::*;
pub use batch::*;
pub use gravity::*;
pub use gravity_manager::*;
pub use kernels::*;
pub use pipeline::*;
pub use probe::*;
