mod code_interpreter;
mod gateway_target;
mod memory;
mod memory_strategy;
mod status;
mod token_vault;
mod workload_identity;

pub use code_interpreter::*;
pub use gateway_target::*;
pub use memory::*;
pub use memory_strategy::*;
pub use status::*;
pub use token_vault::*;
pub use workload_identity::*;
