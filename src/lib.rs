//! vartree: inspect a stopped program's variables through a debug adapter.
//!
//! The binary launches a program under a Debug Adapter Protocol adapter,
//! stops on entry and prints the variables, watch and hover trees of the
//! top stack frame. The tree model itself lives in `vartree-tree`.

pub mod cli;
pub mod inspect;
pub mod render;
