//! Rebate program registration and lookup.

mod core;
mod create_endpoint;
mod view_endpoints;

pub use core::{
    NewRebateProgram, RebateProgram, create_program_table, create_rebate_program,
    delete_rebate_program, get_rebate_program, get_recent_programs,
};
pub use create_endpoint::create_program_endpoint;
pub use view_endpoints::{delete_program_endpoint, get_program_endpoint};

#[cfg(test)]
pub(crate) use core::test_utils;
