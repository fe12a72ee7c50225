//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a subsystem flow
//! against mock adapters. All tests run on the host (x86_64) with no
//! real hardware required.

mod control_loop_tests;
mod lightcode_flow_tests;
mod mock_hw;
mod persistence_tests;
