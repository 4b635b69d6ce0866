//! vaultstep command-line front end
//!
//! Wires the step core to a process: files for defaults and credentials,
//! the process environment for macro expansion, stderr for the build log
//! and stdout for the value.

pub mod cli;
pub mod host;
pub mod logging;
pub mod read;
