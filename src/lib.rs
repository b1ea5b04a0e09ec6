//! Client library for the CTF training platform.
//!
//! Re-exports the workspace crates so consumers (and the workspace test
//! suite) can depend on a single facade.

pub use ctf_console_admin as admin;
pub use ctf_console_api_client as api_client;
pub use ctf_console_challenge as challenge;
pub use ctf_console_countdown as countdown;
pub use ctf_console_session as session;
