//! open-gemdocs: documentation for installed Ruby gems, served to AI
//! assistants over MCP and to humans through a browser.

pub mod browser;
pub mod config;
pub mod docs;
pub mod errors;
pub mod gems;
pub mod mcp;
pub mod yard;
