//! Detection implementation submodule.
//!
//! This module contains the detection algorithm itself:
//!
//! - `search_paths`: which directories to search ([`PathResolver`])
//! - `validator`: whether a directory is a JDK ([`JdkValidator`])
//! - `probe`: running the compiler with 64-bit to 32-bit fallback
//! - `parser`: regex extraction from compiler banners and registry output

mod parser;
mod probe;
mod search_paths;
mod validator;

pub(crate) use parser::parse_reg_query;
pub use search_paths::{PathResolver, SearchPathSet, JAVA_HOME_VAR};
pub use validator::JdkValidator;
