//! REST protocol definitions shared by the tracker server and its clients.
//!
//! Request bodies, response bodies and the error envelope. Defects, projects
//! and stage options are returned as the `entities` types themselves.

mod error;
mod requests;
mod responses;

pub use error::*;
pub use requests::*;
pub use responses::*;
