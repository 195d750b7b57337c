mod activity;
mod borrower;
mod document;
mod loan;
mod notification;
mod program;
mod session;
mod task;
mod user;

pub use activity::*;
pub use borrower::*;
pub use document::*;
pub use loan::*;
pub use notification::*;
pub use program::*;
pub use session::*;
pub use task::*;
pub use user::*;
