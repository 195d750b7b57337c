mod activities;
mod borrowers;
mod documents;
mod loans;
mod notifications;
mod programs;
mod sessions;
mod status_history;
mod tasks;
mod users;

pub use activities::*;
pub use borrowers::*;
pub use documents::*;
pub use loans::*;
pub use notifications::*;
pub use programs::*;
pub use sessions::*;
pub use status_history::*;
pub use tasks::*;
pub use users::*;
