mod activity_action;
mod document;
mod email_address;
mod employment_status;
mod loan_number;
mod loan_status;
mod loan_terms;
mod notification;
mod pagination;
mod password;
mod person_name;
mod task;
mod user_role;
mod username;

pub use activity_action::*;
pub use document::*;
pub use email_address::*;
pub use employment_status::*;
pub use loan_number::*;
pub use loan_status::*;
pub use loan_terms::*;
pub use notification::*;
pub use pagination::*;
pub use password::*;
pub use person_name::*;
pub use task::*;
pub use user_role::*;
pub use username::*;
