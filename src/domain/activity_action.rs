/// Actions recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    UserRegistered,
    UserLogin,
    UserLogout,
    PasswordReset,
    PasswordChanged,
    UserRoleChanged,
    UserStatusChanged,
    LoanCreated,
    LoanUpdated,
    LoanSubmitted,
    LoanStatusChanged,
    LoanDeleted,
    DocumentUploaded,
    DocumentVerified,
    DocumentDeleted,
    TaskCreated,
    TaskStatusChanged,
    TaskAssigned,
    TaskDeleted,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRegistered => "USER_REGISTERED",
            Self::UserLogin => "USER_LOGIN",
            Self::UserLogout => "USER_LOGOUT",
            Self::PasswordReset => "PASSWORD_RESET",
            Self::PasswordChanged => "PASSWORD_CHANGED",
            Self::UserRoleChanged => "USER_ROLE_CHANGED",
            Self::UserStatusChanged => "USER_STATUS_CHANGED",
            Self::LoanCreated => "LOAN_CREATED",
            Self::LoanUpdated => "LOAN_UPDATED",
            Self::LoanSubmitted => "LOAN_SUBMITTED",
            Self::LoanStatusChanged => "LOAN_STATUS_CHANGED",
            Self::LoanDeleted => "LOAN_DELETED",
            Self::DocumentUploaded => "DOCUMENT_UPLOADED",
            Self::DocumentVerified => "DOCUMENT_VERIFIED",
            Self::DocumentDeleted => "DOCUMENT_DELETED",
            Self::TaskCreated => "TASK_CREATED",
            Self::TaskStatusChanged => "TASK_STATUS_CHANGED",
            Self::TaskAssigned => "TASK_ASSIGNED",
            Self::TaskDeleted => "TASK_DELETED",
        }
    }

    /// The kind of record the action applies to
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::UserRegistered
            | Self::UserLogin
            | Self::UserLogout
            | Self::PasswordReset
            | Self::PasswordChanged
            | Self::UserRoleChanged
            | Self::UserStatusChanged => "USER",
            Self::LoanCreated
            | Self::LoanUpdated
            | Self::LoanSubmitted
            | Self::LoanStatusChanged
            | Self::LoanDeleted => "LOAN_APPLICATION",
            Self::DocumentUploaded | Self::DocumentVerified | Self::DocumentDeleted => "DOCUMENT",
            Self::TaskCreated | Self::TaskStatusChanged | Self::TaskAssigned | Self::TaskDeleted => {
                "TASK"
            }
        }
    }
}
