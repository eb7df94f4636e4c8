//! Permission names checked by the domain services
//!
//! Names are opaque and matched exactly against `permissions.name`.

pub const COMPANY_VIEW: &str = "Company.View";
pub const COMPANY_EDIT: &str = "Company.Edit";
pub const COMPANY_DELETE: &str = "Company.Delete";
pub const COMPANY_MANAGE_MEMBERS: &str = "Company.ManageMembers";

pub const BOARD_CREATE: &str = "Board.Create";
pub const BOARD_VIEW: &str = "Board.View";
pub const BOARD_EDIT: &str = "Board.Edit";
pub const BOARD_DELETE: &str = "Board.Delete";
pub const BOARD_MANAGE_USERS: &str = "Board.ManageUsers";

pub const COLUMN_EDIT: &str = "Column.Edit";

pub const TASK_CREATE: &str = "Task.Create";
pub const TASK_VIEW: &str = "Task.View";
pub const TASK_EDIT: &str = "Task.Edit";
pub const TASK_DELETE: &str = "Task.Delete";

/// Global administrative permission, checked on `ResourceRef::global()`
pub const USER_INVITE: &str = "User.Invite";
