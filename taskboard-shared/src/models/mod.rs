/// Database models
///
/// Every model follows the same shape: a `FromRow` struct, `Create*` /
/// `Update*` inputs, and static async methods taking a `&PgPool`.
/// Deletion is soft (`delete_date`); `find_*` and `list_*` only return live rows.
///
/// # Models
///
/// - `User`: principal profile
/// - `Company`: hierarchy root, one live company per owner
/// - `Board` / `BoardUser`: boards and their listed users
/// - `Column`: ordered board columns
/// - `Task`: hierarchy leaf
/// - `TaskType`: per-company reference data
/// - `Role` / `Permission`: named permission sets
/// - `Membership`: role grant on one resource

pub mod board;
pub mod column;
pub mod company;
pub mod membership;
pub mod role;
pub mod task;
pub mod task_type;
pub mod user;
