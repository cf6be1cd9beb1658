mod db;
mod helpers;
mod plan;
mod recipes;
mod user;

pub(crate) use db::cmd_db_check;
pub(crate) use plan::cmd_plan;
pub(crate) use recipes::{cmd_recipes_list, cmd_recipes_search, cmd_recipes_show};
pub(crate) use user::cmd_user_add;
