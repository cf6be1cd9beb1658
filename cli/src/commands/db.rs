use anyhow::Result;

use mealplan_core::db::Database;

use super::helpers::print_table_status;

pub(crate) fn cmd_db_check(db: &Database, json: bool) -> Result<()> {
    let status = db.table_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_table_status(&status);
        let missing = status.iter().filter(|s| !s.exists).count();
        if missing > 0 {
            eprintln!("{missing} table(s) missing");
        }
    }
    Ok(())
}
