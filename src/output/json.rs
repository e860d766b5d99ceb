use crate::monitor::RunSummary;
use anyhow::Result;

pub fn print_json(summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    println!("{}", json);
    Ok(())
}
