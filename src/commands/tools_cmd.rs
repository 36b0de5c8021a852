use anyhow::Result;

use crate::catalog::{ToolCatalog, required_params};
use crate::config::Config;

pub fn handle_tools(cfg: &Config) -> Result<()> {
    let catalog = ToolCatalog::load_or_builtin(&cfg.tools_path)?;
    if cfg.tools_path.exists() {
        println!("Tool catalog: {}", cfg.tools_path.display());
    } else {
        println!("Tool catalog: built-in ({} not found)", cfg.tools_path.display());
    }
    for spec in catalog.specs() {
        let required = required_params(spec);
        println!("- {}({})", spec.function.name, required.join(", "));
        if !spec.function.description.is_empty() {
            println!("    {}", spec.function.description);
        }
    }
    Ok(())
}
