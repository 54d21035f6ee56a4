use std::path::Path;

use rommap_core::persist;
use rommap_core::xdf;

use crate::CommandError;

/// Render a persisted maps session as an XDF document.
pub fn export_xdf_command(maps_path: &str, out: &str, json: bool) -> Result<(), CommandError> {
    let maps = persist::load_maps(Path::new(maps_path))?;
    let tool = format!("rommap v{}", rommap_core::version());
    let document = xdf::render_xdf(&maps, &tool);
    persist::save_xdf(Path::new(out), &document)?;

    if json {
        let payload = serde_json::json!({
            "maps": maps_path,
            "count": maps.len(),
            "out": out,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{payload}"),
        }
        return Ok(());
    }

    println!("Exported {} map(s) from {}", maps.len(), maps_path);
    println!("  Wrote {}", out);

    Ok(())
}
