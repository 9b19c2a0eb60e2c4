use std::path::Path;

use color_eyre::{Result, eyre::eyre};
use intake::FormSchema;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

pub const DEFAULT_SCHEMA: &str = "service-request.json";

/// Load `path` if given, otherwise the embedded service request schema.
pub fn load_schema(path: Option<&Path>) -> Result<FormSchema> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| eyre!("reading schema {}: {e}", path.display()))?,
        None => {
            let file = Assets::get(DEFAULT_SCHEMA)
                .ok_or_else(|| eyre!("embedded schema {DEFAULT_SCHEMA} missing"))?;
            String::from_utf8(file.data.into_owned())?
        }
    };
    Ok(FormSchema::from_json(&raw)?)
}
