//! Content bundle loading.
//!
//! A bundle is a JSON file with the authored NPC catalog and the default
//! new-game save. It is loaded once at startup and seeds the store.

use std::path::Path;

use affinitas_domain::ContentBundle;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Failed to read content bundle: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid content bundle: {0}")]
    Parse(#[from] serde_json::Error),
}

pub fn load_bundle(path: impl AsRef<Path>) -> Result<ContentBundle, ContentError> {
    let raw = std::fs::read_to_string(path)?;
    let bundle: ContentBundle = serde_json::from_str(&raw)?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_bundle_from_disk() {
        let json = r#"{
            "npcs": [{
                "id": "gus",
                "name": "Gus",
                "age": 54,
                "backstory": "Keeps the village bakery.",
                "affinitas": {"initial": 50, "increase": 0.5, "decrease": ["insults"]}
            }],
            "default_save": {
                "version": 1,
                "day_no": 1,
                "remaining_ap": 10,
                "npcs": [{"npc_id": "gus", "affinitas": 50}]
            }
        }"#;
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(json.as_bytes()).expect("write");

        let bundle = load_bundle(file.path()).expect("load");
        assert_eq!(bundle.npcs.len(), 1);
        assert_eq!(bundle.npcs[0].name, "Gus");
        assert_eq!(bundle.default_save.state.npcs[0].affinitas.value(), 50);
    }

    #[test]
    fn rejects_malformed_bundle() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"{\"npcs\": 42}").expect("write");
        assert!(matches!(
            load_bundle(file.path()),
            Err(ContentError::Parse(_))
        ));
    }
}
