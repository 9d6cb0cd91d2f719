//! Seed the plate catalog from a YAML file.
//!
//! ```yaml
//! plates:
//!   - text: KBB100K
//!     tier: special
//!   - text: BOSS1
//!     tier: prestige
//!     price: 95000
//!     description: Launch edition
//! ```
//!
//! The whole file is validated before the database is touched. Texts already
//! in the catalog are skipped, so seeding twice is harmless.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use plateshop_core::{PlateText, PlateTier, Price, price_for};
use plateshop_storefront::db::{CatalogStore, PgStore, RepositoryError};
use plateshop_storefront::models::NewCatalogEntry;

use super::connect;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedFile {
    plates: Vec<SeedPlate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedPlate {
    text: String,
    tier: String,
    price: Option<i64>,
    description: Option<String>,
}

/// Validate every plate, collecting all problems instead of stopping at the first.
fn validate(file: &SeedFile) -> Result<Vec<NewCatalogEntry>, Vec<String>> {
    let mut entries = Vec::with_capacity(file.plates.len());
    let mut errors = Vec::new();

    for (index, plate) in file.plates.iter().enumerate() {
        let entry = plate
            .tier
            .parse::<PlateTier>()
            .and_then(|tier| Ok((tier, PlateText::parse_for_tier(&plate.text, tier)?)))
            .map_err(|e| e.to_string())
            .and_then(|(tier, text)| {
                let price = plate
                    .price
                    .map_or(Ok(price_for(tier)), Price::new)
                    .map_err(|e| e.to_string())?;
                Ok(NewCatalogEntry {
                    text,
                    tier,
                    price,
                    description: plate.description.clone(),
                })
            });

        match entry {
            Ok(entry) if entries.iter().any(|e: &NewCatalogEntry| e.text == entry.text) => {
                errors.push(format!("plates[{index}]: duplicate text {}", entry.text));
            }
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(format!("plates[{index}] ({}): {e}", plate.text)),
        }
    }

    if errors.is_empty() {
        Ok(entries)
    } else {
        Err(errors)
    }
}

/// Seed catalog entries from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any plate is
/// invalid, or a database operation fails.
pub async fn catalog(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    let entries = match validate(&file) {
        Ok(entries) => entries,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    info!(plates = entries.len(), "Catalog validated successfully");
    if dry_run {
        return Ok(());
    }

    let store = PgStore::new(connect().await?);
    let mut created = 0_usize;
    let mut skipped = 0_usize;

    for entry in &entries {
        match store.create_catalog_entry(entry).await {
            Ok(_) => created += 1,
            Err(RepositoryError::Conflict(_)) => {
                warn!(text = %entry.text, "Already in catalog, skipping");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(created, skipped, "Catalog seeding complete");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> SeedFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_validate_defaults_price_to_tier() {
        let file = parse(
            r"
plates:
  - text: kbb100k
    tier: special
  - text: BOSS1
    tier: prestige
    price: 95000
",
        );
        let entries = validate(&file).unwrap();
        assert_eq!(entries[0].text.as_str(), "KBB100K");
        assert_eq!(entries[0].price, price_for(PlateTier::Special));
        assert_eq!(entries[1].price.amount(), 95_000);
    }

    #[test]
    fn test_validate_collects_every_error() {
        let file = parse(
            r"
plates:
  - text: NOZEROS
    tier: special
  - text: BOSS1
    tier: gold
  - text: BOSS2
    tier: prestige
  - text: boss2
    tier: prestige
",
        );
        let errors = validate(&file).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[2].contains("duplicate"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: Result<SeedFile, _> =
            serde_yaml::from_str("plates:\n  - text: BOSS1\n    tier: prestige\n    colour: red\n");
        assert!(result.is_err());
    }
}
