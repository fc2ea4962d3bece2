//! Loading collection templates from the built-in catalog and directories

use std::path::{Path, PathBuf};

use coinslot_core::CollectionTemplate;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{parser_for_extension, TemplateParser, YamlTemplateParser};
use crate::error::Result;

/// Built-in catalog, in display order
const BUILTIN: &[(&str, &str)] = &[
    ("pennies.yaml", include_str!("../../catalog/pennies.yaml")),
    ("nickels.yaml", include_str!("../../catalog/nickels.yaml")),
    ("quarters.yaml", include_str!("../../catalog/quarters.yaml")),
    ("state_quarters.yaml", include_str!("../../catalog/state_quarters.yaml")),
    ("national_park_quarters.yaml", include_str!("../../catalog/national_park_quarters.yaml")),
    ("basic_half_dollars.yaml", include_str!("../../catalog/basic_half_dollars.yaml")),
    ("eisenhower_dollars.yaml", include_str!("../../catalog/eisenhower_dollars.yaml")),
    ("susan_b_anthony_dollars.yaml", include_str!("../../catalog/susan_b_anthony_dollars.yaml")),
    ("native_american_dollars.yaml", include_str!("../../catalog/native_american_dollars.yaml")),
    ("presidential_dollars.yaml", include_str!("../../catalog/presidential_dollars.yaml")),
    ("indian_head_cents.yaml", include_str!("../../catalog/indian_head_cents.yaml")),
    ("liberty_head_nickels.yaml", include_str!("../../catalog/liberty_head_nickels.yaml")),
    ("buffalo_nickels.yaml", include_str!("../../catalog/buffalo_nickels.yaml")),
    ("barber_dimes.yaml", include_str!("../../catalog/barber_dimes.yaml")),
    ("mercury_dimes.yaml", include_str!("../../catalog/mercury_dimes.yaml")),
    ("barber_quarters.yaml", include_str!("../../catalog/barber_quarters.yaml")),
    (
        "standing_liberty_quarters.yaml",
        include_str!("../../catalog/standing_liberty_quarters.yaml"),
    ),
    ("barber_half_dollars.yaml", include_str!("../../catalog/barber_half_dollars.yaml")),
    (
        "walking_liberty_half_dollars.yaml",
        include_str!("../../catalog/walking_liberty_half_dollars.yaml"),
    ),
    ("franklin_half_dollars.yaml", include_str!("../../catalog/franklin_half_dollars.yaml")),
    ("morgan_dollars.yaml", include_str!("../../catalog/morgan_dollars.yaml")),
    (
        "american_eagle_silver_dollars.yaml",
        include_str!("../../catalog/american_eagle_silver_dollars.yaml"),
    ),
    ("first_spouse_gold_coins.yaml", include_str!("../../catalog/first_spouse_gold_coins.yaml")),
    (
        "american_innovation_dollars.yaml",
        include_str!("../../catalog/american_innovation_dollars.yaml"),
    ),
    ("american_women_quarters.yaml", include_str!("../../catalog/american_women_quarters.yaml")),
    ("small_cents.yaml", include_str!("../../catalog/small_cents.yaml")),
    ("large_cents.yaml", include_str!("../../catalog/large_cents.yaml")),
    ("all_nickels.yaml", include_str!("../../catalog/all_nickels.yaml")),
    ("half_dimes.yaml", include_str!("../../catalog/half_dimes.yaml")),
    ("silver_dimes.yaml", include_str!("../../catalog/silver_dimes.yaml")),
    ("early_dimes.yaml", include_str!("../../catalog/early_dimes.yaml")),
    ("clad_quarters.yaml", include_str!("../../catalog/clad_quarters.yaml")),
    ("early_quarters.yaml", include_str!("../../catalog/early_quarters.yaml")),
    ("small_dollars.yaml", include_str!("../../catalog/small_dollars.yaml")),
    ("silver_half_dollars.yaml", include_str!("../../catalog/silver_half_dollars.yaml")),
    ("trimes.yaml", include_str!("../../catalog/trimes.yaml")),
    ("twenty_cents.yaml", include_str!("../../catalog/twenty_cents.yaml")),
    ("west_point.yaml", include_str!("../../catalog/west_point.yaml")),
    ("early_dollars.yaml", include_str!("../../catalog/early_dollars.yaml")),
    ("early_half_dollars.yaml", include_str!("../../catalog/early_half_dollars.yaml")),
    ("cartwheels.yaml", include_str!("../../catalog/cartwheels.yaml")),
    ("half_cents.yaml", include_str!("../../catalog/half_cents.yaml")),
    ("coin_sets.yaml", include_str!("../../catalog/coin_sets.yaml")),
    ("half_dollars.yaml", include_str!("../../catalog/half_dollars.yaml")),
    ("roosevelt_dimes.yaml", include_str!("../../catalog/roosevelt_dimes.yaml")),
    ("washington_quarters.yaml", include_str!("../../catalog/washington_quarters.yaml")),
];

/// Loader for collection templates
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogLoader;

impl CatalogLoader {
    /// Create a new loader
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Number of templates in the built-in catalog
    #[must_use]
    pub const fn builtin_count(&self) -> usize {
        BUILTIN.len()
    }

    /// Parse every template of the built-in catalog
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Catalog` if an embedded document is malformed.
    pub fn load_builtin(&self) -> Result<Vec<CollectionTemplate>> {
        BUILTIN
            .iter()
            .map(|(name, content)| YamlTemplateParser.parse_str(content, name))
            .collect()
    }

    /// Parse every `*.yaml`, `*.yml` and `*.json` file under `dir`
    ///
    /// Files are visited in file name order so registry order is stable.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Walk` if the directory cannot be traversed, and
    /// the parser's error for the first malformed file.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<CollectionTemplate>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "catalog directory does not exist");
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        let mut templates = Vec::new();
        for path in files {
            let Some(parser) = path
                .extension()
                .and_then(|s| s.to_str())
                .and_then(parser_for_extension)
            else {
                debug!(path = %path.display(), "skipping non-catalog file");
                continue;
            };
            let template = parser.parse_file(&path)?;
            debug!(path = %path.display(), type_id = %template.type_id, "catalog file loaded");
            templates.push(template);
        }
        Ok(templates)
    }
}
