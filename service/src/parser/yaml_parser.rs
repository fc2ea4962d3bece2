//! YAML template parser

use coinslot_core::CollectionTemplate;

use super::TemplateParser;
use crate::error::{Result, ServiceError};

/// YAML template parser
///
/// Zero-sized; deserializes straight into [`CollectionTemplate`] with
/// `serde_yaml`, so predicate syntax errors surface as decode errors at the
/// offending key.
#[derive(Default, Debug, Clone, Copy)]
pub struct YamlTemplateParser;

impl YamlTemplateParser {
    /// Create a new YAML parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TemplateParser for YamlTemplateParser {
    fn parse_str(&self, content: &str, origin: &str) -> Result<CollectionTemplate> {
        serde_yaml::from_str(content).map_err(|e| ServiceError::yaml(origin, &e))
    }
}
