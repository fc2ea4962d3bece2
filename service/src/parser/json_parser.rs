//! JSON template parser

use coinslot_core::CollectionTemplate;

use super::TemplateParser;
use crate::error::{Result, ServiceError};

/// JSON template parser for on-disk catalogs
#[derive(Default, Debug, Clone, Copy)]
pub struct JsonTemplateParser;

impl TemplateParser for JsonTemplateParser {
    fn parse_str(&self, content: &str, origin: &str) -> Result<CollectionTemplate> {
        serde_json::from_str(content).map_err(|e| ServiceError::json_catalog(origin, &e))
    }
}
