//! Catalog parsing
//!
//! Collection templates are declarative documents, YAML for the built-in
//! catalog and YAML or JSON for on-disk catalog directories. Every parser
//! implements [`TemplateParser`]; [`parser_for_extension`] picks one from a
//! file extension.

use std::path::Path;

use coinslot_core::CollectionTemplate;

use crate::error::Result;

pub mod catalog_loader;
pub mod json_parser;
pub mod yaml_parser;

pub use catalog_loader::CatalogLoader;
pub use json_parser::JsonTemplateParser;
pub use yaml_parser::YamlTemplateParser;

/// Trait for collection template parsers
pub trait TemplateParser: Send + Sync {
    /// Parse a template from string content
    ///
    /// `origin` names the document in error messages.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Catalog` with the decoder's location if the
    /// content is not a valid template.
    fn parse_str(&self, content: &str, origin: &str) -> Result<CollectionTemplate>;

    /// Parse a template from a file
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Io` if the file cannot be read, otherwise as
    /// [`TemplateParser::parse_str`].
    fn parse_file(&self, path: &Path) -> Result<CollectionTemplate> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::ServiceError::io(path, e))?;
        self.parse_str(&content, &path.display().to_string())
    }
}

/// Parser for a file extension, `None` for unsupported formats
pub fn parser_for_extension(extension: &str) -> Option<&'static dyn TemplateParser> {
    match extension {
        "yaml" | "yml" => Some(&YamlTemplateParser),
        "json" => Some(&JsonTemplateParser),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_for_extension() {
        assert!(parser_for_extension("yaml").is_some());
        assert!(parser_for_extension("yml").is_some());
        assert!(parser_for_extension("json").is_some());
        assert!(parser_for_extension("toml").is_none());
    }
}
