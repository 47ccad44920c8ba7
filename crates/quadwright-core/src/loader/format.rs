//! Document formats and the registry that recognises them.

use super::ntriples::NQuadsParser;
use crate::{Statement, UpdateError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;

/// RDF serialisation formats the registry can recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RdfFormat {
    NTriples,
    NQuads,
    Turtle,
    TriG,
    RdfXml,
    JsonLd,
}

impl RdfFormat {
    pub const ALL: [RdfFormat; 6] = [
        Self::NTriples,
        Self::NQuads,
        Self::Turtle,
        Self::TriG,
        Self::RdfXml,
        Self::JsonLd,
    ];

    /// The canonical MIME type.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::NTriples => "application/n-triples",
            Self::NQuads => "application/n-quads",
            Self::Turtle => "text/turtle",
            Self::TriG => "application/trig",
            Self::RdfXml => "application/rdf+xml",
            Self::JsonLd => "application/ld+json",
        }
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NTriples => "N-Triples",
            Self::NQuads => "N-Quads",
            Self::Turtle => "Turtle",
            Self::TriG => "TriG",
            Self::RdfXml => "RDF/XML",
            Self::JsonLd => "JSON-LD",
        };
        f.write_str(name)
    }
}

/// Receives each parsed statement as soon as it is read.
pub type StatementSink<'a> = dyn FnMut(Statement) -> Result<(), UpdateError> + 'a;

/// A streaming parser for one format.
pub trait StatementParser: Send + Sync {
    /// Parse the whole stream, handing statements to `sink` one at a time.
    ///
    /// Stops at the first parse error or sink error. Returns the number of
    /// statements delivered.
    fn parse(&self, reader: &mut dyn BufRead, sink: &mut StatementSink<'_>)
    -> Result<u64, UpdateError>;
}

/// Lookup of formats by MIME type and file extension, plus their parsers.
pub struct FormatRegistry {
    mime_types: BTreeMap<String, RdfFormat>,
    extensions: BTreeMap<String, RdfFormat>,
    parsers: BTreeMap<RdfFormat, Box<dyn StatementParser>>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("mime_types", &self.mime_types)
            .field("extensions", &self.extensions)
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for FormatRegistry {
    /// Every format recognised; parsers for N-Triples and N-Quads.
    fn default() -> Self {
        let mut registry = Self::empty();

        for format in RdfFormat::ALL {
            registry.register_mime_type(format.mime_type(), format);
        }
        registry.register_mime_type("text/plain", RdfFormat::NTriples);
        registry.register_mime_type("text/x-nquads", RdfFormat::NQuads);
        registry.register_mime_type("application/x-turtle", RdfFormat::Turtle);
        registry.register_mime_type("application/xml", RdfFormat::RdfXml);

        for (ext, format) in [
            ("nt", RdfFormat::NTriples),
            ("nq", RdfFormat::NQuads),
            ("ttl", RdfFormat::Turtle),
            ("trig", RdfFormat::TriG),
            ("rdf", RdfFormat::RdfXml),
            ("owl", RdfFormat::RdfXml),
            ("jsonld", RdfFormat::JsonLd),
        ] {
            registry.register_extension(ext, format);
        }

        registry.register_parser(RdfFormat::NTriples, Box::new(NQuadsParser::ntriples()));
        registry.register_parser(RdfFormat::NQuads, Box::new(NQuadsParser::nquads()));
        registry
    }
}

impl FormatRegistry {
    /// A registry that recognises nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            mime_types: BTreeMap::new(),
            extensions: BTreeMap::new(),
            parsers: BTreeMap::new(),
        }
    }

    pub fn register_mime_type(&mut self, mime_type: &str, format: RdfFormat) {
        self.mime_types
            .insert(mime_type.trim().to_ascii_lowercase(), format);
    }

    pub fn register_extension(&mut self, extension: &str, format: RdfFormat) {
        self.extensions
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), format);
    }

    pub fn register_parser(&mut self, format: RdfFormat, parser: Box<dyn StatementParser>) {
        self.parsers.insert(format, parser);
    }

    /// Look up a declared content type. Parameters such as `charset` are ignored.
    #[must_use]
    pub fn for_mime_type(&self, content_type: &str) -> Option<RdfFormat> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.mime_types.get(&essence).copied()
    }

    /// Look up the extension of the last segment of a path.
    #[must_use]
    pub fn for_file_name(&self, path: &str) -> Option<RdfFormat> {
        let name = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = name.rsplit_once('.')?;
        self.extensions.get(&ext.to_ascii_lowercase()).copied()
    }

    /// The declared content type wins when recognised; the path extension
    /// is the fallback.
    #[must_use]
    pub fn detect(&self, content_type: Option<&str>, path: &str) -> Option<RdfFormat> {
        content_type
            .and_then(|ct| self.for_mime_type(ct))
            .or_else(|| self.for_file_name(path))
    }

    #[must_use]
    pub fn parser(&self, format: RdfFormat) -> Option<&dyn StatementParser> {
        self.parsers.get(&format).map(|p| p.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_lookup_ignores_parameters_and_case() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.for_mime_type("Application/N-Quads; charset=utf-8"),
            Some(RdfFormat::NQuads)
        );
        assert_eq!(registry.for_mime_type("text/plain"), Some(RdfFormat::NTriples));
        assert_eq!(registry.for_mime_type("text/html"), None);
    }

    #[test]
    fn extension_lookup_uses_last_segment() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.for_file_name("/data/v1.2/people.TTL"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(registry.for_file_name("/data/v1.2/people"), None);
    }

    #[test]
    fn unrecognised_content_type_falls_back_to_extension() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.detect(Some("application/octet-stream"), "/dump.nq"),
            Some(RdfFormat::NQuads)
        );
        assert_eq!(
            registry.detect(Some("text/turtle"), "/dump.nq"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(registry.detect(None, "/dump"), None);
    }

    #[test]
    fn only_line_formats_have_parsers() {
        let registry = FormatRegistry::default();
        assert!(registry.parser(RdfFormat::NTriples).is_some());
        assert!(registry.parser(RdfFormat::NQuads).is_some());
        assert!(registry.parser(RdfFormat::RdfXml).is_none());
    }
}
