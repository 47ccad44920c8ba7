//! # Document Loading
//!
//! LOAD support: fetch a document, recognise its format, and stream parsed
//! statements into the store.
//!
//! ## Context Defaulting
//!
//! For each parsed statement, in quads mode:
//! 1. A context on the parsed statement wins
//! 2. Otherwise the LOAD target, when given
//! 3. Otherwise the source URL itself
//!
//! Triples-mode stores never receive a context.

mod fetch;
mod format;
mod ntriples;

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{DocumentFetcher, FetchedDocument, FileFetcher, SchemeFetcher};
pub use format::{FormatRegistry, RdfFormat, StatementParser, StatementSink};
pub use ntriples::{NQuadsParser, write_nquads};

use crate::update::{GraphRef, UpdateExecutionContext};
use crate::{Term, UpdateError};
use std::fmt;
use std::io::BufReader;
use std::time::Instant;
use url::Url;

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub format: RdfFormat,
    /// Statements parsed and handed to the store.
    pub statements: usize,
}

/// Fetches, parses and stores remote documents.
pub struct DataLoader {
    fetcher: Box<dyn DocumentFetcher>,
    registry: FormatRegistry,
}

impl fmt::Debug for DataLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoader")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl DataLoader {
    pub fn new(fetcher: Box<dyn DocumentFetcher>, registry: FormatRegistry) -> Self {
        Self { fetcher, registry }
    }

    /// Scheme-dispatching fetcher and the default registry.
    pub fn with_defaults() -> Result<Self, UpdateError> {
        Ok(Self::new(
            Box::new(SchemeFetcher::new()?),
            FormatRegistry::default(),
        ))
    }

    #[must_use]
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Load `source` into the context's store.
    ///
    /// Statements are added one at a time as they are parsed. Any fetch,
    /// format or parse failure is reported as `LoadFailed`; statements added
    /// before the failure stay added.
    pub fn load(
        &self,
        source: &str,
        target: &GraphRef,
        ctx: &UpdateExecutionContext<'_>,
    ) -> Result<LoadReport, UpdateError> {
        let start = Instant::now();
        let failed = |reason: String| UpdateError::LoadFailed {
            url: source.to_string(),
            reason,
        };

        let url = Url::parse(source).map_err(|e| failed(e.to_string()))?;
        let document = self
            .fetcher
            .fetch(&url)
            .map_err(|e| failed(e.to_string()))?;

        let format = self
            .registry
            .detect(document.content_type.as_deref(), url.path())
            .ok_or_else(|| {
                failed(format!(
                    "format not recognized (content type {:?})",
                    document.content_type
                ))
            })?;
        let parser = self
            .registry
            .parser(format)
            .ok_or_else(|| failed(format!("parser not found for {}", format)))?;

        let default_context = if ctx.quads {
            Some(
                target
                    .resolved()
                    .cloned()
                    .unwrap_or_else(|| Term::iri(url.as_str())),
            )
        } else {
            None
        };

        let mut reader = BufReader::new(document.body);
        let mut added = 0usize;
        let parsed = parser.parse(&mut reader, &mut |statement| {
            let statement = statement.contextualize(ctx.quads, default_context.as_ref());
            ctx.store.add_statement(&statement)?;
            added += 1;
            Ok(())
        });
        if let Err(e) = parsed {
            tracing::debug!(added, "load aborted after partial write");
            return Err(failed(e.to_string()));
        }

        tracing::info!(
            url = %url,
            %format,
            statements = added,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "document loaded"
        );

        Ok(LoadReport {
            format,
            statements: added,
        })
    }
}
