//! Orchestration of a generation run.
//!
//! A run has three phases. Every entry is first listed and transformed; the
//! first failure in enumeration order aborts the run. The planned paths are
//! then checked against the destination. Only when both succeed is anything
//! committed, one entry at a time, in enumeration order.

use indexmap::IndexSet;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::context::Context;
use crate::error::Error;
use crate::loader::{AssetSource, TemplateEntry};
use crate::transform::{StageFailure, TransformerChain};
use crate::writer::{resolve_within, OutputWriter, WriteOutcome};

/// The failure that aborted a run.
#[derive(Debug)]
pub struct Failure {
    /// Source path of the entry being processed, if any.
    pub entry: Option<String>,
    /// Name of the stage that failed, if the failure happened in the chain.
    pub stage: Option<String>,
    pub error: Error,
}

impl Failure {
    fn listing(error: Error) -> Self {
        Self { entry: None, stage: None, error }
    }

    fn stage(entry: &str, failure: StageFailure) -> Self {
        Self { entry: Some(entry.to_string()), stage: Some(failure.stage), error: failure.error }
    }

    fn entry(entry: &str, error: Error) -> Self {
        Self { entry: Some(entry.to_string()), stage: None, error }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.entry, &self.stage) {
            (Some(entry), Some(stage)) => write!(
                f,
                "{} in stage '{}' while processing '{}': {}",
                self.error.kind(),
                stage,
                entry,
                self.error
            ),
            (Some(entry), None) => {
                write!(f, "{} while processing '{}': {}", self.error.kind(), entry, self.error)
            }
            _ => write!(f, "{} while listing templates: {}", self.error.kind(), self.error),
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of a generation run.
#[derive(Debug, Default)]
pub struct GenerationResult {
    /// Destination paths committed by this run, in commit order.
    pub written: IndexSet<String>,
    /// Destination paths left untouched because they already existed.
    pub skipped: IndexSet<String>,
    /// Source paths whose rendered path was empty, so they were not generated.
    pub omitted: IndexSet<String>,
    pub error: Option<Failure>,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Checks that a rendered path has no empty parts.
///
/// A path part rendered from a falsy conditional, such as
/// `{% if tests %}tests{% endif %}/lib.rs`, leaves an empty part behind; such
/// entries are not generated.
pub fn is_rendered_path_valid(path: &str) -> bool {
    !path.is_empty() && path.split('/').all(|part| !part.is_empty())
}

/// A transformed entry together with the source path it came from.
struct Planned {
    source: String,
    entry: TemplateEntry,
}

type Transformed = (String, std::result::Result<TemplateEntry, StageFailure>);

/// Drives entries from a source through a chain into a writer.
#[derive(Debug, Clone)]
pub struct Generator {
    jobs: usize,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// A generator transforming entries on the calling thread.
    pub fn new() -> Self {
        Self { jobs: 1 }
    }

    /// Transforms entries on `jobs` worker threads. Failures are still
    /// reported in enumeration order and commits stay sequential.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn run(
        &self,
        source: &dyn AssetSource,
        chain: &TransformerChain,
        context: &Context,
        sink: &dyn OutputWriter,
    ) -> GenerationResult {
        info!("Generating from the {}", source.describe());
        let mut result = GenerationResult::default();

        let planned = match self.plan(source, chain, context, &mut result.omitted) {
            Ok(planned) => planned,
            Err(failure) => return abort(result, failure),
        };
        debug!("Planned {} entries, omitted {}", planned.len(), result.omitted.len());

        if let Err(failure) = preflight(&planned, sink) {
            return abort(result, failure);
        }

        for Planned { source, entry } in planned {
            match sink.write(&entry.path, &entry.content) {
                Ok(WriteOutcome::Written) => {
                    result.written.insert(entry.path);
                }
                Ok(WriteOutcome::Skipped) => {
                    result.skipped.insert(entry.path);
                }
                Err(error) => return abort(result, Failure::entry(&source, error)),
            }
        }

        info!("Generated {} files, skipped {}", result.written.len(), result.skipped.len());
        result
    }

    fn plan(
        &self,
        source: &dyn AssetSource,
        chain: &TransformerChain,
        context: &Context,
        omitted: &mut IndexSet<String>,
    ) -> Result<Vec<Planned>, Failure> {
        let mut planned = Vec::new();

        if self.jobs == 1 {
            for listed in source.list() {
                let entry = listed.map_err(Failure::listing)?;
                let source_path = entry.path.clone();
                let transformed = chain.apply(entry, context);
                accept((source_path, transformed), &mut planned, omitted)?;
            }
            return Ok(planned);
        }

        // A listing failure is reported only after every entry before it.
        let mut entries = Vec::new();
        let mut listing_error = None;
        for listed in source.list() {
            match listed {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    listing_error = Some(error);
                    break;
                }
            }
        }

        for transformed in self.transform_parallel(entries, chain, context) {
            accept(transformed, &mut planned, omitted)?;
        }
        match listing_error {
            Some(error) => Err(Failure::listing(error)),
            None => Ok(planned),
        }
    }

    /// Applies the chain to every entry on scoped worker threads, returning
    /// results in the order of `entries`.
    fn transform_parallel(
        &self,
        entries: Vec<TemplateEntry>,
        chain: &TransformerChain,
        context: &Context,
    ) -> Vec<Transformed> {
        let chunk_size = entries.len().div_ceil(self.jobs).max(1);
        let mut chunks = Vec::new();
        let mut remaining = entries.into_iter();
        loop {
            let chunk: Vec<TemplateEntry> = remaining.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            chunks.push(chunk);
        }
        debug!("Transforming on {} workers", chunks.len());

        std::thread::scope(|scope| {
            let workers: Vec<_> = chunks
                .into_iter()
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .into_iter()
                            .map(|entry| {
                                let source_path = entry.path.clone();
                                (source_path, chain.apply(entry, context))
                            })
                            .collect::<Vec<Transformed>>()
                    })
                })
                .collect();

            workers
                .into_iter()
                .flat_map(|worker| {
                    worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }
}

fn accept(
    (source, transformed): Transformed,
    planned: &mut Vec<Planned>,
    omitted: &mut IndexSet<String>,
) -> Result<(), Failure> {
    let entry = transformed.map_err(|failure| Failure::stage(&source, failure))?;
    if is_rendered_path_valid(&entry.path) {
        debug!("Transformed '{}' -> '{}'", source, entry.path);
        planned.push(Planned { source, entry });
    } else {
        debug!("Omitting '{}': rendered path '{}' is empty", source, entry.path);
        omitted.insert(source);
    }
    Ok(())
}

/// Checks every planned path against the writer, and against each other: no
/// two entries may share a target, and no target may sit below another
/// entry's file or replace a directory other entries are written into.
fn preflight(planned: &[Planned], sink: &dyn OutputWriter) -> Result<(), Failure> {
    let mut files = HashSet::new();
    let mut dirs = HashSet::new();
    for Planned { source, entry } in planned {
        let collision = || Failure::entry(source, Error::Collision { path: entry.path.clone() });

        sink.check(&entry.path).map_err(|error| Failure::entry(source, error))?;
        let target =
            resolve_within(Path::new(""), &entry.path).map_err(|error| Failure::entry(source, error))?;

        let parents: Vec<PathBuf> = target
            .ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect();
        if dirs.contains(&target) || parents.iter().any(|p| files.contains(p)) {
            return Err(collision());
        }
        if !files.insert(target) {
            return Err(collision());
        }
        dirs.extend(parents);
    }
    Ok(())
}

fn abort(mut result: GenerationResult, failure: Failure) -> GenerationResult {
    warn!("Generation aborted: {failure}");
    result.error = Some(failure);
    result
}
