//! Immutable generation configuration.
//!
//! A [`PipelineBuilder`] gathers the source, the context and the ordered
//! stages; [`PipelineBuilder::build`] freezes the context and yields a
//! [`Pipeline`] that can be run against any number of writers.

use crate::context::{Context, ContextValue};
use crate::error::{Error, Result};
use crate::generator::{GenerationResult, Generator};
use crate::loader::AssetSource;
use crate::transform::{Stage, TransformerChain};
use crate::writer::OutputWriter;

/// Assembles a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    source: Option<Box<dyn AssetSource>>,
    context: Context,
    chain: TransformerChain,
    generator: Generator,
}

impl PipelineBuilder {
    pub fn source<S: AssetSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Replaces the context assembled so far.
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn variable(mut self, name: &str, value: impl Into<ContextValue>) -> Result<Self> {
        self.context.set(name, value)?;
        Ok(self)
    }

    /// Appends a stage to the chain.
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.chain = self.chain.stage(stage);
        self
    }

    /// Appends every stage of `chain`, after the stages added so far.
    pub fn chain(mut self, chain: TransformerChain) -> Self {
        self.chain.extend(chain);
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.generator = self.generator.with_jobs(jobs);
        self
    }

    /// # Errors
    /// * `Error::ConfigError` if no source was given
    pub fn build(self) -> Result<Pipeline> {
        let source = self
            .source
            .ok_or_else(|| Error::ConfigError("pipeline has no template source".to_string()))?;
        let mut context = self.context;
        context.freeze();
        Ok(Pipeline { source, context, chain: self.chain, generator: self.generator })
    }
}

/// A fully configured generation: source, frozen context and stages.
pub struct Pipeline {
    source: Box<dyn AssetSource>,
    context: Context,
    chain: TransformerChain,
    generator: Generator,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn source(&self) -> &dyn AssetSource {
        &*self.source
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn chain(&self) -> &TransformerChain {
        &self.chain
    }

    /// Same pipeline, transforming entries on `jobs` worker threads.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.generator = self.generator.with_jobs(jobs);
        self
    }

    /// Generates every entry of the source into `sink`.
    pub fn run(&self, sink: &dyn OutputWriter) -> GenerationResult {
        self.generator.run(self.source(), &self.chain, &self.context, sink)
    }
}
