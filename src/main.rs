//! kiln's application entry point.
//! Parses the command line, assembles the generation pipeline and reports
//! the outcome of the run.

use std::path::{Path, PathBuf};

use kiln::{
    app::{self, AppOptions},
    cli::{get_args, Args, Command, GenerationArgs},
    config::load_manifest,
    error::{default_error_handler, Result},
    generator::GenerationResult,
    loader::LocalSource,
    pipeline::Pipeline,
    writer::FsWriter,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Builds the pipeline for the selected command and runs it.
fn run(args: Args) -> Result<()> {
    let (pipeline, output_root, generation) = match args.command {
        Command::New { template, output_dir, vars, generation } => {
            let source = LocalSource::new(&template)?;
            println!("Using template from the {}", kiln::loader::AssetSource::describe(&source));
            let manifest = load_manifest(&template)?;
            let pipeline = Pipeline::builder()
                .source(source)
                .context(manifest.context(vars)?)
                .chain(manifest.chain()?)
                .jobs(generation.jobs)
                .build()?;
            (pipeline, output_dir, generation)
        }
        Command::App { module_path, output_dir, address_prefix, generation } => {
            let options = AppOptions::from_module_path(&module_path, address_prefix.as_deref())?;
            let output_root = output_dir.unwrap_or_else(|| PathBuf::from(&options.app_name));
            let pipeline = app::pipeline(&options)?.with_jobs(generation.jobs);
            (pipeline, output_root, generation)
        }
    };

    let result = generate(&pipeline, &output_root, &generation);
    report(result, &output_root, generation.dry_run);
    Ok(())
}

/// Runs the pipeline into `output_root`. A dry run checks the existing tree
/// and applies the overwrite policy, but writes nothing.
fn generate(pipeline: &Pipeline, output_root: &Path, generation: &GenerationArgs) -> GenerationResult {
    let writer =
        FsWriter::new(output_root, generation.policy).with_dry_run(generation.dry_run);
    pipeline.run(&writer)
}

/// Prints the outcome of a run; exits with status 1 if it failed.
fn report(result: GenerationResult, output_root: &Path, dry_run: bool) {
    let prefix = if dry_run { "[DRY RUN] " } else { "" };
    for path in &result.written {
        println!("{prefix}Written: '{}'", output_root.join(path).display());
    }
    for path in &result.skipped {
        println!("{prefix}Skipped: '{}' (already exists)", output_root.join(path).display());
    }

    if let Some(failure) = result.error {
        if !result.written.is_empty() && !dry_run {
            eprintln!("The following files were written before the failure:");
            for path in &result.written {
                eprintln!("  {}", output_root.join(path).display());
            }
        }
        default_error_handler(failure);
    }

    println!("{prefix}Generation completed successfully in {}.", output_root.display());
}
