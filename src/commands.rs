//! Subcommand implementations.
//!
//! Each command takes the shared [`Context`] and writes its report to the
//! given writer. A `SRC`/`DST` argument resolves to a stored catalogue
//! first, then a directory, then a single file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{NaiveDateTime, Utc};
use dialoguer::Confirm;
use thiserror::Error;

use crate::actions::{
    check_overlap, plan_delete, plan_transfer, BatchReport, Executor, Operation, StdFileOps,
};
use crate::catalogue::{Catalogue, Storage, StorageError, Target, Workspace};
use crate::cli::{
    CreateArgs, DeleteCatalogueArgs, DeleteDuplicatesArgs, InspectArgs, OutputFormat,
    TransferArgs,
};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderConfig};
use crate::error::ExitCode;
use crate::media::{Classifier, DateExtractor, SystemMedia};
use crate::naming::PathResolver;
use crate::output::{
    text, GroupListing, InspectReport, JsonOutput, JsonReport, Summary, TransferReport,
};
use crate::progress::ProgressCallback;
use crate::signal::ShutdownHandler;

/// Command-level failures, reported before any file is touched.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("\"{0}\" is neither a catalogue nor an existing path")]
    UnknownSource(String),

    #[error("\"{0}\" is neither a catalogue nor an existing directory")]
    NotAnIndex(String),

    #[error("\"{0}\" is a file but no destination was given")]
    FileWithoutDestination(String),

    #[error("no format pattern: pass --format-pattern or set format_pattern in the configuration")]
    NoFormatPattern,

    #[error("there is already a catalogue named \"{name}\" pointing to {root}")]
    CatalogueExists { name: String, root: PathBuf },

    #[error("catalogue \"{0}\" not found")]
    CatalogueNotFound(String),

    #[error("{0} is not an existing directory")]
    NotADirectory(PathBuf),
}

/// Everything a command needs.
pub struct Context {
    pub config: Config,
    pub storage: Storage,
    pub ws: Workspace,
    pub classifier: Arc<dyn Classifier>,
    pub dates: Box<dyn DateExtractor>,
    pub shutdown: ShutdownHandler,
    pub progress: Option<Arc<dyn ProgressCallback>>,
    /// Skip confirmation prompts
    pub assume_yes: bool,
    /// Rescan catalogues even when their file count matches
    pub rescan: bool,
    /// Time the command started, in UTC; rendered by the fallback template
    pub started_at: NaiveDateTime,
}

impl Context {
    #[must_use]
    pub fn new(config: Config, shutdown: ShutdownHandler) -> Self {
        Self {
            storage: Storage::new(config.storage_location.clone()),
            config,
            ws: Workspace::new(),
            classifier: Arc::new(SystemMedia),
            dates: Box::new(SystemMedia),
            shutdown,
            progress: None,
            assume_yes: false,
            rescan: false,
            started_at: Utc::now().naive_utc(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn with_assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    #[must_use]
    pub fn with_rescan(mut self, rescan: bool) -> Self {
        self.rescan = rescan;
        self
    }

    #[must_use]
    pub fn with_media(
        mut self,
        classifier: Arc<dyn Classifier>,
        dates: Box<dyn DateExtractor>,
    ) -> Self {
        self.classifier = classifier;
        self.dates = dates;
        self
    }

    fn finder(&self, media_only: bool) -> DuplicateFinder {
        let mut config = FinderConfig::default()
            .with_media_only(media_only)
            .with_classifier(Arc::clone(&self.classifier))
            .with_shutdown_flag(self.shutdown.get_flag());
        if let Some(progress) = &self.progress {
            config = config.with_progress_callback(Arc::clone(progress));
        }
        DuplicateFinder::new(config)
    }

    /// Catalogue > Directory > File, or `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing directory cannot be scanned.
    pub fn resolve_target(&mut self, value: &str) -> Result<Option<Target>> {
        let walker = self.config.walker();
        match self.storage.load(&mut self.ws, value, &walker, self.rescan) {
            Ok(Some(catalogue)) => return Ok(Some(Target::Catalogue(catalogue))),
            Ok(None) | Err(StorageError::InvalidName(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let path = Path::new(value);
        let Ok(path) = path.canonicalize() else {
            return Ok(None);
        };
        if path.is_dir() {
            let index = self
                .ws
                .scan(&path, &walker, self.progress.as_deref())
                .with_context(|| format!("Failed to scan {}", path.display()))?;
            return Ok(Some(Target::Directory(index)));
        }
        if path.is_file() {
            let size = path
                .metadata()
                .with_context(|| format!("Failed to read {}", path.display()))?
                .len();
            return Ok(Some(Target::File(self.ws.insert_file(path, size))));
        }
        Ok(None)
    }

    /// Ask for confirmation unless `-y` was given.
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }

    fn save(&self, target: &Target) -> Result<()> {
        if let Some(catalogue) = target.as_catalogue() {
            self.storage
                .save(&self.ws, catalogue)
                .with_context(|| format!("Failed to save catalogue \"{}\"", catalogue.name()))?;
        }
        Ok(())
    }
}

/// Summarize a catalogue or directory and list its duplicates.
///
/// A catalogue is saved afterwards so computed fingerprints are kept.
///
/// # Errors
///
/// Fails when `SRC` is not a catalogue or directory, or when writing fails.
pub fn inspect<W: Write>(ctx: &mut Context, args: &InspectArgs, out: &mut W) -> Result<ExitCode> {
    let target = ctx
        .resolve_target(&args.src)?
        .ok_or_else(|| CommandError::NotAnIndex(args.src.clone()))?;
    let Some(index) = target.index() else {
        return Err(CommandError::NotAnIndex(args.src.clone()).into());
    };

    let media_only = !args.all;
    let finder = ctx.finder(media_only);
    let (mut groups, stats) = finder.find_in(&mut ctx.ws, index);
    for group in &mut groups {
        group.sort_shortest_name_first(&ctx.ws);
    }

    let root = target.root(&ctx.ws);
    let classifier = Arc::clone(&ctx.classifier);
    let mut files = ctx.ws.index(index).files().to_vec();
    if media_only {
        files.retain(|&id| ctx.ws.media_type(id, classifier.as_ref()).is_media());
    }
    let name = match target.as_catalogue() {
        Some(catalogue) => format!("{} : {}", catalogue.name(), root.display()),
        None => root.display().to_string(),
    };
    let summary = Summary::build(&mut ctx.ws, name, &files, &groups, classifier.as_ref());

    let exit_code = if stats.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    };
    let report = InspectReport {
        catalogue: target.as_catalogue().map(|c| c.name().to_string()),
        duplicates: GroupListing::sorted(&ctx.ws, &groups, &root),
        root,
        summary,
        stats,
    };
    match args.output {
        OutputFormat::Text => text::write_inspect(out, &report)?,
        OutputFormat::Json => JsonOutput::new(JsonReport::Inspect(report), exit_code)
            .write_to(out, true)?,
    }

    ctx.save(&target)?;
    Ok(exit_code)
}

/// Scan a directory and store it as a new catalogue.
///
/// # Errors
///
/// Fails when the name is taken or invalid, no format pattern is
/// configured, or the directory cannot be scanned.
pub fn create_catalogue<W: Write>(
    ctx: &mut Context,
    args: &CreateArgs,
    out: &mut W,
) -> Result<ExitCode> {
    let root = match &args.src {
        Some(src) => src.clone(),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let root = root
        .canonicalize()
        .ok()
        .filter(|p| p.is_dir())
        .ok_or_else(|| CommandError::NotADirectory(root.clone()))?;

    let format_pattern = ctx
        .config
        .format_pattern
        .clone()
        .ok_or(CommandError::NoFormatPattern)?;

    ctx.storage.catalogue_path(&args.name)?;
    if ctx.storage.exists(&args.name) {
        let existing = ctx
            .storage
            .read(&args.name)
            .map(|snapshot| snapshot.path)
            .unwrap_or_default();
        return Err(CommandError::CatalogueExists {
            name: args.name.clone(),
            root: existing,
        }
        .into());
    }

    let walker = ctx.config.walker();
    let catalogue = Catalogue::create(
        &mut ctx.ws,
        &args.name,
        &root,
        format_pattern,
        ctx.config.unknown_format_pattern.clone(),
        &walker,
    )
    .with_context(|| format!("Failed to scan {}", root.display()))?;

    let files = ctx.ws.index(catalogue.index).files().to_vec();
    if !files.is_empty() {
        let (mut groups, _) = ctx.finder(true).find_in(&mut ctx.ws, catalogue.index);
        for group in &mut groups {
            group.sort_shortest_name_first(&ctx.ws);
        }
        let classifier = Arc::clone(&ctx.classifier);
        let summary = Summary::build(
            &mut ctx.ws,
            catalogue.name(),
            &files,
            &groups,
            classifier.as_ref(),
        );
        text::write_summary(out, &summary)?;
        writeln!(out)?;
    }

    writeln!(out, "Catalogue name: {}", catalogue.name())?;
    writeln!(out, "Catalogue location: {}", catalogue.info.root.display())?;
    writeln!(out, "format_pattern: {}", catalogue.info.format_pattern)?;
    match &catalogue.info.unknown_format_pattern {
        Some(pattern) => writeln!(out, "unknown_format_pattern: {pattern}")?,
        None => writeln!(out, "unknown_format_pattern: (none)")?,
    }

    let target = Target::Catalogue(catalogue);
    ctx.save(&target)?;
    Ok(ExitCode::Success)
}

/// Forget a stored catalogue. Its files are left alone.
///
/// # Errors
///
/// Fails when the catalogue does not exist or cannot be removed.
pub fn delete_catalogue<W: Write>(
    ctx: &mut Context,
    args: &DeleteCatalogueArgs,
    out: &mut W,
) -> Result<ExitCode> {
    let snapshot = match ctx.storage.read(&args.name) {
        Ok(snapshot) => snapshot,
        Err(StorageError::NotFound(_)) => {
            return Err(CommandError::CatalogueNotFound(args.name.clone()).into())
        }
        Err(e) => return Err(e.into()),
    };

    writeln!(
        out,
        "Deleting catalogue \"{}\" pointing to {}. No files will be affected.",
        args.name,
        snapshot.path.display()
    )?;
    if !ctx.confirm("Do you want to proceed?")? {
        return Ok(ExitCode::NothingToDo);
    }

    ctx.storage
        .delete(&args.name)
        .with_context(|| format!("Failed to delete catalogue \"{}\"", args.name))?;
    log::info!("Deleted catalogue {:?}", args.name);
    Ok(ExitCode::Success)
}

/// Copy or move the media files of `SRC` into `DST`.
///
/// # Errors
///
/// Fails before touching any file when the arguments do not resolve, the
/// trees overlap or no format pattern is available.
pub fn transfer<W: Write>(
    ctx: &mut Context,
    operation: Operation,
    args: &TransferArgs,
    out: &mut W,
) -> Result<ExitCode> {
    let source = ctx
        .resolve_target(&args.src)?
        .ok_or_else(|| CommandError::UnknownSource(args.src.clone()))?;
    let destination = match ctx.resolve_target(&args.dst)? {
        Some(target) if target.index().is_some() => target,
        _ => return Err(CommandError::NotAnIndex(args.dst.clone()).into()),
    };
    check_overlap(&ctx.ws, &source, &destination)?;

    let own = destination.as_catalogue().map(|c| &c.info);
    let format_pattern = ctx
        .config
        .format_pattern
        .clone()
        .or_else(|| own.map(|info| info.format_pattern.clone()))
        .ok_or(CommandError::NoFormatPattern)?;
    let unknown_format_pattern = ctx
        .config
        .unknown_format_pattern
        .clone()
        .or_else(|| own.and_then(|info| info.unknown_format_pattern.clone()));

    let Some(destination_index) = destination.index() else {
        return Err(CommandError::NotAnIndex(args.dst.clone()).into());
    };
    let finder = ctx.finder(true);
    let plan = plan_transfer(
        &mut ctx.ws,
        &finder,
        operation,
        &source,
        destination_index,
    );

    let source_root = source.root(&ctx.ws);
    let destination_root = destination.root(&ctx.ws);
    if args.output == OutputFormat::Text {
        text::write_different_names(
            out,
            &GroupListing::sorted(&ctx.ws, &plan.different_names, &source_root),
        )?;
        writeln!(out, "Detected {} files.", plan.to_process.len())?;
    }

    if !plan.is_empty()
        && !args.dry_run
        && !ctx.confirm(&format!("Do you want to proceed to {operation} these files?"))?
    {
        return Ok(ExitCode::NothingToDo);
    }

    let resolver = PathResolver::new(
        &format_pattern,
        unknown_format_pattern.as_ref(),
        ctx.started_at,
        ctx.dates.as_ref(),
    );
    let ops = StdFileOps::default();
    let batch = executor(
        &ops,
        ctx.classifier.as_ref(),
        &ctx.shutdown,
        ctx.progress.as_ref(),
        args.dry_run,
    )
    .transfer(
        &mut ctx.ws,
        operation,
        &plan.to_process,
        &source_root,
        destination_index,
        &resolver,
    );

    let report = TransferReport::new(&ctx.ws, &plan, &batch, &source_root, &destination_root);
    let exit_code = batch_exit_code(&batch);
    write_transfer(out, args.output, report, exit_code)?;

    if !args.dry_run {
        ctx.save(&source)?;
        ctx.save(&destination)?;
    }
    Ok(exit_code)
}

/// Delete duplicated media files.
///
/// Without `DST`, every copy but the shortest-named one is deleted inside
/// `SRC`. With it, files in `DST` whose content also exists in `SRC` are.
///
/// # Errors
///
/// Fails before touching any file when the arguments do not resolve or the
/// trees overlap.
pub fn delete_duplicates<W: Write>(
    ctx: &mut Context,
    args: &DeleteDuplicatesArgs,
    out: &mut W,
) -> Result<ExitCode> {
    let source = ctx
        .resolve_target(&args.src)?
        .ok_or_else(|| CommandError::UnknownSource(args.src.clone()))?;
    let destination = match &args.dst {
        Some(dst) => match ctx.resolve_target(dst)? {
            Some(target) if target.index().is_some() => Some(target),
            _ => return Err(CommandError::NotAnIndex(dst.clone()).into()),
        },
        None => None,
    };
    if matches!(source, Target::File(_)) && destination.is_none() {
        return Err(CommandError::FileWithoutDestination(args.src.clone()).into());
    }
    if let Some(destination) = &destination {
        check_overlap(&ctx.ws, &source, destination)?;
    }

    let finder = ctx.finder(true);
    let destination_index = destination.as_ref().and_then(Target::index);
    let plan = plan_delete(&mut ctx.ws, &finder, &source, destination_index);

    let root = match &destination {
        Some(destination) => destination.root(&ctx.ws),
        None => source.root(&ctx.ws),
    };
    if args.output == OutputFormat::Text {
        text::write_different_names(
            out,
            &GroupListing::sorted(&ctx.ws, &plan.different_names, &root),
        )?;
        writeln!(out, "Detected {} files.", plan.to_process.len())?;
    }

    if !plan.is_empty()
        && !args.dry_run
        && !ctx.confirm("Do you want to proceed to delete these files?")?
    {
        return Ok(ExitCode::NothingToDo);
    }

    let ops = StdFileOps {
        use_trash: args.trash,
    };
    let batch = executor(
        &ops,
        ctx.classifier.as_ref(),
        &ctx.shutdown,
        ctx.progress.as_ref(),
        args.dry_run,
    )
    .delete(&mut ctx.ws, &plan.to_process);

    let report = TransferReport::new(&ctx.ws, &plan, &batch, &root, &root);
    let exit_code = batch_exit_code(&batch);
    write_transfer(out, args.output, report, exit_code)?;

    if !args.dry_run {
        ctx.save(&source)?;
        if let Some(destination) = &destination {
            ctx.save(destination)?;
        }
    }
    Ok(exit_code)
}

fn executor<'a>(
    ops: &'a StdFileOps,
    classifier: &'a dyn Classifier,
    shutdown: &ShutdownHandler,
    progress: Option<&Arc<dyn ProgressCallback>>,
    dry_run: bool,
) -> Executor<'a> {
    let mut executor = Executor::new(ops, classifier)
        .with_dry_run(dry_run)
        .with_shutdown_flag(shutdown.get_flag());
    if let Some(progress) = progress {
        executor = executor.with_progress_callback(Arc::clone(progress));
    }
    executor
}

fn batch_exit_code(batch: &BatchReport) -> ExitCode {
    if batch.interrupted {
        ExitCode::Interrupted
    } else if batch.files.is_empty() {
        ExitCode::NothingToDo
    } else if batch.failed() > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}

fn write_transfer<W: Write>(
    out: &mut W,
    format: OutputFormat,
    report: TransferReport,
    exit_code: ExitCode,
) -> Result<()> {
    match format {
        OutputFormat::Text => text::write_transfer(out, &report)?,
        OutputFormat::Json => {
            JsonOutput::new(JsonReport::Transfer(report), exit_code).write_to(out, true)?;
        }
    }
    Ok(())
}
