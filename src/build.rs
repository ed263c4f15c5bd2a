//! Build Orchestrator
//!
//! Runs the full pipeline and owns everything a build leaves on disk:
//! - generated `*.generated.cs` files
//! - the `lastBuild.flag` timestamp
//! - the `ood.flag` out-of-date marker
//!
//! At most one build runs per output root at a time. A run either completes
//! or fails; files written before a failure stay on disk.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, SecondsFormat, Utc};
use semver::Version;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::analysis::registry::IgnoreRegistry;
use crate::codegen::{signature, SourceGenerator, GENERATED_SUFFIX, GENERATOR_VERSION};
use crate::config::{GeneratorSettings, ModelsMode};
use crate::error::{BuildError, Result};
use crate::generator::ModelsGenerator;
use crate::model::normalize::generated_path;
use crate::model::TypeModelList;
use crate::schema::SchemaSource;

/// Timestamp of the last successful build, in the models directory
pub const LAST_BUILD_FILE: &str = "lastBuild.flag";

/// Present while models are out of date, in the models directory
pub const OUT_OF_DATE_FILE: &str = "ood.flag";

/// How much of a file is searched for the generator signature
const SIGNATURE_WINDOW: u64 = 512;

// =============================================================================
// Out-of-date status
// =============================================================================

/// External "models are out of date" signal, cleared by every successful build
pub trait OutOfDateStatus: Send + Sync {
    fn is_out_of_date(&self) -> bool;

    fn clear(&self) -> Result<()>;
}

/// Out-of-date flag kept as a marker file
#[derive(Debug, Clone)]
pub struct FileOutOfDateStatus {
    path: PathBuf,
}

impl FileOutOfDateStatus {
    pub fn new(models_path: impl AsRef<Path>) -> Self {
        Self {
            path: models_path.as_ref().join(OUT_OF_DATE_FILE),
        }
    }

    /// Flag the models as out of date
    pub fn mark(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, "THIS FILE INDICATES THAT MODELS ARE OUT-OF-DATE\n")?;
        Ok(())
    }
}

impl OutOfDateStatus for FileOutOfDateStatus {
    fn is_out_of_date(&self) -> bool {
        self.path.is_file()
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// What a build did
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub written: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    /// Aliases of ignored types
    pub skipped: Vec<String>,
}

/// Answer to a status query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResult {
    pub success: bool,
    pub version: Version,
    pub mode: ModelsMode,
    pub is_out_of_date: bool,
    pub last_build_date: Option<DateTime<Utc>>,
}

// =============================================================================
// Single-flight guard
// =============================================================================

fn active_builds() -> &'static Mutex<HashSet<PathBuf>> {
    static ACTIVE: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Held for the duration of a build; released on drop
#[derive(Debug)]
pub struct BuildGuard {
    root: PathBuf,
}

impl BuildGuard {
    /// Claim `root`, failing if another build holds it
    pub fn acquire(root: &Path) -> Result<Self> {
        let mut active = active_builds().lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(root.to_path_buf()) {
            return Err(BuildError::BuildInProgress(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        let mut active = active_builds().lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.root);
    }
}

// =============================================================================
// Generated files & build marker
// =============================================================================

/// Whether the first bytes of `path` carry the generator signature
pub fn is_generated_file(path: &Path) -> bool {
    let mut head = Vec::new();
    let read = File::open(path).and_then(|file| file.take(SIGNATURE_WINDOW).read_to_end(&mut head));
    if read.is_err() {
        return false;
    }
    String::from_utf8_lossy(&head)
        .to_lowercase()
        .contains(&signature().to_lowercase())
}

/// Delete every signed `*.generated.cs` file below `root`.
///
/// A file that cannot be removed is logged and left in place; the others are
/// still deleted.
pub fn delete_generated_files(root: &Path) -> Result<Vec<PathBuf>> {
    delete_signed_files(root, |path| fs::remove_file(path))
}

fn delete_signed_files(root: &Path, mut remove: impl FnMut(&Path) -> std::io::Result<()>) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    if !root.is_dir() {
        return Ok(deleted);
    }

    let mut failed = 0usize;
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_candidate = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(GENERATED_SUFFIX));
        if !is_candidate {
            continue;
        }
        if !is_generated_file(path) {
            warn!(path = %path.display(), "not deleting unsigned file");
            continue;
        }
        match remove(path) {
            Ok(()) => deleted.push(path.to_path_buf()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not delete generated file");
                failed += 1;
            }
        }
    }

    debug!(root = %root.display(), count = deleted.len(), failed, "deleted generated files");
    Ok(deleted)
}

/// Record now as the last build time
pub fn save_last_build_date(models_path: &Path) -> Result<DateTime<Utc>> {
    let now = Utc::now();
    fs::create_dir_all(models_path)?;
    fs::write(
        models_path.join(LAST_BUILD_FILE),
        format!("{}\n", now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    )?;
    Ok(now)
}

/// The recorded last build time, if any
pub fn last_build_date(models_path: &Path) -> Option<DateTime<Utc>> {
    let content = fs::read_to_string(models_path.join(LAST_BUILD_FILE)).ok()?;
    DateTime::parse_from_rfc3339(content.lines().next()?.trim())
        .map(|date| date.with_timezone(&Utc))
        .ok()
}

// =============================================================================
// Models Builder
// =============================================================================

/// Writes model files for a generator's schema
pub struct ModelsBuilder<S: SchemaSource> {
    generator: ModelsGenerator<S>,
    out_of_date: Option<Box<dyn OutOfDateStatus>>,
}

impl<S: SchemaSource> ModelsBuilder<S> {
    pub fn new(generator: ModelsGenerator<S>) -> Self {
        Self {
            generator,
            out_of_date: None,
        }
    }

    /// Use `status` instead of the `ood.flag` file of the models directory
    pub fn with_out_of_date_status(mut self, status: impl OutOfDateStatus + 'static) -> Self {
        self.out_of_date = Some(Box::new(status));
        self
    }

    pub fn generator(&self) -> &ModelsGenerator<S> {
        &self.generator
    }

    /// Access the generator to register hooks and containers
    pub fn generator_mut(&mut self) -> &mut ModelsGenerator<S> {
        &mut self.generator
    }

    /// Build with the generator's default settings
    pub fn build_models(&self) -> Result<BuildReport> {
        let settings = self.generator.default_settings();
        self.build_models_with(&settings)
    }

    pub fn build_models_with(&self, settings: &GeneratorSettings) -> Result<BuildReport> {
        settings.validate()?;
        let _guard = BuildGuard::acquire(&settings.models_path_absolute())?;

        let models = self.generator.get_models(settings)?;
        self.write_models(&models, settings)
    }

    /// Render and write a pre-computed model list
    pub fn save_models(&self, models: &TypeModelList, settings: &GeneratorSettings) -> Result<BuildReport> {
        settings.validate()?;
        let _guard = BuildGuard::acquire(&settings.models_path_absolute())?;

        self.write_models(models, settings)
    }

    fn write_models(&self, models: &TypeModelList, settings: &GeneratorSettings) -> Result<BuildReport> {
        let root = settings.models_path.as_path();
        fs::create_dir_all(root)?;

        let mut report = BuildReport::default();
        if settings.delete_generated_files {
            report.deleted = delete_generated_files(root)?;
        }

        let ignores = IgnoreRegistry::scan(root);
        let generator = SourceGenerator::new(models, settings).with_ignores(&ignores);

        for model in models {
            if model.is_ignored {
                debug!(alias = %model.alias, "skipping ignored type");
                report.skipped.push(model.alias.clone());
                continue;
            }

            let path = model
                .path
                .clone()
                .unwrap_or_else(|| generated_path(settings, model));
            let source = generator.get_source(model)?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, source)?;
            debug!(alias = %model.alias, path = %path.display(), "wrote model");
            report.written.push(path);
        }

        save_last_build_date(root)?;
        self.clear_out_of_date(settings)?;

        info!(
            written = report.written.len(),
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            root = %root.display(),
            "built models"
        );
        Ok(report)
    }

    fn clear_out_of_date(&self, settings: &GeneratorSettings) -> Result<()> {
        match &self.out_of_date {
            Some(status) => status.clear(),
            None => FileOutOfDateStatus::new(&settings.models_path).clear(),
        }
    }

    fn is_out_of_date(&self, settings: &GeneratorSettings) -> bool {
        match &self.out_of_date {
            Some(status) => status.is_out_of_date(),
            None => FileOutOfDateStatus::new(&settings.models_path).is_out_of_date(),
        }
    }

    /// Report mode, out-of-date state and last build time
    pub fn status(&self) -> StatusResult {
        let settings = self.generator.default_settings();
        StatusResult {
            success: true,
            version: Version::parse(GENERATOR_VERSION).unwrap_or_else(|_| Version::new(0, 0, 0)),
            mode: settings.mode,
            is_out_of_date: self.is_out_of_date(&settings),
            last_build_date: last_build_date(&settings.models_path),
        }
    }
}
