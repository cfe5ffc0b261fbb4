//! Mutation coordinators.
//!
//! A [`Surgeon`] drives every operation through one state machine:
//! snapshot, match, format, write atomically, read back, syntax check,
//! then commit or roll back. Any terminal state other than `Committed`
//! leaves the file byte-identical to what it was before the call.

pub mod errors;
pub mod options;
pub mod result;

pub use errors::SurgeryError;
pub use options::SurgeryOptions;
pub use result::{OperationResult, OperationState};

use crate::config::SurgeryConfig;
use crate::edit::{atomic_write, content_hash, Edit};
use crate::engine::{required_capabilities, EngineError, EngineRegistry};
use crate::format::{format_for_insertion, format_for_replacement};
use crate::lang::{self, SupportLang};
use crate::matcher::{FuzzyMatcher, LiteralMatcher, Matcher};
use crate::operation::OperationType;
use crate::position::{
    indentation_of, insertion_offset, suggest_indentation, Direction, InsertionContext,
};
use crate::safety;
use crate::snapshot::{Snapshot, SnapshotManager};
use crate::text::{DecodedText, EncodingConfidence, LineEnding, LineIndex, TextError};
use crate::validate::Checker;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Minimum similarity for a line to be offered as a "did you mean".
const SUGGESTION_THRESHOLD: f64 = 0.6;
const MAX_SUGGESTIONS: usize = 3;

/// Owns the engine registry, the snapshot manager and the config, and runs
/// operations against them.
#[derive(Debug)]
pub struct Surgeon {
    config: SurgeryConfig,
    registry: EngineRegistry,
    snapshots: SnapshotManager,
}

/// Rollback bookkeeping for one operation.
#[derive(Default)]
struct Attempt {
    snapshot: Option<Snapshot>,
    original_bytes: Option<Vec<u8>>,
    created_new: bool,
    /// Directories made for a new file, deepest first.
    created_dirs: Vec<PathBuf>,
    write_attempted: bool,
}

impl Surgeon {
    pub fn new(config: SurgeryConfig) -> Self {
        let snapshots = SnapshotManager::new(config.backup_dir.clone());
        Self {
            config,
            registry: EngineRegistry::with_defaults(),
            snapshots,
        }
    }

    pub fn with_registry(mut self, registry: EngineRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &SurgeryConfig {
        &self.config
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    /// Options seeded from the config defaults.
    pub fn default_options(&self) -> SurgeryOptions {
        let mut options = SurgeryOptions::default();
        options.matching.case_sensitive = self.config.default_case_sensitive;
        options
    }

    pub fn create(&self, path: &Path, content: &str, options: &SurgeryOptions) -> OperationResult {
        self.execute(OperationType::Create, path, None, content, options)
    }

    pub fn replace(
        &self,
        path: &Path,
        pattern: &str,
        content: &str,
        options: &SurgeryOptions,
    ) -> OperationResult {
        self.execute(OperationType::Replace, path, Some(pattern), content, options)
    }

    pub fn insert_before(
        &self,
        path: &Path,
        pattern: &str,
        content: &str,
        options: &SurgeryOptions,
    ) -> OperationResult {
        self.execute(OperationType::Before, path, Some(pattern), content, options)
    }

    pub fn insert_after(
        &self,
        path: &Path,
        pattern: &str,
        content: &str,
        options: &SurgeryOptions,
    ) -> OperationResult {
        self.execute(OperationType::After, path, Some(pattern), content, options)
    }

    pub fn append(&self, path: &Path, content: &str, options: &SurgeryOptions) -> OperationResult {
        self.execute(OperationType::Append, path, None, content, options)
    }

    /// Run any operation. Never panics and never returns an error: every
    /// failure is described by the returned report.
    pub fn execute(
        &self,
        operation: OperationType,
        path: &Path,
        pattern: Option<&str>,
        content: &str,
        options: &SurgeryOptions,
    ) -> OperationResult {
        let mut result = OperationResult::new(operation, path);
        result.dry_run = options.dry_run;
        let mut attempt = Attempt::default();

        match self.attempt(&mut result, &mut attempt, path, pattern, content, options) {
            Ok(()) => {
                info!(
                    operation = %operation,
                    file = %path.display(),
                    replacements = result.replacements,
                    dry_run = options.dry_run,
                    "operation committed"
                );
            }
            Err(error) => self.handle_failure(&mut result, &mut attempt, path, error),
        }
        result
    }

    fn attempt(
        &self,
        result: &mut OperationResult,
        attempt: &mut Attempt,
        path: &Path,
        pattern: Option<&str>,
        content: &str,
        options: &SurgeryOptions,
    ) -> Result<(), SurgeryError> {
        let operation = result.operation;
        if operation == OperationType::PreRestore {
            return Err(SurgeryError::Unsupported { operation });
        }

        let exists = path.is_file();
        if operation == OperationType::Create && exists && !options.overwrite {
            return Err(SurgeryError::FileExists {
                path: path.to_path_buf(),
            });
        }

        let decoded = if exists {
            let bytes = fs::read(path).map_err(|source| TextError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let decoded = DecodedText::decode(&bytes);
            attempt.original_bytes = Some(bytes);
            decoded
        } else if operation == OperationType::Create {
            DecodedText::new_utf8("")
        } else {
            return Err(SurgeryError::Read(TextError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            }));
        };
        attempt.created_new = !exists;
        self.note_encoding(result, &decoded)?;
        result.original = Some(decoded.text.clone());

        if exists && !options.dry_run {
            let snapshot = self
                .snapshots
                .create_snapshot(path, operation)
                .map_err(SurgeryError::SnapshotCreationFailed)?;
            result.snapshot = Some(snapshot.clone());
            attempt.snapshot = Some(snapshot);
        }
        transition(result, OperationState::BackedUp);

        let new_text = match operation {
            OperationType::Create => {
                transition(result, OperationState::Matched);
                content.to_string()
            }
            OperationType::Append => {
                transition(result, OperationState::Matched);
                append_text(&decoded, content)?
            }
            _ => {
                let pattern = pattern
                    .filter(|p| !p.is_empty())
                    .ok_or(SurgeryError::MissingPattern { operation })?;
                let (matcher, spans) = self.locate(result, path, &decoded.text, pattern, options)?;
                let chosen = choose_spans(result, &decoded.text, &spans, options)?;
                result.safety = safety::analyze(
                    &decoded.text,
                    &chosen[0],
                    spans.len(),
                    language_of(path, options),
                );
                transition(result, OperationState::Matched);
                splice(result, path, &decoded, &matcher, pattern, content, &chosen)?
            }
        };
        transition(result, OperationState::Formatted);
        result.content = Some(new_text.clone());

        if new_text == decoded.text && exists {
            self.discard_snapshot(result, attempt);
            result.success = true;
            result.message = format!("{} already up to date; nothing written", path.display());
            transition(result, OperationState::Committed);
            return Ok(());
        }

        let encoded = decoded
            .encode(&new_text)
            .map_err(|e| SurgeryError::WriteFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if options.dry_run {
            result.validated = self.check_syntax(path, options, &decoded.text, &new_text)?;
            result.success = true;
            result.message = format!("dry run: {operation} would modify {}", path.display());
            transition(result, OperationState::Committed);
            return Ok(());
        }

        self.ensure_unchanged(path, attempt)?;
        if !exists {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                attempt.created_dirs = parent
                    .ancestors()
                    .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
                    .map(Path::to_path_buf)
                    .collect();
                fs::create_dir_all(parent).map_err(|e| SurgeryError::WriteFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
        }

        attempt.write_attempted = true;
        atomic_write(path, &encoded).map_err(|e| SurgeryError::WriteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        transition(result, OperationState::Written);

        let written = fs::read(path).map_err(|e| SurgeryError::PostWriteValidationFailed {
            message: format!("read-back failed: {e}"),
        })?;
        if content_hash(&written) != content_hash(&encoded) {
            return Err(SurgeryError::PostWriteValidationFailed {
                message: "read-back content differs from what was written".to_string(),
            });
        }
        result.validated = self.check_syntax(path, options, &decoded.text, &new_text)?;
        transition(result, OperationState::Verified);

        self.commit_snapshot(result, attempt, path);
        result.success = true;
        result.message = success_message(operation, path, result.replacements);
        transition(result, OperationState::Committed);
        Ok(())
    }

    fn note_encoding(
        &self,
        result: &mut OperationResult,
        decoded: &DecodedText,
    ) -> Result<(), SurgeryError> {
        if decoded.confidence == EncodingConfidence::Fallback {
            result.tolerate(SurgeryError::EncodingDetectionFailed {
                encoding: decoded.encoding_name().to_string(),
            })?;
        } else if let Some(warning) = decoded.encoding_warning() {
            result.warn(warning);
        }
        if decoded.mixed_line_endings {
            result.warn(format!(
                "file mixes line endings; inserted lines use {}",
                decoded.line_ending
            ));
        }
        Ok(())
    }

    /// Select an engine, build its matcher and find every occurrence.
    fn locate(
        &self,
        result: &mut OperationResult,
        path: &Path,
        text: &str,
        pattern: &str,
        options: &SurgeryOptions,
    ) -> Result<(Matcher, Vec<Range<usize>>), SurgeryError> {
        let hint = options.language.clone().or_else(|| {
            path.extension()
                .map(|ext| ext.to_string_lossy().into_owned())
        });
        let required = required_capabilities(&options.matching, pattern);
        let selection = self
            .registry
            .select_best_engine(result.operation, &required, hint.as_deref())?;
        if let Some(fallback) = &selection.fallback {
            result.warn(fallback.clone());
        }

        let engine = selection.engine;
        let matcher = engine
            .build_matcher(&options.matching, selection.language)
            .ok_or_else(|| EngineError::CapabilityMismatch {
                required: required.clone(),
                reasons: vec![format!("{} needs a known language", engine.name)],
            })?;
        result.strategy = Some(matcher.strategy());
        result.engine = Some(engine.name.clone());
        debug!(engine = %engine.name, strategy = %matcher.strategy(), "searching");

        let spans = matcher.spans(text, pattern)?;
        if spans.is_empty() {
            result.suggestions = suggest_nearby(text, pattern, options);
            return Err(SurgeryError::PatternNotFound {
                pattern: pattern.to_string(),
            });
        }

        let index = LineIndex::new(text);
        result.locations = spans
            .iter()
            .map(|span| index.position(text, span.start).to_string())
            .collect();
        Ok((matcher, spans))
    }

    fn check_syntax(
        &self,
        path: &Path,
        options: &SurgeryOptions,
        original: &str,
        edited: &str,
    ) -> Result<bool, SurgeryError> {
        if !self.config.validate_syntax {
            return Ok(false);
        }
        let checker = options
            .language
            .as_deref()
            .and_then(lang::from_hint)
            .map(Checker::for_language)
            .unwrap_or_else(|| Checker::for_path(path));
        debug!(checker = %checker.name(), file = %path.display(), "validating syntax");
        checker
            .validate_edit(original, edited)
            .map_err(|e| SurgeryError::PostWriteValidationFailed {
                message: e.to_string(),
            })
    }

    /// Abort if the file changed (or appeared) since it was read.
    fn ensure_unchanged(&self, path: &Path, attempt: &Attempt) -> Result<(), SurgeryError> {
        let changed = match &attempt.original_bytes {
            Some(original) => match fs::read(path) {
                Ok(current) => content_hash(&current) != content_hash(original),
                Err(_) => true,
            },
            None => path.exists(),
        };
        if changed {
            return Err(SurgeryError::ConcurrentModification {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn commit_snapshot(&self, result: &mut OperationResult, attempt: &mut Attempt, path: &Path) {
        let Some(snapshot) = attempt.snapshot.take() else {
            return;
        };
        let retention = &self.config.retention;
        if !retention.keep_backups {
            if let Err(e) = self.snapshots.delete(&snapshot) {
                warn!(snapshot = %snapshot.id, error = %e, "failed to delete snapshot");
            }
            result.snapshot = None;
            return;
        }
        let removed = self.snapshots.apply_retention(path, retention);
        if removed.iter().any(|s| s.id == snapshot.id) {
            result.snapshot = None;
        }
    }

    fn discard_snapshot(&self, result: &mut OperationResult, attempt: &mut Attempt) {
        if let Some(snapshot) = attempt.snapshot.take() {
            if let Err(e) = self.snapshots.delete(&snapshot) {
                warn!(snapshot = %snapshot.id, error = %e, "failed to discard unused snapshot");
            }
        }
        result.snapshot = None;
    }

    fn handle_failure(
        &self,
        result: &mut OperationResult,
        attempt: &mut Attempt,
        path: &Path,
        error: SurgeryError,
    ) {
        result.fail(&error);
        warn!(
            operation = %result.operation,
            file = %path.display(),
            state = %result.state,
            error = %error,
            "operation failed"
        );
        transition(result, OperationState::Failed);

        if attempt.write_attempted {
            match self.rollback(attempt, path) {
                Ok(()) => {
                    result.message = format!("{error}; changes rolled back");
                    transition(result, OperationState::RolledBack);
                }
                Err(rollback_error) => {
                    let message = format!("{error}; rollback failed: {rollback_error}");
                    warn!(file = %path.display(), %message, "rollback failed");
                    result.message = message.clone();
                    result.error = Some(message);
                }
            }
        } else {
            self.discard_snapshot(result, attempt);
        }

        result.content = result.original.clone();
    }

    /// Put the file back the way it was: remove a freshly created file and
    /// the directories made for it, otherwise restore the snapshot and fall
    /// back to the bytes in memory.
    fn rollback(&self, attempt: &Attempt, path: &Path) -> std::io::Result<()> {
        if attempt.created_new {
            match fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
            for dir in &attempt.created_dirs {
                if let Err(e) = fs::remove_dir(dir) {
                    warn!(dir = %dir.display(), error = %e, "failed to remove created directory");
                    break;
                }
            }
            return Ok(());
        }

        if let Some(snapshot) = &attempt.snapshot {
            match self.snapshots.restore(snapshot, path) {
                Ok(()) => return Ok(()),
                Err(e) => warn!(error = %e, "snapshot restore failed; using in-memory copy"),
            }
        }
        match &attempt.original_bytes {
            Some(bytes) => atomic_write(path, bytes),
            None => Err(std::io::Error::other("no original content to restore")),
        }
    }
}

fn transition(result: &mut OperationResult, next: OperationState) {
    debug!(
        operation = %result.operation,
        file = %result.file.display(),
        from = %result.state,
        to = %next,
        "state transition"
    );
    result.state = next;
}

fn language_of(path: &Path, options: &SurgeryOptions) -> Option<SupportLang> {
    options
        .language
        .as_deref()
        .and_then(lang::from_hint)
        .or_else(|| lang::from_path(path))
}

fn success_message(operation: OperationType, path: &Path, replacements: usize) -> String {
    match operation {
        OperationType::Create => format!("created {}", path.display()),
        OperationType::Replace => format!(
            "replaced {replacements} occurrence(s) in {}",
            path.display()
        ),
        OperationType::Before => format!("inserted content before match in {}", path.display()),
        OperationType::After => format!("inserted content after match in {}", path.display()),
        OperationType::Append => format!("appended content to {}", path.display()),
        OperationType::PreRestore => format!("restored {}", path.display()),
    }
}

/// Apply the occurrence policy.
fn choose_spans(
    result: &mut OperationResult,
    text: &str,
    spans: &[Range<usize>],
    options: &SurgeryOptions,
) -> Result<Vec<Range<usize>>, SurgeryError> {
    if result.operation == OperationType::Replace && options.replace_all {
        let limit = options.max_replacements.unwrap_or(usize::MAX);
        if spans.len() > limit {
            result.warn(format!(
                "replacing {limit} of {} occurrences (max_replacements)",
                spans.len()
            ));
        }
        return Ok(spans.iter().take(limit).cloned().collect());
    }

    match options.occurrence {
        Some(n) if n == 0 || n > spans.len() => Err(SurgeryError::OccurrenceOutOfRange {
            requested: n,
            available: spans.len(),
        }),
        Some(n) => Ok(vec![spans[n - 1].clone()]),
        None => {
            if spans.len() > 1 {
                result.tolerate(SurgeryError::AmbiguousPattern {
                    count: spans.len(),
                    locations: result.locations.clone(),
                })?;
                result.suggestions.extend(unique_alternatives(text, spans));
                result.suggestions.push(format!(
                    "pass an occurrence between 1 and {} to pick a specific match",
                    spans.len()
                ));
            }
            Ok(vec![spans[0].clone()])
        }
    }
}

/// Build the new text for replace/before/after.
fn splice(
    result: &mut OperationResult,
    path: &Path,
    decoded: &DecodedText,
    matcher: &Matcher,
    pattern: &str,
    content: &str,
    chosen: &[Range<usize>],
) -> Result<String, SurgeryError> {
    let text = decoded.text.as_str();
    let eol = decoded.line_ending;
    let index = LineIndex::new(text);

    match result.operation {
        OperationType::Replace => {
            let unit = suggest_indentation(text);
            let edits = chosen
                .iter()
                .map(|span| -> Result<Edit, SurgeryError> {
                    let matched = &text[span.clone()];
                    let replacement = matcher.replacement_for(text, span, pattern, content)?;
                    if replacement == matched {
                        return Ok(Edit::new(span.start, span.end, matched, matched));
                    }
                    let base = indentation_of(index.line_text(text, index.line_of(span.start)));
                    let formatted = format_for_replacement(&replacement, &base, unit);
                    Ok(Edit::new(
                        span.start,
                        span.end,
                        with_line_ending(&formatted, eol),
                        matched,
                    ))
                })
                .collect::<Result<Vec<_>, _>>()?;
            result.replacements = edits.len();
            Ok(Edit::apply_all(text, &edits)?)
        }
        OperationType::Before | OperationType::After => {
            let direction = if result.operation == OperationType::Before {
                Direction::Before
            } else {
                Direction::After
            };
            let ctx = InsertionContext::new(path, text, &index, Some(&chosen[0]), direction);
            let formatted = format_for_insertion(content, &ctx.indent(), ctx.unit);
            let (offset, needs_break) = insertion_offset(text, &index, ctx.anchor_line);

            let mut block = String::with_capacity(formatted.len() + 2);
            if needs_break {
                block.push_str(eol.as_str());
            }
            block.push_str(&with_line_ending(&formatted, eol));
            if !needs_break {
                block.push_str(eol.as_str());
            }
            Ok(Edit::insert(offset, block).apply_to(text)?)
        }
        operation => Err(SurgeryError::Unsupported { operation }),
    }
}

/// Append keeps the file's trailing-newline convention: a terminated file
/// stays terminated, an unterminated one stays unterminated.
fn append_text(decoded: &DecodedText, content: &str) -> Result<String, SurgeryError> {
    let text = decoded.text.as_str();
    let eol = decoded.line_ending;
    let body = with_line_ending(strip_trailing_break(content), eol);

    let block = if text.is_empty() || text.ends_with('\n') || text.ends_with('\r') {
        format!("{body}{}", eol.as_str())
    } else {
        format!("{}{body}", eol.as_str())
    };
    Ok(Edit::insert(text.len(), block).apply_to(text)?)
}

fn strip_trailing_break(content: &str) -> &str {
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .or_else(|| content.strip_suffix('\r'))
        .unwrap_or(content)
}

fn with_line_ending(text: &str, eol: LineEnding) -> String {
    if text.contains('\n') || text.contains('\r') {
        eol.apply(text)
    } else {
        text.to_string()
    }
}

/// Lines similar to the pattern, plus hints about matching options that
/// would have found it.
fn suggest_nearby(text: &str, pattern: &str, options: &SurgeryOptions) -> Vec<String> {
    let needle = pattern
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let mut suggestions = Vec::new();
    if needle.is_empty() {
        return suggestions;
    }

    let index = LineIndex::new(text);
    let mut scored: Vec<(f64, usize, &str)> = (0..index.len())
        .filter_map(|i| {
            let line = index.line_text(text, i).trim();
            if line.is_empty() {
                return None;
            }
            let score = similarity(needle, line);
            (score >= SUGGESTION_THRESHOLD).then_some((score, i, line))
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    suggestions.extend(scored.into_iter().take(MAX_SUGGESTIONS).map(|(score, i, line)| {
        format!(
            "line {}: {line} ({:.0}% similar)",
            i + 1,
            score * 100.0
        )
    }));

    let matching = &options.matching;
    if !matching.regex && !matching.structural {
        if matching.case_sensitive
            && LiteralMatcher::new(false, matching.whole_word)
                .spans(text, pattern)
                .is_ok_and(|s| !s.is_empty())
        {
            suggestions.push("pattern matches case-insensitively; retry with case_sensitive = false".to_string());
        }
        if !matching.flexible
            && FuzzyMatcher::new(matching.case_sensitive)
                .spans(text, pattern)
                .is_ok_and(|s| !s.is_empty())
        {
            suggestions.push("pattern matches when whitespace is ignored; retry with flexible matching".to_string());
        }
    }
    suggestions
}

/// Similarity of `needle` to a line: the whole line, or its best token when
/// the needle is a single identifier-like word.
fn similarity(needle: &str, line: &str) -> f64 {
    let whole = strsim::normalized_levenshtein(needle, line);
    if needle.contains(char::is_whitespace) {
        return whole;
    }
    line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|token| strsim::normalized_levenshtein(needle, token))
        .fold(whole, f64::max)
}

/// Whole lines around the occurrences that occur exactly once in the file.
fn unique_alternatives(text: &str, spans: &[Range<usize>]) -> Vec<String> {
    let index = LineIndex::new(text);
    let mut out: Vec<String> = Vec::new();
    for span in spans {
        let line_no = index.line_of(span.start);
        let line = index.line_text(text, line_no).trim();
        if line.is_empty() || text.matches(line).count() != 1 {
            continue;
        }
        let suggestion = format!("use the unique pattern {line:?} (line {})", line_no + 1);
        if !out.contains(&suggestion) {
            out.push(suggestion);
        }
        if out.len() == MAX_SUGGESTIONS {
            break;
        }
    }
    out
}
