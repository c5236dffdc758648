//! The run loop: plans batches, generates diagrams, applies results, persists.

pub mod pause;
pub mod state;

pub use pause::PauseToken;
pub use state::{FileRecord, FileStatus, LogEntry, LogLevel, RunState, StatusSummary};

use std::fmt;
use std::path::Path;

use crate::batch::{plan_next, BatchPlan, PlanKind, ROOT_MODULE};
use crate::config::RunSettings;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::generate::{generate_diagrams, BatchContext, SourceFile};
use crate::scan::render_tree;
use crate::snapshot::{Snapshot, SnapshotStore};

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every file is Completed or Skipped, or the cursor reached the end.
    Completed,
    /// A pause was requested and honoured.
    Paused,
    /// A batch failed; carries its error message.
    Failed(String),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Paused => f.write_str("paused"),
            Self::Failed(message) => write!(f, "stopped on failed batch: {message}"),
        }
    }
}

/// Name recorded in snapshots: the last component of the target directory.
#[must_use]
pub fn project_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(root)
        .file_name()
        .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned())
}

/// Drives a [`RunState`] through the batch loop.
///
/// The runner holds everything that stays fixed for a project: ports,
/// settings, the rendered project tree and the snapshot store. The state
/// itself is passed in by the caller, who stays its only owner.
pub struct Runner<'a> {
    ctx: &'a ServiceContext,
    settings: &'a RunSettings,
    root: &'a Path,
    project_name: String,
    tree: String,
    store: SnapshotStore<'a>,
    pause: PauseToken,
}

impl<'a> Runner<'a> {
    /// Creates a runner for the project at `root` whose files are those of `state`.
    #[must_use]
    pub fn new(
        ctx: &'a ServiceContext,
        settings: &'a RunSettings,
        root: &'a Path,
        state: &RunState,
        pause: PauseToken,
    ) -> Self {
        let paths: Vec<&str> = state.files().iter().map(|f| f.path.as_str()).collect();
        Self {
            ctx,
            settings,
            root,
            project_name: project_name(root),
            tree: render_tree(&paths),
            store: SnapshotStore::new(ctx, &settings.output_dir),
            pause,
        }
    }

    /// Name written into snapshots.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Pause token checked before every batch.
    #[must_use]
    pub fn pause_token(&self) -> &PauseToken {
        &self.pause
    }

    /// Loads the saved snapshot, if any, into `state`.
    ///
    /// An unreadable snapshot, or one saved for a different project, is
    /// logged at warn level and `state` is left fresh.
    pub fn restore(&self, state: &mut RunState) {
        let now = self.ctx.clock.now();
        let total = state.files().len();
        let snapshot = match self.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                state.log(now, LogLevel::Info, format!("starting fresh with {total} files"));
                return;
            }
            Err(e) => {
                state.log(now, LogLevel::Warn, format!("ignoring saved state: {e}"));
                return;
            }
        };
        if snapshot.project_name != self.project_name {
            let message = format!(
                "saved state belongs to project {}; starting fresh",
                snapshot.project_name
            );
            state.log(now, LogLevel::Warn, message);
            return;
        }

        let report = state.restore(snapshot, self.settings.limits.max_single_file_bytes);
        if let Some(stored) = report.stale_count {
            state.log(
                now,
                LogLevel::Warn,
                format!(
                    "saved state claimed {stored} processed files; rebuilt {}",
                    state.processed_count()
                ),
            );
        }
        if report.missing > 0 {
            state.log(
                now,
                LogLevel::Info,
                format!("{} previously processed files no longer exist", report.missing),
            );
        }
        state.log(
            now,
            LogLevel::Info,
            format!("resuming: {} of {total} files already processed", state.processed_count()),
        );
    }

    /// Runs batches until the files are exhausted, a pause is requested or a batch fails.
    ///
    /// The snapshot is written after every successful batch and once more
    /// when the loop stops.
    pub async fn run(&self, state: &mut RunState) -> RunOutcome {
        state.set_running(true);
        let outcome = loop {
            if self.pause.is_paused() {
                let now = self.ctx.clock.now();
                state.log(
                    now,
                    LogLevel::Info,
                    format!("paused at {} of {}", state.cursor(), state.files().len()),
                );
                break RunOutcome::Paused;
            }
            if state.cursor() >= state.files().len() {
                let now = self.ctx.clock.now();
                let summary = state.summary();
                state.log(now, LogLevel::Success, format!("run complete: {summary}"));
                break RunOutcome::Completed;
            }

            let plan = plan_next(state.files(), state.cursor(), &self.settings.limits);
            match plan.kind {
                PlanKind::Empty => state.advance_cursor(plan.next_cursor),
                PlanKind::SkipOnly => self.skip(state, &plan),
                PlanKind::Generate => {
                    if let Err(message) = self.process(state, &plan).await {
                        break RunOutcome::Failed(message);
                    }
                }
            }
        };
        state.set_running(false);
        self.persist(state);
        outcome
    }

    fn skip(&self, state: &mut RunState, plan: &BatchPlan) {
        let index = plan.indices[0];
        state.apply_skip(index);
        let file = &state.files()[index];
        let message = format!(
            "skipped {} ({} bytes exceeds {} byte limit)",
            file.path, file.size, self.settings.limits.max_single_file_bytes
        );
        state.log(self.ctx.clock.now(), LogLevel::Warn, message);
    }

    async fn process(
        &self,
        state: &mut RunState,
        plan: &BatchPlan,
    ) -> std::result::Result<(), String> {
        let module = plan.module.as_deref().unwrap_or(ROOT_MODULE);
        state.mark_processing(&plan.indices);
        state.log(
            self.ctx.clock.now(),
            LogLevel::Info,
            format!("processing {} files from {module}", plan.indices.len()),
        );

        let result = match self.read_batch(state, &plan.indices) {
            Ok(files) => {
                let diagrams = state.diagrams();
                let batch = BatchContext {
                    overview: diagrams.overview(),
                    module_name: module,
                    module: diagrams.get(module),
                    files: &files,
                    tree: &self.tree,
                };
                generate_diagrams(self.ctx.llm.as_ref(), &batch).await
            }
            Err(e) => Err(e),
        };

        let now = self.ctx.clock.now();
        match result {
            Ok(update) => {
                if update.overview.is_none() {
                    state.log(
                        now,
                        LogLevel::Warn,
                        "response had no overview section; overview kept",
                    );
                }
                if update.module.is_none() {
                    state.log(
                        now,
                        LogLevel::Warn,
                        format!("response had no module section; {module} diagram kept"),
                    );
                }
                state.apply_success(&plan.indices, plan.next_cursor, update);
                let message = format!(
                    "updated {module} ({}/{} processed)",
                    state.processed_count(),
                    state.files().len()
                );
                state.log(now, LogLevel::Success, message);
                self.persist(state);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                state.apply_failure(&plan.indices, &message);
                state.log(now, LogLevel::Error, format!("batch for {module} failed: {message}"));
                Err(message)
            }
        }
    }

    fn read_batch(&self, state: &RunState, indices: &[usize]) -> Result<Vec<SourceFile>> {
        indices
            .iter()
            .map(|&i| {
                let path = &state.files()[i].path;
                let content = self.ctx.fs.read_to_string(&self.root.join(path)).map_err(|e| {
                    Error::FileRead { path: path.clone(), message: e.to_string() }
                })?;
                Ok(SourceFile::new(path.as_str(), &content, self.settings.max_file_chars))
            })
            .collect()
    }

    fn persist(&self, state: &mut RunState) {
        let snapshot = Snapshot::capture(state, &self.project_name, self.settings.log_tail);
        if let Err(e) = self.store.save(&snapshot) {
            let message = format!("could not save progress: {e}");
            state.log(self.ctx.clock.now(), LogLevel::Warn, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchLimits;
    use crate::diagram::OVERVIEW_TEMPLATE;
    use crate::ports::llm::{GenerationFuture, GenerationRequest, GenerationResponse, LlmClient};
    use crate::scan::ScannedFile;
    use crate::testing::{test_context, FixedClock, MemFs};
    use std::sync::Mutex;

    const KB: u64 = 1024;

    fn settings(max_files: usize) -> RunSettings {
        RunSettings {
            limits: BatchLimits {
                max_files_per_batch: max_files,
                max_batch_bytes: 50 * KB,
                max_single_file_bytes: 100 * KB,
            },
            output_dir: "/out".into(),
            ..RunSettings::default()
        }
    }

    /// Puts each file into `fs` under `/proj` and returns the scan result.
    fn project(fs: &MemFs, files: &[(&str, u64)]) -> RunState {
        let mut scanned = Vec::new();
        for (path, size) in files {
            fs.insert(format!("/proj/{path}"), &format!("// {path}"));
            scanned.push(ScannedFile { path: (*path).to_string(), size: *size });
        }
        RunState::from_scan(scanned)
    }

    fn answer(overview: &str, module: &str) -> String {
        format!("---OVERVIEW---\n{overview}\n---MODULE---\n{module}")
    }

    fn invariant_holds(state: &RunState) -> bool {
        state.processed_count() == state.files().iter().filter(|f| f.status.is_terminal()).count()
    }

    #[tokio::test]
    async fn batches_follow_directory_boundaries() {
        let fs = MemFs::new();
        let mut state = project(
            &fs,
            &[("a/x.go", 10 * KB), ("a/y.go", 10 * KB), ("b/z.go", 10 * KB)],
        );
        let first = answer("C4Context\n  v1", "C4Component\n  a");
        let second = answer("C4Context\n  v2", "C4Component\n  b");
        let ctx = test_context(fs.clone(), &[Ok(first.as_str()), Ok(second.as_str())]);
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        let outcome = runner.run(&mut state).await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(state.processed_count(), 3);
        assert_eq!(state.diagrams().get("a"), Some("C4Component\n  a"));
        assert_eq!(state.diagrams().get("b"), Some("C4Component\n  b"));
        assert_eq!(state.diagrams().overview(), "C4Context\n  v2");
        assert!(!state.is_running());
        assert_eq!(fs.get("/out/diagram.mmd").as_deref(), Some("C4Context\n  v2"));

        let saved = Snapshot::decode(&fs.get("/out/codemapper_state.json").unwrap()).unwrap();
        assert_eq!(saved.project_name, "proj");
        assert_eq!(saved.file_paths_processed, vec!["a/x.go", "a/y.go", "b/z.go"]);
    }

    #[tokio::test]
    async fn oversized_file_is_skipped_without_a_generation_call() {
        let fs = MemFs::new();
        let mut state = project(&fs, &[("big.go", 200 * KB)]);
        // No scripted answers: any generation call would exhaust the cassette and panic.
        let ctx = test_context(fs, &[]);
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        assert_eq!(runner.run(&mut state).await, RunOutcome::Completed);
        assert_eq!(state.files()[0].status, FileStatus::Skipped);
        assert_eq!(state.processed_count(), 1);
        assert!(state
            .logs()
            .iter()
            .any(|l| l.level == LogLevel::Warn && l.message.contains("big.go")));
    }

    #[tokio::test]
    async fn missing_module_section_keeps_previous_module_diagram() {
        let fs = MemFs::new();
        let mut state = project(&fs, &[("a/1.go", 10), ("a/2.go", 10)]);
        let first = answer("C4Context\n  v1", "C4Component\n  first");
        let ctx = test_context(fs, &[Ok(first.as_str()), Ok("---OVERVIEW---\nC4Context\n  v2\n")]);
        let settings = settings(1);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        assert_eq!(runner.run(&mut state).await, RunOutcome::Completed);
        assert_eq!(state.diagrams().overview(), "C4Context\n  v2");
        assert_eq!(state.diagrams().get("a"), Some("C4Component\n  first"));
        assert!(state.logs().iter().any(|l| l.message.contains("no module section")));
    }

    #[tokio::test]
    async fn failed_batch_stops_the_run_and_leaves_prior_work_intact() {
        let fs = MemFs::new();
        let mut state = project(&fs, &[("a/1.go", 10), ("b/2.go", 10), ("b/3.go", 10)]);
        let first = answer("C4Context\n  v1", "C4Component\n  a");
        let ctx = test_context(
            fs.clone(),
            &[Ok(first.as_str()), Err("gemini API error (500): internal")],
        );
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        let outcome = runner.run(&mut state).await;

        assert!(matches!(outcome, RunOutcome::Failed(ref m) if m.contains("500")));
        assert!(!state.is_running());
        assert_eq!(state.cursor(), 1);
        assert_eq!(state.processed_count(), 1);
        assert_eq!(state.summary().failed, 2);
        assert!(state.files()[1].error.as_deref().is_some_and(|e| e.contains("internal")));
        assert_eq!(state.diagrams().overview(), "C4Context\n  v1");
        assert_eq!(state.diagrams().get("b"), None);

        let saved = Snapshot::decode(&fs.get("/out/codemapper_state.json").unwrap()).unwrap();
        assert_eq!(saved.file_paths_processed, vec!["a/1.go"]);
    }

    #[tokio::test]
    async fn retried_files_are_processed_on_the_next_run() {
        let fs = MemFs::new();
        let mut state = project(&fs, &[("a/1.go", 10), ("a/2.go", 10)]);
        let ok = answer("C4Context", "C4Component");
        let ctx = test_context(fs, &[Err("timeout"), Ok(ok.as_str()), Ok(ok.as_str())]);
        let settings = settings(1);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        assert!(matches!(runner.run(&mut state).await, RunOutcome::Failed(_)));
        assert_eq!(state.retry_all_failed(), 1);
        assert_eq!(state.cursor(), 0);

        assert_eq!(runner.run(&mut state).await, RunOutcome::Completed);
        assert_eq!(state.summary().completed, 2);
        assert!(invariant_holds(&state));
    }

    #[tokio::test]
    async fn pause_requested_before_start_sends_nothing() {
        let fs = MemFs::new();
        let mut state = project(&fs, &[("a/1.go", 10)]);
        let ctx = test_context(fs, &[]);
        let settings = settings(5);
        let pause = PauseToken::new();
        pause.pause();
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, pause);

        assert_eq!(runner.run(&mut state).await, RunOutcome::Paused);
        assert_eq!(state.summary().pending, 1);
        assert_eq!(state.cursor(), 0);
    }

    /// Requests a pause while answering, like an operator pressing pause mid-call.
    struct PausingLlm {
        pause: PauseToken,
        calls: Mutex<usize>,
    }

    impl LlmClient for PausingLlm {
        fn generate(&self, _request: &GenerationRequest) -> GenerationFuture<'_> {
            *self.calls.lock().unwrap() += 1;
            self.pause.pause();
            Box::pin(async {
                Ok(GenerationResponse { text: answer("C4Context\n  paused", "C4Component") })
            })
        }
    }

    #[tokio::test]
    async fn pause_during_a_batch_applies_it_then_stops() {
        let fs = MemFs::new();
        let mut state = project(&fs, &[("a/1.go", 10), ("b/2.go", 10)]);
        let pause = PauseToken::new();
        let llm = PausingLlm { pause: pause.clone(), calls: Mutex::new(0) };
        let ctx = ServiceContext::new(Box::new(FixedClock), Box::new(fs.clone()), Box::new(llm));
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, pause);

        assert_eq!(runner.run(&mut state).await, RunOutcome::Paused);
        assert_eq!(state.files()[0].status, FileStatus::Completed);
        assert_eq!(state.files()[1].status, FileStatus::Pending);
        assert_eq!(state.diagrams().overview(), "C4Context\n  paused");
        assert_eq!(fs.get("/out/diagram.mmd").as_deref(), Some("C4Context\n  paused"));
    }

    #[tokio::test]
    async fn unreadable_file_fails_its_batch() {
        let fs = MemFs::new();
        let mut state = RunState::from_scan(vec![ScannedFile { path: "gone.rs".into(), size: 5 }]);
        let ctx = test_context(fs, &[]);
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        let outcome = runner.run(&mut state).await;

        assert!(matches!(outcome, RunOutcome::Failed(ref m) if m.contains("gone.rs")));
        assert_eq!(state.files()[0].status, FileStatus::Failed);
    }

    #[tokio::test]
    async fn mixed_run_keeps_processed_count_consistent() {
        let fs = MemFs::new();
        let mut state = project(
            &fs,
            &[
                ("a/1.go", 30 * KB),
                ("a/2.go", 30 * KB),
                ("a/huge.go", 300 * KB),
                ("b/1.go", KB),
                ("main.go", KB),
            ],
        );
        let ok = answer("C4Context", "C4Component");
        let ctx = test_context(
            fs,
            &[Ok(ok.as_str()), Ok(ok.as_str()), Ok(ok.as_str()), Ok(ok.as_str())],
        );
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        assert_eq!(runner.run(&mut state).await, RunOutcome::Completed);
        assert!(invariant_holds(&state));
        assert_eq!(state.processed_count(), 5);
        assert_eq!(state.summary().skipped, 1);
        assert_eq!(state.diagrams().modules().collect::<Vec<_>>(), vec!["a", "b", "root"]);
    }

    #[tokio::test]
    async fn overview_directory_gets_its_own_diagram() {
        let fs = MemFs::new();
        let mut state = project(&fs, &[("Overview/intro.go", 10)]);
        let reply = answer("C4Context
  title Shop", "C4Component
  title Intro");
        let ctx = test_context(fs, &[Ok(reply.as_str())]);
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        assert_eq!(runner.run(&mut state).await, RunOutcome::Completed);
        assert_eq!(state.diagrams().overview(), "C4Context
  title Shop");
        assert_eq!(state.diagrams().get("Overview/"), Some("C4Component
  title Intro"));
        assert_eq!(state.diagrams().modules().collect::<Vec<_>>(), vec!["Overview/"]);
    }

    #[tokio::test]
    async fn restore_resumes_where_the_last_run_stopped() {
        let fs = MemFs::new();
        let files = [("a/1.go", 10), ("b/2.go", 10)];
        let settings = settings(5);
        let ok = answer("C4Context\n  saved", "C4Component");

        let mut first = project(&fs, &files);
        let ctx = test_context(fs.clone(), &[Ok(ok.as_str()), Err("quota")]);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &first, PauseToken::new());
        assert!(matches!(runner.run(&mut first).await, RunOutcome::Failed(_)));

        let mut second = project(&fs, &files);
        let ctx = test_context(fs, &[Ok(ok.as_str())]);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &second, PauseToken::new());
        runner.restore(&mut second);

        assert_eq!(second.cursor(), 1);
        assert_eq!(second.files()[0].status, FileStatus::Completed);
        assert_eq!(second.files()[1].status, FileStatus::Pending);
        assert_eq!(second.diagrams().overview(), "C4Context\n  saved");

        assert_eq!(runner.run(&mut second).await, RunOutcome::Completed);
        assert_eq!(second.processed_count(), 2);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_ignored_with_a_warning() {
        let fs = MemFs::new();
        fs.insert("/out/codemapper_state.json", "{ definitely not json");
        let mut state = project(&fs, &[("a/1.go", 10)]);
        let ctx = test_context(fs, &[]);
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        runner.restore(&mut state);

        assert_eq!(state.processed_count(), 0);
        assert_eq!(state.diagrams().overview(), OVERVIEW_TEMPLATE);
        assert_eq!(state.logs().last().map(|l| l.level), Some(LogLevel::Warn));
    }

    #[tokio::test]
    async fn snapshot_of_another_project_is_not_restored() {
        let fs = MemFs::new();
        fs.insert(
            "/out/codemapper_state.json",
            r#"{
                "projectName": "billing",
                "processedCount": 1,
                "currentFileIndex": 1,
                "diagrams": {"Overview": "C4Context\n  title Billing", "invoices": "C4Component"},
                "filePathsProcessed": ["a/1.go"]
            }"#,
        );
        let mut state = project(&fs, &[("a/1.go", 10)]);
        let ctx = test_context(fs, &[]);
        let settings = settings(5);
        let runner = Runner::new(&ctx, &settings, Path::new("/proj"), &state, PauseToken::new());

        runner.restore(&mut state);

        assert_eq!(state.diagrams().overview(), OVERVIEW_TEMPLATE);
        assert_eq!(state.diagrams().modules().count(), 0);
        assert_eq!(state.processed_count(), 0);
        assert_eq!(state.cursor(), 0);
        let last = state.logs().last().unwrap();
        assert_eq!(last.level, LogLevel::Warn);
        assert!(last.message.contains("billing"));
    }

    #[test]
    fn project_name_uses_last_path_component() {
        assert_eq!(project_name(Path::new("/definitely/missing/shop")), "shop");
    }
}
