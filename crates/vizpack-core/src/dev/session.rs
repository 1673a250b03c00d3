//! Dev session state machine.
//!
//! ```text
//! Idle --start--> Watching --change--> Rebuilding --done--> Watching
//! ```
//!
//! Serving is a separate flag held for the whole session. Each rebuild takes
//! a generation number; a result is kept only if no newer rebuild of the same
//! entry has started since. Failed entries keep their last good artifact.

use crate::bundler::{module_key, normalize, CompiledArtifact};
use crate::entry::{ActiveSet, EntryPoint};
use crate::error::{BuildFailure, Error, ErrorReport};
use crate::mode::DeploymentMode;
use crate::pipeline::Pipeline;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Watching,
    Rebuilding,
}

/// Published on the developer channel after every build.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    Rebuilt { generation: u64, entries: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Failed {
        generation: u64,
        errors: Vec<ErrorReport>,
    },
}

#[derive(Debug, Default)]
struct Artifacts {
    last_good: HashMap<String, CompiledArtifact>,
    /// Generation of the newest rebuild started per entry.
    generations: HashMap<String, u64>,
}

pub struct DevSession {
    pipeline: Arc<Pipeline>,
    active: ActiveSet,
    artifacts: Mutex<Artifacts>,
    started: AtomicBool,
    serving: AtomicBool,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for DevSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevSession")
            .field("mode", &self.active.mode())
            .field("state", &self.state())
            .field("serving", &self.is_serving())
            .finish_non_exhaustive()
    }
}

impl DevSession {
    /// Create an idle session for `mode`.
    ///
    /// # Errors
    /// Returns a configuration error for a non dev-server mode or when the
    /// mode leaves no active entries.
    pub fn new(pipeline: Arc<Pipeline>, mode: DeploymentMode) -> Result<Self, Error> {
        if !mode.is_dev_server() {
            return Err(Error::configuration(format!(
                "mode `{mode}` cannot run a dev session"
            )));
        }
        let active = pipeline.resolve(mode)?;
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            pipeline,
            active,
            artifacts: Mutex::new(Artifacts::default()),
            started: AtomicBool::new(false),
            serving: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            events,
        })
    }

    #[must_use]
    pub fn mode(&self) -> DeploymentMode {
        self.active.mode()
    }

    #[must_use]
    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if !self.started.load(Ordering::SeqCst) {
            SessionState::Idle
        } else if self.in_flight.load(Ordering::SeqCst) > 0 {
            SessionState::Rebuilding
        } else {
            SessionState::Watching
        }
    }

    #[must_use]
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    pub fn set_serving(&self, serving: bool) {
        self.serving.store(serving, Ordering::SeqCst);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Initial build of every active entry; moves the session to Watching.
    ///
    /// Build errors do not stop the session; they are returned as a
    /// [`SessionEvent::Failed`].
    pub fn start(&self) -> SessionEvent {
        let names = self.active.names();
        let (generation, event) = self.build(&names);
        self.started.store(true, Ordering::SeqCst);
        info!(mode = %self.mode(), "dev session watching");
        event.unwrap_or(SessionEvent::Rebuilt {
            generation,
            entries: Vec::new(),
        })
    }

    /// Active entries whose module closure contains one of `changed`.
    ///
    /// Entries without a good build yet are always affected.
    #[must_use]
    pub fn affected_entries(&self, changed: &[PathBuf]) -> Vec<String> {
        let keys: Vec<String> = changed.iter().map(|p| self.key_for(p)).collect();
        let artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);

        self.active
            .entries()
            .iter()
            .filter(|entry| match artifacts.last_good.get(&entry.name) {
                Some(artifact) => keys.iter().any(|k| artifact.contains_module(k)),
                None => true,
            })
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Rebuild the entries affected by `changed`.
    ///
    /// Returns `None` when nothing is affected or every result was
    /// superseded by a newer rebuild.
    pub fn rebuild(&self, changed: &[PathBuf]) -> Option<SessionEvent> {
        let template = self.pipeline.root().join(&self.pipeline.config().template);
        let template_changed = changed.iter().any(|p| self.key_for(p) == self.key_for(&template));

        let affected = self.affected_entries(changed);
        if affected.is_empty() {
            if template_changed {
                return self.build(&[]).1;
            }
            debug!(files = changed.len(), "change affects no entry");
            return None;
        }
        info!(entries = ?affected, "rebuilding");
        self.build(&affected).1
    }

    /// Build `names` (none: rewrite outputs only) under a new generation.
    fn build(&self, names: &[String]) -> (u64, Option<SessionEvent>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
            for name in names {
                artifacts.generations.insert(name.clone(), generation);
            }
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let entries: Vec<EntryPoint> = self
            .active
            .entries()
            .iter()
            .filter(|e| names.contains(&e.name))
            .cloned()
            .collect();
        let results = self.pipeline.compile(&entries);

        let event = {
            let mut artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
            let mut errors = Vec::new();
            let mut rebuilt = Vec::new();

            for (entry, result) in entries.iter().zip(results) {
                if artifacts.generations.get(&entry.name) != Some(&generation) {
                    debug!(entry = %entry.name, generation, "discarding superseded result");
                    continue;
                }
                match result {
                    Ok(artifact) => {
                        artifacts.last_good.insert(entry.name.clone(), artifact);
                        rebuilt.push(entry.name.clone());
                    }
                    Err(entry_errors) => errors.extend(entry_errors),
                }
            }

            if !names.is_empty() && rebuilt.is_empty() && errors.is_empty() {
                None
            } else {
                if let Err(failure) = self.write_outputs(&artifacts) {
                    errors.extend(failure.errors);
                }
                Some(self.outcome(generation, rebuilt, errors))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(event) = &event {
            let _ = self.events.send(event.clone());
        }
        (generation, event)
    }

    /// Write everything that has a good build. Called with the artifact lock
    /// held so writes of overlapping rebuilds never interleave.
    fn write_outputs(&self, artifacts: &Artifacts) -> Result<(), BuildFailure> {
        let ordered: Vec<CompiledArtifact> = self
            .active
            .entries()
            .iter()
            .filter_map(|e| artifacts.last_good.get(&e.name).cloned())
            .collect();

        if ordered.len() == self.active.entries().len() {
            self.pipeline.finalize(&self.active, &ordered).map(|_| ())
        } else {
            let emitter = self.pipeline.emitter();
            for artifact in &ordered {
                emitter.emit(&artifact.entry_name, artifact, &self.active)?;
            }
            Ok(())
        }
    }

    fn outcome(&self, generation: u64, rebuilt: Vec<String>, errors: Vec<Error>) -> SessionEvent {
        if errors.is_empty() {
            info!(generation, entries = ?rebuilt, "rebuilt");
            SessionEvent::Rebuilt {
                generation,
                entries: rebuilt,
            }
        } else {
            for error in &errors {
                warn!(code = error.code(), "{error}");
            }
            SessionEvent::Failed {
                generation,
                errors: errors.iter().map(Error::report).collect(),
            }
        }
    }

    fn key_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(self.pipeline.root()).unwrap_or(path);
        module_key(&normalize(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::BundlerService;
    use crate::config::{EntryConfig, ProjectConfig};
    use crate::entry::EntryRole;
    use crate::transform::Transformer;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectConfig) {
        let dir = tempfile::tempdir().unwrap();
        let write = |rel: &str, content: &str| {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };
        write("src/live.ts", "export const live = 1;\n");
        write("src/embedded.ts", "import './theme.scss';\nexport const embedded = 1;\n");
        write("src/theme.scss", "$c: red;\n.widget { color: $c; }\n");
        write("src/embedded_dev.ts", "import { harness } from './harness';\nharness();\n");
        write("src/harness.ts", "export function harness() {}\n");

        let entry = |name: &str, role| EntryConfig {
            name: name.to_string(),
            source: PathBuf::from(format!("src/{name}.ts")),
            role,
        };
        let config = ProjectConfig {
            entries: vec![
                entry("live", EntryRole::Live),
                entry("embedded", EntryRole::Embedded),
                entry("embedded_dev", EntryRole::EmbeddedDev),
            ],
            ..ProjectConfig::default()
        };
        (dir, config)
    }

    fn session(dir: &TempDir, config: ProjectConfig) -> DevSession {
        let pipeline = Arc::new(Pipeline::from_config(dir.path(), config).unwrap());
        DevSession::new(pipeline, DeploymentMode::DevServerEmbedded).unwrap()
    }

    #[test]
    fn test_production_cannot_start_a_session() {
        let (dir, config) = project();
        let pipeline = Arc::new(Pipeline::from_config(dir.path(), config).unwrap());
        let err = DevSession::new(pipeline, DeploymentMode::Production).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_start_builds_active_entries_and_watches() {
        let (dir, config) = project();
        let session = session(&dir, config);
        assert_eq!(session.state(), SessionState::Idle);

        let event = session.start();
        assert!(matches!(event, SessionEvent::Rebuilt { ref entries, .. } if entries.len() == 2));
        assert_eq!(session.state(), SessionState::Watching);
        assert!(dir.path().join("dist/embedded.js").exists());
        assert!(dir.path().join("dist/embedded_dev.js").exists());
        assert!(!dir.path().join("dist/live.js").exists());
    }

    #[test]
    fn test_serving_flag_is_independent_of_state() {
        let (dir, config) = project();
        let session = session(&dir, config);
        session.set_serving(true);
        assert!(session.is_serving());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_only_entries_containing_the_change_are_affected() {
        let (dir, config) = project();
        let session = session(&dir, config);
        session.start();

        let changed = vec![dir.path().join("src/harness.ts")];
        assert_eq!(session.affected_entries(&changed), vec!["embedded_dev"]);

        let changed = vec![dir.path().join("src/theme.scss")];
        assert_eq!(session.affected_entries(&changed), vec!["embedded"]);

        let changed = vec![dir.path().join("src/live.ts")];
        assert!(session.rebuild(&changed).is_none());
    }

    #[test]
    fn test_editing_a_sass_partial_rebuilds_its_stylesheet_entries() {
        let (dir, config) = project();
        fs::write(
            dir.path().join("src/theme.scss"),
            "@use 'tokens';\n.widget { color: tokens.$c; }\n",
        )
        .unwrap();
        fs::write(dir.path().join("src/_tokens.scss"), "$c: #ff0000;\n").unwrap();
        let session = session(&dir, config);
        session.start();

        let partial = dir.path().join("src/_tokens.scss");
        assert_eq!(session.affected_entries(&[partial.clone()]), vec!["embedded"]);

        fs::write(&partial, "$c: #0000ff;\n").unwrap();
        let event = session.rebuild(&[partial]).unwrap();
        assert!(matches!(event, SessionEvent::Rebuilt { ref entries, .. } if entries == &["embedded"]));
        let output = fs::read_to_string(dir.path().join("dist/embedded.js")).unwrap();
        assert!(["#00f", "#0000ff", "blue"].iter().any(|c| output.contains(c)));
        assert!(!output.contains("#f00") && !output.contains("#ff0000"));
    }

    #[test]
    fn test_stage_failure_keeps_last_good_output() {
        let (dir, config) = project();
        let session = session(&dir, config);
        let mut events = session.subscribe();
        session.start();
        let good = fs::read_to_string(dir.path().join("dist/embedded.js")).unwrap();

        fs::write(dir.path().join("src/theme.scss"), ".widget { color: $missing; }\n").unwrap();
        let event = session
            .rebuild(&[dir.path().join("src/theme.scss")])
            .unwrap();

        match &event {
            SessionEvent::Failed { errors, .. } => {
                assert_eq!(errors[0].error_kind, "STAGE_FAILURE");
                assert_eq!(errors[0].entry_names, vec!["embedded"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Watching);
        assert_eq!(
            fs::read_to_string(dir.path().join("dist/embedded.js")).unwrap(),
            good
        );

        // initial build, then the failure
        assert!(matches!(events.try_recv().unwrap(), SessionEvent::Rebuilt { .. }));
        assert_eq!(events.try_recv().unwrap(), event);
    }

    #[test]
    fn test_failed_entry_is_rebuilt_on_any_change() {
        let (dir, config) = project();
        fs::remove_file(dir.path().join("src/harness.ts")).unwrap();
        let session = session(&dir, config);
        assert!(matches!(session.start(), SessionEvent::Failed { .. }));
        assert!(dir.path().join("dist/embedded.js").exists());

        fs::write(dir.path().join("src/harness.ts"), "export function harness() {}\n").unwrap();
        let event = session
            .rebuild(&[dir.path().join("src/harness.ts")])
            .unwrap();
        assert!(matches!(event, SessionEvent::Rebuilt { ref entries, .. } if entries == &["embedded_dev"]));
        assert!(dir.path().join("dist/embedded_dev.js").exists());
        assert!(dir.path().join("dist/index.html").exists());
    }

    /// Counts calls; the call numbered `gate_at` blocks until released.
    struct GatedBundler {
        calls: AtomicUsize,
        gate_at: usize,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl BundlerService for GatedBundler {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn bundle_entry(
            &self,
            entry: &EntryPoint,
            _transformer: &Transformer,
        ) -> Result<CompiledArtifact, Vec<Error>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.gate_at {
                self.entered.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            Ok(CompiledArtifact {
                entry_name: entry.name.clone(),
                output: format!("build {call}").into_bytes(),
                declared_types: Vec::new(),
                modules: vec![module_key(&entry.source_path)],
            })
        }
    }

    #[test]
    fn test_newer_rebuild_supersedes_in_flight_one() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig {
            entries: vec![EntryConfig {
                name: "embedded".into(),
                source: PathBuf::from("src/embedded.ts"),
                role: EntryRole::Embedded,
            }],
            ..ProjectConfig::default()
        };
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let bundler = Arc::new(GatedBundler {
            calls: AtomicUsize::new(0),
            gate_at: 2,
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let pipeline = Arc::new(
            Pipeline::from_config(dir.path(), config)
                .unwrap()
                .with_bundler(bundler),
        );
        let session = Arc::new(DevSession::new(pipeline, DeploymentMode::DevServerEmbedded).unwrap());
        session.start();
        let changed = vec![dir.path().join("src/embedded.ts")];

        let slow = {
            let session = Arc::clone(&session);
            let changed = changed.clone();
            std::thread::spawn(move || session.rebuild(&changed))
        };
        entered_rx.recv().unwrap();
        assert_eq!(session.state(), SessionState::Rebuilding);

        let fast = session.rebuild(&changed).unwrap();
        assert!(matches!(fast, SessionEvent::Rebuilt { generation: 3, .. }));

        release_tx.send(()).unwrap();
        assert!(slow.join().unwrap().is_none());
        assert_eq!(
            fs::read_to_string(dir.path().join("dist/embedded.js")).unwrap(),
            "build 3"
        );
        assert_eq!(session.state(), SessionState::Watching);
    }
}
