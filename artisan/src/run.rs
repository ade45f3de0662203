//! Session orchestration: inspect, plan, optionally resume, then drive the
//! step loop to completion or a critical halt.
//!
//! Only an unreachable backend during inspection escapes as an error. Every
//! later failure is absorbed into the run and reported through [`RunReport`].

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::agents::inspector::SceneInspector;
use crate::agents::planner::Planner;
use crate::agents::resume::ResumeDetector;
use crate::core::types::Phase;
use crate::io::backend::ModelingBackend;
use crate::io::config::ArtisanConfig;
use crate::io::model::{ReasoningModel, VisionModel};
use crate::io::snapshot::SnapshotStore;
use crate::session::{RunReport, Session, SessionKey};
use crate::step::{StepContext, StepStop, run_step};

/// Per-run switches, typically sourced from the requirement file and CLI.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Allow resume detection against a populated scene.
    pub resume: bool,
    /// Allow the quality gate to trigger refinement passes.
    pub enable_refinement: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            resume: true,
            enable_refinement: true,
        }
    }
}

pub struct Orchestrator<'a, B, M, V> {
    backend: &'a B,
    reasoning: &'a M,
    vision: &'a V,
    config: &'a ArtisanConfig,
    snapshot_root: PathBuf,
}

impl<'a, B, M, V> Orchestrator<'a, B, M, V>
where
    B: ModelingBackend,
    M: ReasoningModel,
    V: VisionModel,
{
    pub fn new(
        backend: &'a B,
        reasoning: &'a M,
        vision: &'a V,
        config: &'a ArtisanConfig,
        snapshot_root: PathBuf,
    ) -> Self {
        Self {
            backend,
            reasoning,
            vision,
            config,
            snapshot_root,
        }
    }

    #[instrument(skip_all, fields(session = %key))]
    pub fn run(&self, requirement: &str, key: SessionKey, options: RunOptions) -> Result<RunReport> {
        let cfg = self.config;
        let store = SnapshotStore::new(&self.snapshot_root, &key)?;
        let mut session = Session::new(key);
        let mut phase = Phase::Inspecting;
        debug!(?phase, "session starting");

        let inspection = SceneInspector::new(self.backend, cfg.capture.snapshot_max_size)
            .inspect()?;
        if let Some(image) = &inspection.initial_image {
            match store.save_initial(image) {
                Ok(path) => debug!(path = %path.display(), "initial scene captured"),
                Err(err) => warn!(error = %format!("{err:#}"), "initial capture not persisted"),
            }
        }

        phase = Phase::Planning;
        let plan = Planner::new(self.reasoning, cfg.prompt.requirement_max_chars)
            .plan(requirement, &inspection.scene);

        if options.resume && inspection.scene.object_count() > cfg.resume.min_objects {
            phase = Phase::Resuming;
            let point = ResumeDetector::new(
                self.backend,
                self.reasoning,
                cfg.prompt.inspect_object_limit,
                cfg.resume.cap_fraction,
            )
            .detect(&plan, &inspection.scene);
            session.current_step = point.cursor;
            session.is_resuming = point.is_resuming;
        }

        let ctx = StepContext {
            backend: self.backend,
            reasoning: self.reasoning,
            vision: self.vision,
            store: &store,
            config: cfg,
            requirement,
        };
        while session.current_step < plan.len() && phase.permits(Phase::Executing) {
            phase = Phase::Executing;
            match run_step(&ctx, &mut phase, &mut session, &plan, options.enable_refinement) {
                StepStop::Advanced => {}
                StepStop::Halted { message } => {
                    warn!(error = %message, "session halted");
                }
            }
        }

        if phase != Phase::Halted {
            phase = Phase::Complete;
            session.is_complete = true;
        }
        info!(
            steps = session.steps_executed,
            refinements = session.refinement_total,
            complete = session.is_complete,
            "session finished"
        );
        Ok(RunReport::from_session(&session, plan.len(), store.dir()))
    }
}
