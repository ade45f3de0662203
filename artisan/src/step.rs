//! One pass of the step loop: execute, capture, assess, refine, advance.

use tracing::{info, instrument, warn};

use crate::agents::critic::FeedbackCapturer;
use crate::agents::executor::StepExecutor;
use crate::agents::refiner::Refiner;
use crate::core::classifier::{ErrorSeverity, classify_tool_error, outcome_has_error};
use crate::core::gate::assess;
use crate::core::types::{Phase, QualityVerdict, RefinementState};
use crate::io::backend::{ModelingBackend, TOOL_EXECUTE_CODE};
use crate::io::config::ArtisanConfig;
use crate::io::model::{ReasoningModel, VisionModel};
use crate::io::snapshot::SnapshotStore;
use crate::session::Session;

/// Shared collaborators for the step loop, borrowed for the run's lifetime.
pub(crate) struct StepContext<'a, B, M, V> {
    pub backend: &'a B,
    pub reasoning: &'a M,
    pub vision: &'a V,
    pub store: &'a SnapshotStore,
    pub config: &'a ArtisanConfig,
    pub requirement: &'a str,
}

/// How one step pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StepStop {
    /// The cursor advanced; the loop may continue.
    Advanced,
    /// A critical execution failure; the session must stop here.
    Halted { message: String },
}

/// Move the machine to `next`, which the current phase must permit.
fn advance(phase: &mut Phase, next: Phase) {
    debug_assert!(
        phase.permits(next),
        "phase {phase:?} must permit {next:?}"
    );
    *phase = next;
}

/// Execute the step at the session's cursor, then run the capture/assess/
/// refine sub-loop until the gate passes or the attempt budget runs out.
///
/// Expects `phase` to be `Executing` on entry and leaves it at `Advancing`
/// or `Halted`; every intermediate transition goes through the table in
/// [`Phase::permits`].
#[instrument(skip_all, fields(step = session.current_step))]
pub(crate) fn run_step<B, M, V>(
    ctx: &StepContext<'_, B, M, V>,
    phase: &mut Phase,
    session: &mut Session,
    plan: &[String],
    enable_refinement: bool,
) -> StepStop
where
    B: ModelingBackend,
    M: ReasoningModel,
    V: VisionModel,
{
    let step_index = session.current_step;
    let step = &plan[step_index];
    let cfg = ctx.config;
    info!(step = %step, "executing plan step");

    let executor = StepExecutor::new(
        ctx.backend,
        ctx.reasoning,
        ctx.requirement,
        cfg.prompt.requirement_max_chars,
        cfg.prompt.history_window,
    );
    let results = executor.execute(step, step_index, plan.len(), &session.tool_results);

    let critical = results.iter().find_map(|entry| {
        if entry.tool_name != TOOL_EXECUTE_CODE
            || !outcome_has_error(entry.success, &entry.result)
        {
            return None;
        }
        match classify_tool_error(&entry.result, step_index, cfg.quality.critical_step_count) {
            ErrorSeverity::Critical => Some(format!("step {step_index} failed: {}", entry.result)),
            ErrorSeverity::Recoverable => None,
        }
    });
    session.tool_results.extend(results);
    if let Some(message) = critical {
        warn!(error = %message, "critical execution failure, halting session");
        session.critical_error = Some(message.clone());
        advance(phase, Phase::Halted);
        return StepStop::Halted { message };
    }

    let policy = cfg.gate_policy();
    let capturer = FeedbackCapturer::new(
        ctx.backend,
        ctx.vision,
        ctx.store,
        cfg.capture.snapshot_max_size,
    );
    let refiner = Refiner::new(ctx.backend, ctx.reasoning);
    let mut state = RefinementState::default();

    loop {
        advance(phase, Phase::Capturing);
        let captured = capturer.capture(step, step_index, state.attempts);
        if let Some(snapshot) = captured.snapshot {
            session.snapshots.push(snapshot);
        }
        advance(phase, Phase::Assessing);
        let Some(critique) = captured.critique else {
            // Nothing to judge; record the gap and accept the step.
            session.verdicts.push(QualityVerdict {
                step_index,
                attempt: state.attempts,
                score: None,
                critique: "vision critique unavailable".to_string(),
                needs_refinement: false,
            });
            break;
        };

        let verdict = assess(&policy, step_index, &critique, &state);
        let needs_refinement = verdict.needs_refinement;
        session.verdicts.push(verdict);
        if !(needs_refinement && enable_refinement) {
            break;
        }

        advance(phase, Phase::Refining);
        let refinements = refiner.refine(step, &critique);
        session.tool_results.extend(refinements);
        state.attempts += 1;
        state.last_critique = Some(critique);
        session.refinement_total += 1;
    }

    advance(phase, Phase::Advancing);
    session.current_step += 1;
    session.steps_executed += 1;
    StepStop::Advanced
}
