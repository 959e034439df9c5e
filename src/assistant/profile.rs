//! The event-planning agent roster.
//!
//! Seven agents cover the planning flow: two conflict checkers driven in
//! parallel, an orchestrator routing on their combined report, a negotiator
//! for resolving clashes with the user, a planner, a reviewer presenting the
//! plan for approval, and the calendar writer carrying an approved plan out.
//! Edges are bound in one pass and the registry is sealed before any
//! dispatch happens.

use crate::domain::errors::EngineResult;
use crate::domain::models::{AgentHandle, AgentSpec, OutputContract};
use crate::services::registry::AgentRegistry;
use crate::services::tools::{
    TOOL_CALENDAR, TOOL_CONTEXT_FETCH, TOOL_CONTEXT_SAVE, TOOL_TODAY, TOOL_TRACK_QUESTION,
    TOOL_USER_ROUTINE,
};

/// Agent names; these double as handoff target labels.
pub const CALENDAR_CONFLICT_CHECKER: &str = "CalendarConflictChecker";
pub const ROUTINE_CONFLICT_CHECKER: &str = "RoutineConflictChecker";
pub const CONFLICT_ORCHESTRATOR: &str = "ConflictOrchestrator";
pub const NEGOTIATOR_AGENT: &str = "NegotiatorAgent";
pub const PLANNING_ORCHESTRATOR: &str = "PlanningOrchestrator";
pub const REVIEWER_AGENT: &str = "ReviewerAgent";
pub const CALENDAR_AGENT: &str = "CalendarAgent";

/// Name of the connector the calendar tool proxies to.
pub const CALENDAR_CONNECTOR: &str = "calendar";

const CALENDAR_CHECKER_INSTRUCTIONS: &str =
    "Check the calendar for scheduling conflicts with the proposed event.\n\
     Call today to resolve relative dates, then run the calendar tool's \
     list-events operation for the event date. Report every existing entry \
     that overlaps the requested time, with its start and end. Save the \
     event date with context_save under the key event_date. If nothing \
     overlaps, reply: No calendar conflicts.";

const ROUTINE_CHECKER_INSTRUCTIONS: &str =
    "Check the user's standing routine for conflicts with the proposed \
     event.\n\
     Fetch the routine with user_routine and resolve relative dates with \
     today. Compare the event timing against the recurring commitments in \
     the routine, including commute and working hours, and allow for travel \
     time to the event location. Report each clash with the specific times \
     involved. If nothing clashes, reply: No routine conflicts.";

const CONFLICT_ORCHESTRATOR_INSTRUCTIONS: &str =
    "Route the conversation based on the combined conflict report.\n\
     You receive the user's request together with the calendar and routine \
     check results. When either check found a conflict, summarize every \
     conflict in a few lines and transfer to NegotiatorAgent. When both \
     checks came back clear, say so in one line and transfer to \
     PlanningOrchestrator. Always transfer; never end the conversation \
     here.";

const NEGOTIATOR_INSTRUCTIONS: &str =
    "Help the user resolve the reported scheduling conflicts.\n\
     Present each conflict with its concrete times and offer practical ways \
     out: skipping a routine commitment once, shifting the commute, moving \
     an existing calendar entry, or adjusting the event time. Ask which \
     option the user prefers, save the chosen resolution with context_save \
     under the key resolution, and then transfer to PlanningOrchestrator.";

const PLANNER_INSTRUCTIONS: &str =
    "Gather what is missing and produce a complete event plan.\n\
     Check context_fetch for details already collected before asking \
     anything. Ask only for critical gaps such as the event type, who it is \
     for, and the spending level. Record each question you ask with \
     track_question; once it reports the limit is reached, stop asking and \
     work from reasonable assumptions. Build the plan around the user's \
     routine (user_routine) and their usual vendors, with a timeline, a \
     shopping list, and a budget estimate. Save the finished plan with \
     context_save under the key final_plan, then transfer to ReviewerAgent.";

const REVIEWER_INSTRUCTIONS: &str =
    "Present the finished plan and hand the decision back to the user.\n\
     Fetch the plan with context_fetch under the key final_plan and lay it \
     out clearly: timeline, vendors, budget estimate, and how it fits the \
     user's routine. Close by asking whether the plan works. Do not \
     transfer anywhere yourself; end your turn after presenting. Report \
     signal continue while the decision is still open; report approved or \
     changes_requested only when the user already gave a clear verdict \
     earlier in the conversation.";

const CALENDAR_AGENT_INSTRUCTIONS: &str =
    "Write the approved plan into the calendar.\n\
     Fetch the plan with context_fetch under the key final_plan. Create one \
     entry per task in the plan with the calendar tool's create-event \
     operation, giving each a clear title, ISO 8601 start and end times, \
     and a location when one applies. List the created entries back to the \
     user once every task is in. Report signal done only after every entry \
     was written; report continue while anything is still missing.";

/// Handles to the installed agents.
#[derive(Debug, Clone)]
pub struct ProfileHandles {
    /// Fan-out branch checking the external calendar.
    pub calendar_checker: AgentHandle,

    /// Fan-out branch checking the configured routine.
    pub routine_checker: AgentHandle,

    /// Entry point; routes on the merged conflict report.
    pub orchestrator: AgentHandle,

    /// Resolves conflicts with the user.
    pub negotiator: AgentHandle,

    /// Gathers details and drafts the plan.
    pub planner: AgentHandle,

    /// Presents the plan; the approval gate routes its outcome.
    pub reviewer: AgentHandle,

    /// Terminal agent writing calendar entries.
    pub calendar: AgentHandle,
}

/// Register the seven agents, bind the handoff edges and seal the registry.
///
/// The conflict checkers have no edges in either direction; they only run as
/// fan-out branches. The reviewer's two edges exist for the approval gate to
/// follow, not for the model to pick, so its handoffs are gated.
pub fn install(registry: &mut AgentRegistry) -> EngineResult<ProfileHandles> {
    let calendar_checker = registry.register(
        AgentSpec::new(CALENDAR_CONFLICT_CHECKER, CALENDAR_CHECKER_INSTRUCTIONS)
            .with_tools([TOOL_TODAY, TOOL_CONTEXT_SAVE, TOOL_CALENDAR])
            .with_connectors([CALENDAR_CONNECTOR]),
    )?;
    let routine_checker = registry.register(
        AgentSpec::new(ROUTINE_CONFLICT_CHECKER, ROUTINE_CHECKER_INSTRUCTIONS)
            .with_tools([TOOL_USER_ROUTINE, TOOL_CONTEXT_SAVE, TOOL_TODAY]),
    )?;
    let orchestrator = registry.register(
        AgentSpec::new(CONFLICT_ORCHESTRATOR, CONFLICT_ORCHESTRATOR_INSTRUCTIONS)
            .with_tools([TOOL_TODAY, TOOL_CONTEXT_SAVE]),
    )?;
    let negotiator = registry.register(
        AgentSpec::new(NEGOTIATOR_AGENT, NEGOTIATOR_INSTRUCTIONS)
            .with_tools([
                TOOL_CONTEXT_SAVE,
                TOOL_CONTEXT_FETCH,
                TOOL_USER_ROUTINE,
                TOOL_CALENDAR,
            ])
            .with_connectors([CALENDAR_CONNECTOR]),
    )?;
    let planner = registry.register(
        AgentSpec::new(PLANNING_ORCHESTRATOR, PLANNER_INSTRUCTIONS).with_tools([
            TOOL_USER_ROUTINE,
            TOOL_CONTEXT_SAVE,
            TOOL_CONTEXT_FETCH,
            TOOL_TODAY,
            TOOL_TRACK_QUESTION,
        ]),
    )?;
    let reviewer = registry.register(
        AgentSpec::new(REVIEWER_AGENT, REVIEWER_INSTRUCTIONS)
            .with_tools([TOOL_CONTEXT_FETCH, TOOL_USER_ROUTINE])
            .with_contract(OutputContract::Signal)
            .with_gated_handoffs(),
    )?;
    let calendar = registry.register(
        AgentSpec::new(CALENDAR_AGENT, CALENDAR_AGENT_INSTRUCTIONS)
            .with_tools([TOOL_CONTEXT_FETCH, TOOL_USER_ROUTINE, TOOL_TODAY, TOOL_CALENDAR])
            .with_connectors([CALENDAR_CONNECTOR])
            .with_contract(OutputContract::Signal),
    )?;

    registry.set_handoffs(&orchestrator, &[negotiator.clone(), planner.clone()])?;
    registry.set_handoffs(&negotiator, &[planner.clone()])?;
    registry.set_handoffs(&planner, &[reviewer.clone()])?;
    registry.set_handoffs(&reviewer, &[calendar.clone(), planner.clone()])?;
    registry.seal();

    Ok(ProfileHandles {
        calendar_checker,
        routine_checker,
        orchestrator,
        negotiator,
        planner,
        reviewer,
        calendar,
    })
}
