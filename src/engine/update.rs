//! Pure update function for the flow monitor.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side effects the runtime should execute.
//! This module performs zero I/O.

use chrono::Utc;

use super::fetch::FetchBundle;
use super::model::{Activity, FlowCmd, FlowMonitorModel, FlowMsg, View, ViewFilter};
use super::scheduler::{Decision, RefreshScheduler, TimerAction};
use super::timeline::summarize;
use super::triage::{resolution_failed_notice, resolved_notice, triage};
use crate::core::errors::{FetchError, ProviderError};
use crate::domain::{ResolutionAck, ResolutionRequest};
use crate::flow::hit_test::hit_test;
use crate::flow::layout::FlowFrame;
use crate::flow::style::StyleRegistry;
use crate::notify::Notice;

pub const FETCH_ERROR_TITLE: &str = "Data Flow Error";
pub const NO_CONFLICTS_TITLE: &str = "No Conflicts Found";
pub const NO_UPDATES_TITLE: &str = "No Updates Found";

/// Apply a message to the model and return the next command for the runtime.
pub fn update(model: &mut FlowMonitorModel, msg: FlowMsg) -> FlowCmd {
    match msg {
        FlowMsg::Init => {
            let fetch = request_fetch(model);
            let auto = if model.settings.auto_refresh {
                let interval = model.settings.interval;
                apply_decision(model, |s| s.enable_auto(interval))
            } else {
                FlowCmd::None
            };
            FlowCmd::batch([fetch, auto])
        }

        FlowMsg::SetTimeRange(range) => apply_decision(model, |s| s.set_time_range(range)),
        FlowMsg::EnableAuto(interval) => apply_decision(model, |s| s.enable_auto(interval)),
        FlowMsg::DisableAuto => apply_decision(model, RefreshScheduler::disable_auto),
        FlowMsg::ChangeInterval(interval) => {
            apply_decision(model, |s| s.change_interval(interval))
        }
        FlowMsg::ManualRefresh => apply_decision(model, |s| s.manual_refresh()),
        FlowMsg::TimerTick { generation } => {
            let decision = model.scheduler.on_tick(generation);
            execute_decision(model, decision)
        }

        FlowMsg::FetchCompleted { cycle, result } => complete_fetch(model, cycle, result),

        FlowMsg::Click(point) => {
            model.selected = hit_test(point, model.frame.entities()).map(|e| e.id.clone());
            FlowCmd::None
        }

        FlowMsg::Select(id) => {
            if model.frame.contains(&id) {
                model.selected = Some(id);
            }
            FlowCmd::None
        }

        FlowMsg::SelectView(view) => {
            model.view = view;
            model.filter = ViewFilter::All;
            FlowCmd::None
        }

        FlowMsg::ShowEntityConflicts => {
            let Some(entity) = model.selected_entity() else {
                return FlowCmd::None;
            };
            let (id, name) = (entity.id.clone(), entity.name.clone());
            if model.conflicts.iter().any(|c| c.involves(&id)) {
                model.view = View::Conflicts;
                model.filter = ViewFilter::Entity(id);
                FlowCmd::None
            } else {
                FlowCmd::Notify(Notice::info(
                    NO_CONFLICTS_TITLE,
                    format!("No conflicts found for {name}."),
                ))
            }
        }

        FlowMsg::ShowEntityHistory => {
            let Some(entity) = model.selected_entity() else {
                return FlowCmd::None;
            };
            let (id, name) = (entity.id.clone(), entity.name.clone());
            if model.updates.iter().any(|u| u.entity_id == id) {
                model.view = View::History;
                model.filter = ViewFilter::Entity(id);
                FlowCmd::None
            } else {
                FlowCmd::Notify(Notice::info(
                    NO_UPDATES_TITLE,
                    format!("No updates found for {name}."),
                ))
            }
        }

        FlowMsg::ToggleUpdate(update_id) => {
            if model.updates.iter().any(|u| u.id == update_id) {
                model.expansion.toggle(&update_id);
            }
            FlowCmd::None
        }

        FlowMsg::Resolve {
            conflict_id,
            option,
        } => request_resolution(model, conflict_id, option),

        FlowMsg::ResolutionCompleted {
            conflict_id,
            result,
        } => complete_resolution(model, conflict_id, result),
    }
}

// ──────────────────── scheduling ────────────────────

fn apply_decision(
    model: &mut FlowMonitorModel,
    op: impl FnOnce(&mut RefreshScheduler) -> Decision,
) -> FlowCmd {
    let decision = op(&mut model.scheduler);
    execute_decision(model, decision)
}

fn execute_decision(model: &mut FlowMonitorModel, decision: Decision) -> FlowCmd {
    let timer = match decision.timer {
        TimerAction::Keep => FlowCmd::None,
        TimerAction::Start {
            generation,
            interval,
        } => FlowCmd::StartTimer {
            generation,
            interval,
        },
        TimerAction::Cancel => FlowCmd::CancelTimer,
    };
    let fetch = if decision.fetch {
        request_fetch(model)
    } else {
        FlowCmd::None
    };
    FlowCmd::batch([timer, fetch])
}

/// Start a cycle now, or queue the single follow-up behind the running one.
fn request_fetch(model: &mut FlowMonitorModel) -> FlowCmd {
    match model.cycles.request() {
        Some(cycle) => {
            model.loading = true;
            FlowCmd::Fetch {
                cycle,
                range: model.time_range(),
            }
        }
        None => FlowCmd::None,
    }
}

// ──────────────────── fetch results ────────────────────

fn complete_fetch(
    model: &mut FlowMonitorModel,
    cycle: u64,
    result: Result<Box<FetchBundle>, FetchError>,
) -> FlowCmd {
    if !model.cycles.finish(cycle) {
        return FlowCmd::None;
    }
    model.loading = false;

    let outcome = match result {
        Ok(bundle) => apply_bundle(model, cycle, *bundle),
        Err(err) => {
            let message = err.to_string();
            model.error = Some(format!("Failed to load data flow: {message}"));
            FlowCmd::batch([
                FlowCmd::Notify(Notice::error(FETCH_ERROR_TITLE, message.clone())),
                FlowCmd::Record(Activity::FetchFailed {
                    cycle,
                    range: model.time_range(),
                    message,
                }),
            ])
        }
    };

    let follow_up = if model.cycles.take_follow_up() {
        request_fetch(model)
    } else {
        FlowCmd::None
    };
    FlowCmd::batch([outcome, follow_up])
}

/// Hand a successful cycle to layout, timeline, then triage.
fn apply_bundle(model: &mut FlowMonitorModel, cycle: u64, bundle: FetchBundle) -> FlowCmd {
    let FetchBundle {
        range,
        entities,
        relations,
        updates,
        conflicts,
        elapsed,
    } = bundle;

    model.frame = FlowFrame::build(
        entities,
        relations,
        &model.settings.geometry,
        StyleRegistry,
        model.settings.sort_entities_by_id,
    );
    if model
        .selected
        .as_deref()
        .is_some_and(|id| !model.frame.contains(id))
    {
        model.selected = None;
    }

    model.summary = summarize(&updates);
    model.expansion.prune(&updates);
    model.updates = updates;

    let outcome = triage(&conflicts);
    model.conflicts = conflicts;

    model.error = None;
    model.last_fetch = Some(Utc::now());

    let high_severity = outcome.high_severity.len();
    let completed = FlowCmd::Record(Activity::FetchCompleted {
        cycle,
        range,
        entities: model.frame.entities().len(),
        relations: model.frame.relations().len(),
        updates: model.updates.len(),
        conflicts: model.conflicts.len(),
        high_severity,
        duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    });
    let alert = outcome.alert.map_or(FlowCmd::None, |notice| {
        FlowCmd::batch([
            FlowCmd::Notify(notice),
            FlowCmd::Record(Activity::ConflictAlert {
                cycle,
                high_severity,
            }),
        ])
    });
    FlowCmd::batch([completed, alert])
}

// ──────────────────── resolution ────────────────────

fn request_resolution(
    model: &mut FlowMonitorModel,
    conflict_id: String,
    option: Option<String>,
) -> FlowCmd {
    if model.resolving.contains(&conflict_id) {
        return FlowCmd::None;
    }
    let Some(conflict) = model.conflict(&conflict_id) else {
        return resolution_failed(
            conflict_id.clone(),
            &format!("conflict {conflict_id} is not active"),
        );
    };
    if let Some(option_id) = option.as_deref() {
        let offered = conflict.options();
        if !offered.is_empty() && !offered.iter().any(|o| o.id == option_id) {
            return resolution_failed(
                conflict_id,
                &format!("unknown resolution option {option_id}"),
            );
        }
    }
    let request = ResolutionRequest::new(conflict.clone(), option);
    model.resolving.insert(conflict_id);
    FlowCmd::Resolve(request)
}

fn complete_resolution(
    model: &mut FlowMonitorModel,
    conflict_id: String,
    result: Result<ResolutionAck, ProviderError>,
) -> FlowCmd {
    if !model.resolving.remove(&conflict_id) {
        return FlowCmd::None;
    }
    match result {
        Ok(ResolutionAck { success: true }) => {
            let notice = model.conflict(&conflict_id).map_or_else(
                || {
                    Notice::success(
                        super::triage::RESOLVED_TITLE,
                        format!("{conflict_id} has been resolved."),
                    )
                },
                resolved_notice,
            );
            let refetch = request_fetch(model);
            FlowCmd::batch([
                FlowCmd::Notify(notice),
                FlowCmd::Record(Activity::ResolutionApplied { conflict_id }),
                refetch,
            ])
        }
        Ok(ResolutionAck { success: false }) => {
            resolution_failed(conflict_id, "the provider declined the resolution")
        }
        Err(err) => resolution_failed(conflict_id, &err.to_string()),
    }
}

fn resolution_failed(conflict_id: String, details: &str) -> FlowCmd {
    FlowCmd::batch([
        FlowCmd::Notify(resolution_failed_notice(details)),
        FlowCmd::Record(Activity::ResolutionFailed {
            conflict_id,
            message: details.to_string(),
        }),
    ])
}
