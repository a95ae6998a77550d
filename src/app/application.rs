//! Application - Headless Demo Scene
//!
//! Wires a few scene components (tab bar, achievements panel, dialog host,
//! error banner) to one `SceneContext` and drives them through a short script.

use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use serde_json::{json, Value};
use tokio::task::LocalSet;
use tracing::{info, warn};

use crate::app::context::SceneContext;
use crate::domain::{AchievementCategory, SceneConfig};
use crate::eventing::scene_event::{
    CategoryChanged, ComponentError, DialogEvent, ACHIEVEMENT_CATEGORY_CHANGED, COMPONENT_ERROR,
    DATA_RESET, DIALOG_CLOSED, DIALOG_OPENED,
};
use crate::eventing::{ListenerOptions, ListenerResult};
use crate::state::{
    FileStorage, SceneState, TokioScheduler, CURRENT_ACHIEVEMENT_CATEGORY, CURRENT_TAB,
    DIALOG_DATA, ERROR_MESSAGE, SHOWING_DIALOG,
};

/// Error banner lifetime used by the demo so the script finishes quickly
const DEMO_ERROR_DISPLAY: Duration = Duration::from_millis(300);

/// Run the demo scene on a current-thread runtime
pub fn run_demo() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to build tokio runtime")?;
    let local = LocalSet::new();
    local.block_on(&runtime, demo_scene())
}

async fn demo_scene() -> anyhow::Result<()> {
    let config = SceneConfig::load_or_default();
    let storage = FileStorage::in_data_dir().context("Failed to open preference storage")?;
    let context = SceneContext::new(&config, Box::new(storage), Rc::new(TokioScheduler::new()));

    wire_components(&context)?;

    let bus = context.bus();
    let state = context.state();

    state.set(CURRENT_TAB, "achievements")?;
    bus.emit(
        ACHIEVEMENT_CATEGORY_CHANGED,
        &CategoryChanged {
            category: AchievementCategory::Technique,
            previous: state
                .get_as(CURRENT_ACHIEVEMENT_CATEGORY)
                .unwrap_or_default(),
        },
    );
    bus.emit(
        DIALOG_OPENED,
        &DialogEvent::new("export").with_data(json!({ "format": "json" })),
    );
    bus.emit(
        COMPONENT_ERROR,
        &ComponentError::new("leaderboard", "Ranking service unavailable"),
    );

    tokio::time::sleep(DEMO_ERROR_DISPLAY * 2).await;
    info!(error = ?state.error_message(), "Error banner after display time");

    bus.emit(DIALOG_CLOSED, &DialogEvent::new("export"));
    bus.emit(DATA_RESET, &());

    let debug_info = serde_json::to_string_pretty(&bus.debug_info())?;
    info!("Bus debug info:\n{debug_info}");
    info!(preferences = ?state.preferences(), "Scene preferences");

    context.cleanup();
    Ok(())
}

fn wire_components(context: &SceneContext) -> anyhow::Result<()> {
    let bus = context.bus();
    let state = context.state();

    bus.on_error(|record| {
        warn!(%record, "Scene component failed");
        Ok(())
    });

    // Tab bar
    state.on_change(CURRENT_TAB, |new, old, _| {
        info!(from = %old, to = %new, "Tab switched");
        Ok(())
    });

    // Achievements panel
    let panel_state = state.clone();
    bus.on(
        ACHIEVEMENT_CATEGORY_CHANGED,
        move |change: &CategoryChanged, _| -> ListenerResult {
            panel_state.set(CURRENT_ACHIEVEMENT_CATEGORY, change.category.id())?;
            Ok(true)
        },
        ListenerOptions::default(),
    )?;

    // Dialog host
    let dialog_state = state.clone();
    bus.on(
        DIALOG_OPENED,
        move |dialog: &DialogEvent, _| -> ListenerResult {
            dialog_state.update([
                (SHOWING_DIALOG, Value::from(dialog.kind.as_str())),
                (DIALOG_DATA, dialog.data.clone().unwrap_or(Value::Null)),
            ])?;
            Ok(true)
        },
        ListenerOptions::priority(10),
    )?;
    let dialog_state = state.clone();
    bus.on(
        DIALOG_CLOSED,
        move |_: &DialogEvent, _| -> ListenerResult {
            dialog_state.update([(SHOWING_DIALOG, Value::Null), (DIALOG_DATA, Value::Null)])?;
            Ok(true)
        },
        ListenerOptions::priority(10),
    )?;

    // Error banner
    let banner_state = state.clone();
    bus.on(
        COMPONENT_ERROR,
        move |report: &ComponentError, _| -> ListenerResult {
            banner_state.set_error_for(
                format!("{}: {}", report.component, report.message),
                DEMO_ERROR_DISPLAY,
            );
            Ok(true)
        },
        ListenerOptions::default(),
    )?;
    state.on_change(ERROR_MESSAGE, |new, _, _| {
        match new.as_str() {
            Some(message) => warn!(message, "Error banner shown"),
            None => info!("Error banner cleared"),
        }
        Ok(())
    });

    let reset_state: SceneState = state.clone();
    bus.once(DATA_RESET, move |_: &(), _| -> ListenerResult {
        reset_state.reset(true);
        Ok(true)
    })?;

    Ok(())
}
