//! SceneState - Shared Observable Scene State
//!
//! Keyed store addressed by dotted paths over a JSON object graph. One store
//! is created per screen and shared (cheap `Rc` clone) by its components.
//!
//! ```text
//! set/update → write → notify exact-key listeners (only on change) → persist if allow-listed
//! ```
//!
//! Listener and storage failures are logged and never escape `set`/`update`.

use super::path::StatePath;
use super::preferences::{triggers_auto_save, ScenePreferences};
use super::scheduler::{Scheduler, TimerHandle};
use super::storage::PreferenceStorage;
use crate::domain::{AchievementCategory, CacheBucket, SceneTab, StateConfig};
use crate::error::{BoxError, Error, Result};
use crate::eventing::scene_event::{CacheCleared, StateReset, CACHE_CLEARED, STATE_RESET};
use crate::eventing::EventBus;
use ahash::AHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const TABS: &str = "tabs";
pub const ACHIEVEMENT_CATEGORIES: &str = "achievement_categories";
pub const ACCESSIBILITY_SETTINGS: &str = "accessibility_settings";
pub const SHOWING_DIALOG: &str = "showing_dialog";
pub const DIALOG_DATA: &str = "dialog_data";
pub const SCROLL_POSITION: &str = "scroll_position";
pub const SELECTED_ITEM: &str = "selected_item";
pub const FOCUSED_ELEMENT: &str = "focused_element";
pub const ERROR_MESSAGE: &str = "error_message";

/// Result returned by a change listener
pub type ChangeResult = std::result::Result<(), BoxError>;

/// Called with `(new_value, old_value, key)`
pub type ChangeListener = dyn Fn(&Value, &Value, &str) -> ChangeResult;

/// One observed change; a missing old value is `Null`
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub key: String,
    pub new_value: Value,
    pub old_value: Value,
}

struct RegisteredListener {
    id: u64,
    callback: Rc<ChangeListener>,
}

struct StateInner {
    data: RefCell<Map<String, Value>>,
    listeners: RefCell<AHashMap<String, Vec<RegisteredListener>>>,
    next_listener_id: Cell<u64>,
    error_timer: Cell<Option<TimerHandle>>,
    bus: RefCell<Option<EventBus>>,
    storage: Box<dyn PreferenceStorage>,
    scheduler: Rc<dyn Scheduler>,
    config: StateConfig,
}

/// Shared, observable state of one screen
#[derive(Clone)]
pub struct SceneState {
    inner: Rc<StateInner>,
}

/// Handle returned by [`SceneState::on_change`]
#[derive(Clone)]
pub struct ChangeSubscription {
    state: Weak<StateInner>,
    key: String,
    id: u64,
}

impl ChangeSubscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stop observing. Returns false if already removed or the store is gone.
    pub fn unsubscribe(&self) -> bool {
        let Some(inner) = self.state.upgrade() else {
            return false;
        };
        let removed = {
            let mut listeners = inner.listeners.borrow_mut();
            let Some(list) = listeners.get_mut(&self.key) else {
                return false;
            };
            let Some(index) = list.iter().position(|l| l.id == self.id) else {
                return false;
            };
            let removed = list.remove(index);
            if list.is_empty() {
                listeners.remove(&self.key);
            }
            removed
        };
        drop(removed);
        true
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

// ==================== Data helpers ====================

/// Transient UI fields, restored by `reset`
fn write_transient(data: &mut Map<String, Value>) {
    data.insert(SHOWING_DIALOG.into(), Value::Null);
    data.insert(DIALOG_DATA.into(), Value::Null);
    data.insert(SCROLL_POSITION.into(), json!(0));
    data.insert(SELECTED_ITEM.into(), json!(-1));
    data.insert(FOCUSED_ELEMENT.into(), json!(0));
    data.insert(ERROR_MESSAGE.into(), Value::Null);
}

fn initial_data(preferences: &ScenePreferences) -> Map<String, Value> {
    let mut data = Map::new();
    preferences.write_into(&mut data);
    data.insert(TABS.into(), json!(SceneTab::ALL.map(SceneTab::id)));
    data.insert(
        ACHIEVEMENT_CATEGORIES.into(),
        json!(AchievementCategory::ALL.map(AchievementCategory::id)),
    );
    data.insert(
        ACCESSIBILITY_SETTINGS.into(),
        json!({ "high_contrast": false, "large_text": false, "reduced_motion": false }),
    );
    write_transient(&mut data);
    for bucket in CacheBucket::ALL {
        data.insert(bucket.state_key().into(), Value::Null);
    }
    data
}

fn lookup<'a>(data: &'a Map<String, Value>, path: &StatePath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = data.get(first)?;
    for segment in rest {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Assign `value` at `path`, creating missing (or null) intermediate objects
fn assign(data: &mut Map<String, Value>, path: &StatePath, value: Value) -> Result<Value> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(Value::Null);
    };
    let mut current = data;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(Error::PathConflict {
                    path: path.to_string(),
                    segment: segment.clone(),
                });
            }
        };
    }
    Ok(current.insert(last.clone(), value).unwrap_or(Value::Null))
}

fn load_preferences(storage: &dyn PreferenceStorage, slot: &str) -> ScenePreferences {
    let raw = match storage.load(slot) {
        Ok(Some(raw)) => raw,
        Ok(None) => return ScenePreferences::default(),
        Err(e) => {
            warn!(error = %e, slot, "Failed to read preferences, using defaults");
            return ScenePreferences::default();
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => ScenePreferences::merged_over_defaults(&value),
        Err(e) => {
            warn!(error = %e, slot, "Stored preferences are not valid JSON, using defaults");
            ScenePreferences::default()
        }
    }
}

impl SceneState {
    /// Create the store, merging persisted preferences over defaults
    pub fn new(
        config: StateConfig,
        storage: Box<dyn PreferenceStorage>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let preferences = load_preferences(storage.as_ref(), &config.storage_slot);
        info!(
            slot = %config.storage_slot,
            tab = preferences.current_tab.id(),
            "Scene state initialized"
        );
        Self {
            inner: Rc::new(StateInner {
                data: RefCell::new(initial_data(&preferences)),
                listeners: RefCell::new(AHashMap::new()),
                next_listener_id: Cell::new(1),
                error_timer: Cell::new(None),
                bus: RefCell::new(None),
                storage,
                scheduler,
                config,
            }),
        }
    }

    /// Emit `cache_cleared` / `state_reset` on this bus as well
    pub fn attach_bus(&self, bus: &EventBus) {
        *self.inner.bus.borrow_mut() = Some(bus.clone());
    }

    pub fn detach_bus(&self) {
        let bus = self.inner.bus.borrow_mut().take();
        drop(bus);
    }

    // ==================== Reads ====================

    /// Value at a plain key or dotted path; `None` on any missing segment
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = match StatePath::parse(path) {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "Ignoring read of invalid path");
                return None;
            }
        };
        lookup(&self.inner.data.borrow(), &path).cloned()
    }

    /// Typed read; `None` when missing or of another shape
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn error_message(&self) -> Option<String> {
        self.get_as(ERROR_MESSAGE)
    }

    /// Validated preferences derived from the current data
    pub fn preferences(&self) -> ScenePreferences {
        ScenePreferences::from_state(&self.inner.data.borrow())
    }

    pub fn has_listeners(&self, key: &str) -> bool {
        self.inner.listeners.borrow().contains_key(key)
    }

    /// Plain snapshot of every stored field; timers and listeners are not part of it
    pub fn serialize(&self) -> Value {
        Value::Object(self.inner.data.borrow().clone())
    }

    // ==================== Writes ====================

    /// Set and notify; returns whether the value changed
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<bool> {
        self.set_with(path, value, true)
    }

    /// Set a value, creating missing intermediate objects
    ///
    /// Fails on a malformed path or when an intermediate value is not an object.
    pub fn set_with(&self, path: &str, value: impl Into<Value>, notify: bool) -> Result<bool> {
        let path = StatePath::parse(path)?;
        let change = self.write(&path, value.into())?;
        let changed = change.is_some();
        if notify && let Some(change) = change {
            self.notify(std::slice::from_ref(&change));
        }
        if triggers_auto_save(&path) {
            self.save_preferences();
        }
        Ok(changed)
    }

    /// Apply several values, then notify once per changed key in iteration order
    pub fn update<I, K, V>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.update_with(entries, true)
    }

    /// Batched update; all-or-nothing
    ///
    /// Entries are applied to a staged copy, so a bad path or a path conflict
    /// anywhere in the batch leaves the store untouched. A key written more
    /// than once yields one record from its first old value to its last new
    /// value, and none when those are equal.
    pub fn update_with<I, K, V>(&self, entries: I, notify: bool) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| Ok((StatePath::parse(key.as_ref())?, value.into())))
            .collect::<Result<Vec<_>>>()?;

        let mut staged = self.inner.data.borrow().clone();
        let mut changes: Vec<ChangeRecord> = Vec::new();
        let mut persist = false;
        for (path, value) in entries {
            let old_value = assign(&mut staged, &path, value.clone())?;
            persist |= triggers_auto_save(&path);
            let key = path.to_string();
            match changes.iter_mut().find(|change| change.key == key) {
                Some(change) => change.new_value = value,
                None if old_value != value => changes.push(ChangeRecord {
                    key,
                    new_value: value,
                    old_value,
                }),
                None => {}
            }
        }
        changes.retain(|change| change.new_value != change.old_value);
        *self.inner.data.borrow_mut() = staged;

        if notify {
            self.notify(&changes);
        }
        if persist {
            self.save_preferences();
        }
        Ok(changes.len())
    }

    fn write(&self, path: &StatePath, value: Value) -> Result<Option<ChangeRecord>> {
        let old_value = assign(&mut self.inner.data.borrow_mut(), path, value.clone())?;
        if old_value == value {
            return Ok(None);
        }
        Ok(Some(ChangeRecord {
            key: path.to_string(),
            new_value: value,
            old_value,
        }))
    }

    /// Replace a top-level key and notify its listeners when it changed
    fn replace_top(&self, key: &str, value: Value) {
        let old_value = self
            .inner
            .data
            .borrow_mut()
            .insert(key.to_string(), value.clone())
            .unwrap_or(Value::Null);
        if old_value != value {
            self.notify(&[ChangeRecord {
                key: key.to_string(),
                new_value: value,
                old_value,
            }]);
        }
    }

    // ==================== Change notification ====================

    /// Observe changes of one exact key
    pub fn on_change<F>(&self, key: &str, listener: F) -> ChangeSubscription
    where
        F: Fn(&Value, &Value, &str) -> ChangeResult + 'static,
    {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push(RegisteredListener {
                id,
                callback: Rc::new(listener),
            });
        ChangeSubscription {
            state: Rc::downgrade(&self.inner),
            key: key.to_string(),
            id,
        }
    }

    fn notify(&self, changes: &[ChangeRecord]) {
        for change in changes {
            let listeners: Vec<Rc<ChangeListener>> = self
                .inner
                .listeners
                .borrow()
                .get(&change.key)
                .map(|list| list.iter().map(|l| l.callback.clone()).collect())
                .unwrap_or_default();
            for listener in listeners {
                if let Err(e) = listener(&change.new_value, &change.old_value, &change.key) {
                    error!(key = %change.key, error = %e, "State change listener failed");
                }
            }
        }
    }

    fn notify_key(&self, key: &str, new_value: Value) {
        self.notify(&[ChangeRecord {
            key: key.to_string(),
            new_value,
            old_value: Value::Null,
        }]);
    }

    fn emit_on_bus<P: Serialize + 'static>(&self, event: &str, payload: &P) {
        let bus = self.inner.bus.borrow().clone();
        if let Some(bus) = bus {
            bus.emit(event, payload);
        }
    }

    // ==================== Transient error ====================

    /// Show an error for the configured display time
    pub fn set_error(&self, message: impl Into<String>) {
        let duration = self.inner.config.error_display();
        self.set_error_for(message, duration);
    }

    /// Show an error and clear it after `duration`; replaces any pending clear
    ///
    /// The timer is armed before listeners run; an error set from a listener
    /// replaces it.
    pub fn set_error_for(&self, message: impl Into<String>, duration: Duration) {
        let state = Rc::downgrade(&self.inner);
        let handle = self.inner.scheduler.schedule(
            duration,
            Box::new(move || {
                let Some(inner) = state.upgrade() else {
                    return;
                };
                inner.error_timer.set(None);
                SceneState { inner }.replace_top(ERROR_MESSAGE, Value::Null);
            }),
        );
        if let Some(previous) = self.inner.error_timer.replace(Some(handle)) {
            self.inner.scheduler.cancel(previous);
        }
        self.replace_top(ERROR_MESSAGE, Value::String(message.into()));
    }

    /// Cancel the pending clear and drop the message
    pub fn clear_error(&self) {
        self.cancel_error_timer();
        self.replace_top(ERROR_MESSAGE, Value::Null);
    }

    fn cancel_error_timer(&self) {
        if let Some(handle) = self.inner.error_timer.take() {
            self.inner.scheduler.cancel(handle);
        }
    }

    // ==================== Caches ====================

    /// Store data in a cache bucket without notification
    pub fn set_cache(&self, bucket: CacheBucket, value: impl Into<Value>) {
        self.inner
            .data
            .borrow_mut()
            .insert(bucket.state_key().to_string(), value.into());
    }

    pub fn cache(&self, bucket: CacheBucket) -> Option<Value> {
        self.get(bucket.state_key()).filter(|value| !value.is_null())
    }

    /// Null one bucket, or all of them, and notify `cache_cleared`
    pub fn clear_cache(&self, bucket: Option<CacheBucket>) {
        self.null_caches(bucket);
        let name = bucket.map(CacheBucket::name);
        debug!(bucket = ?name, "Cache cleared");
        self.notify_key(CACHE_CLEARED, name.map_or(Value::Null, Value::from));
        self.emit_on_bus(
            CACHE_CLEARED,
            &CacheCleared {
                bucket: name.map(str::to_string),
            },
        );
    }

    fn null_caches(&self, bucket: Option<CacheBucket>) {
        let mut data = self.inner.data.borrow_mut();
        let buckets = match bucket {
            Some(bucket) => vec![bucket],
            None => CacheBucket::ALL.to_vec(),
        };
        for bucket in buckets {
            data.insert(bucket.state_key().to_string(), Value::Null);
        }
    }

    // ==================== Persistence ====================

    /// Persist the preferences snapshot; failures are logged
    pub fn save_preferences(&self) {
        let slot = &self.inner.config.storage_slot;
        let result = serde_json::to_string(&self.preferences())
            .map_err(Error::from)
            .and_then(|json| self.inner.storage.save(slot, &json));
        match result {
            Ok(()) => debug!(slot = %slot, "Preferences saved"),
            Err(e) => warn!(error = %e, slot = %slot, "Failed to save preferences"),
        }
    }

    // ==================== Lifecycle ====================

    /// Restore transient UI state, drop caches and the error, and optionally
    /// restore preference defaults; notifies `state_reset`
    pub fn reset(&self, preserve_preferences: bool) {
        self.clear_error();
        self.clear_cache(None);
        {
            let mut data = self.inner.data.borrow_mut();
            write_transient(&mut data);
            if !preserve_preferences {
                ScenePreferences::default().write_into(&mut data);
            }
        }
        if !preserve_preferences {
            self.save_preferences();
        }
        info!(preserve_preferences, "Scene state reset");
        self.notify_key(STATE_RESET, Value::Bool(preserve_preferences));
        self.emit_on_bus(
            STATE_RESET,
            &StateReset {
                preserve_preferences,
            },
        );
    }

    /// Cancel timers, drop every listener and cached data
    pub fn cleanup(&self) {
        self.cancel_error_timer();
        let listeners = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        self.null_caches(None);
        self.detach_bus();
        info!(observed_keys = listeners.len(), "Scene state cleaned up");
    }
}

impl fmt::Debug for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneState")
            .field("slot", &self.inner.config.storage_slot)
            .field("error_timer", &self.inner.error_timer.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ViewMode;
    use crate::eventing::ListenerOptions;
    use crate::state::preferences::{CURRENT_TAB, DISPLAY_SETTINGS, VIEW_MODE};
    use crate::state::{ManualScheduler, MemoryStorage};

    const SLOT: &str = "user_info_scene_preferences";

    struct Harness {
        state: SceneState,
        storage: MemoryStorage,
        scheduler: ManualScheduler,
    }

    fn harness_with(storage: MemoryStorage) -> Harness {
        let scheduler = ManualScheduler::new();
        let state = SceneState::new(
            StateConfig::default(),
            Box::new(storage.clone()),
            Rc::new(scheduler.clone()),
        );
        Harness {
            state,
            storage,
            scheduler,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryStorage::new())
    }

    type Calls = Rc<RefCell<Vec<(Value, Value, String)>>>;

    fn observe(state: &SceneState, key: &str) -> Calls {
        let calls: Calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        state.on_change(key, move |new, old, key| {
            sink.borrow_mut()
                .push((new.clone(), old.clone(), key.to_string()));
            Ok(())
        });
        calls
    }

    struct FailingStorage;

    impl PreferenceStorage for FailingStorage {
        fn load(&self, _slot: &str) -> Result<Option<String>> {
            Err(Error::Invalid {
                message: "disk gone".into(),
            })
        }

        fn save(&self, _slot: &str, _contents: &str) -> Result<()> {
            Err(Error::Invalid {
                message: "disk gone".into(),
            })
        }
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let h = harness();
        assert!(h.state.set("a.b.c", 5).expect("set"));
        assert_eq!(h.state.get("a.b.c"), Some(json!(5)));
        assert_eq!(h.state.get("a"), Some(json!({ "b": { "c": 5 } })));
        assert_eq!(h.state.get("a.x.c"), None);
        assert_eq!(h.state.get("a..c"), None);
    }

    #[test]
    fn get_walks_arrays_by_index() {
        let h = harness();
        assert_eq!(h.state.get("tabs.1"), Some(json!("achievements")));
        assert_eq!(h.state.get("tabs.99"), None);
    }

    #[test]
    fn set_rejects_bad_paths() {
        let h = harness();
        assert!(matches!(
            h.state.set("a..b", 1),
            Err(Error::InvalidPath { .. })
        ));
        h.state.set("count", 3).expect("set count");
        assert!(matches!(
            h.state.set("count.inner", 1),
            Err(Error::PathConflict { .. })
        ));
        assert_eq!(h.state.get("count"), Some(json!(3)));
    }

    #[test]
    fn notifies_only_on_change() {
        let h = harness();
        let calls = observe(&h.state, SCROLL_POSITION);

        assert!(h.state.set(SCROLL_POSITION, 40).expect("set"));
        assert!(!h.state.set(SCROLL_POSITION, 40).expect("set same"));
        assert!(h.state.set_with(SCROLL_POSITION, 80, false).expect("set silent"));

        assert_eq!(
            *calls.borrow(),
            vec![(json!(40), json!(0), SCROLL_POSITION.to_string())]
        );
    }

    #[test]
    fn listeners_watch_exact_keys() {
        let h = harness();
        let parent = observe(&h.state, DISPLAY_SETTINGS);
        let child = observe(&h.state, "display_settings.compact_mode");

        h.state
            .set("display_settings.compact_mode", true)
            .expect("set child");
        assert!(parent.borrow().is_empty());
        assert_eq!(child.borrow().len(), 1);
    }

    #[test]
    fn failing_listener_is_isolated() {
        let h = harness();
        h.state
            .on_change(FOCUSED_ELEMENT, |_, _, _| Err("render failed".into()));
        let calls = observe(&h.state, FOCUSED_ELEMENT);

        assert!(h.state.set(FOCUSED_ELEMENT, 2).expect("set"));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn update_notifies_once_per_changed_key() {
        let h = harness();
        h.state.set_with("x", 1, false).expect("seed x");
        h.state.set_with("y", 0, false).expect("seed y");
        let x_calls = observe(&h.state, "x");
        let y_calls = observe(&h.state, "y");

        let changed = h
            .state
            .update(vec![("x", json!(1)), ("y", json!(2))])
            .expect("update");

        assert_eq!(changed, 1);
        assert!(x_calls.borrow().is_empty());
        assert_eq!(
            *y_calls.borrow(),
            vec![(json!(2), json!(0), "y".to_string())]
        );
    }

    #[test]
    fn update_with_conflict_leaves_state_untouched() {
        let h = harness();
        h.state.set_with("count", 3, false).expect("seed count");
        let calls = observe(&h.state, SCROLL_POSITION);
        let writes = h.storage.writes();

        let result = h.state.update([
            (SCROLL_POSITION, json!(99)),
            (CURRENT_TAB, json!("help")),
            ("count.inner", json!(1)),
        ]);

        assert!(matches!(result, Err(Error::PathConflict { .. })));
        assert_eq!(h.state.get(SCROLL_POSITION), Some(json!(0)));
        assert_eq!(h.state.get(CURRENT_TAB), Some(json!("statistics")));
        assert!(calls.borrow().is_empty());
        assert_eq!(h.storage.writes(), writes);
    }

    #[test]
    fn update_merges_repeated_keys() {
        let h = harness();
        let scroll = observe(&h.state, SCROLL_POSITION);
        let focus = observe(&h.state, FOCUSED_ELEMENT);

        let changed = h
            .state
            .update([
                (SCROLL_POSITION, 10),
                (FOCUSED_ELEMENT, 4),
                (SCROLL_POSITION, 20),
                (FOCUSED_ELEMENT, 0),
            ])
            .expect("update");

        assert_eq!(changed, 1);
        assert_eq!(
            *scroll.borrow(),
            vec![(json!(20), json!(0), SCROLL_POSITION.to_string())]
        );
        assert!(focus.borrow().is_empty());
        assert_eq!(h.state.get(FOCUSED_ELEMENT), Some(json!(0)));
    }

    #[test]
    fn update_notifies_after_all_writes() {
        let h = harness();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let reader = h.state.clone();
        h.state.on_change("first", move |_, _, _| {
            sink.borrow_mut().push(reader.get("second"));
            Ok(())
        });

        h.state
            .update([("first", 1), ("second", 2)])
            .expect("update");
        assert_eq!(*seen.borrow(), vec![Some(json!(2))]);
    }

    #[test]
    fn allow_listed_keys_trigger_persistence() {
        let h = harness();
        h.state.set(CURRENT_TAB, "help").expect("set tab");
        assert_eq!(h.storage.writes(), 1);

        h.state.set(SCROLL_POSITION, 10).expect("set scroll");
        assert_eq!(h.storage.writes(), 1);

        h.state
            .set("display_settings.compact_mode", true)
            .expect("set nested");
        assert_eq!(h.storage.writes(), 2);

        h.state
            .update([(VIEW_MODE, json!("detailed")), (SELECTED_ITEM, json!(3))])
            .expect("update");
        assert_eq!(h.storage.writes(), 3);

        let stored: Value =
            serde_json::from_str(&h.storage.contents(SLOT).expect("slot written"))
                .expect("stored json");
        assert_eq!(stored[CURRENT_TAB], json!("help"));
        assert_eq!(stored[VIEW_MODE], json!("detailed"));
        assert_eq!(stored[DISPLAY_SETTINGS]["compact_mode"], json!(true));
        assert!(stored.get(SCROLL_POSITION).is_none());
    }

    #[test]
    fn stored_preferences_are_merged_over_defaults() {
        let storage = MemoryStorage::with_slot(
            SLOT,
            r#"{"current_tab":"achievements","view_mode":"sideways","period_filter":"monthly"}"#,
        );
        let h = harness_with(storage);
        assert_eq!(h.state.get(CURRENT_TAB), Some(json!("achievements")));
        assert_eq!(h.state.get(VIEW_MODE), Some(json!("overview")));
        assert_eq!(h.state.get("period_filter"), Some(json!("monthly")));
        assert_eq!(h.state.preferences().view_mode, ViewMode::Overview);
    }

    #[test]
    fn corrupt_storage_falls_back_to_defaults() {
        let h = harness_with(MemoryStorage::with_slot(SLOT, "{not json"));
        assert_eq!(h.state.preferences(), ScenePreferences::default());
    }

    #[test]
    fn storage_failures_do_not_escape() {
        let state = SceneState::new(
            StateConfig::default(),
            Box::new(FailingStorage),
            Rc::new(ManualScheduler::new()),
        );
        assert_eq!(state.preferences(), ScenePreferences::default());
        assert!(state.set(CURRENT_TAB, "help").expect("set despite storage"));
        assert_eq!(state.get(CURRENT_TAB), Some(json!("help")));
    }

    #[test]
    fn newer_error_replaces_pending_clear() {
        let h = harness();
        let calls = observe(&h.state, ERROR_MESSAGE);

        h.state.set_error_for("A", Duration::from_millis(1000));
        h.scheduler.advance(Duration::from_millis(200));
        h.state.set_error_for("B", Duration::from_millis(1000));

        h.scheduler.advance(Duration::from_millis(900));
        assert_eq!(h.state.error_message().as_deref(), Some("B"));

        h.scheduler.advance(Duration::from_millis(100));
        assert_eq!(h.state.error_message(), None);
        assert_eq!(h.scheduler.pending(), 0);

        let values: Vec<_> = calls.borrow().iter().map(|c| c.0.clone()).collect();
        assert_eq!(values, vec![json!("A"), json!("B"), Value::Null]);
    }

    #[test]
    fn error_set_from_listener_keeps_its_own_timer() {
        let h = harness();
        let nested = h.state.clone();
        h.state.on_change(ERROR_MESSAGE, move |new, _, _| {
            if new == "A" {
                nested.set_error_for("B", Duration::from_millis(1000));
            }
            Ok(())
        });

        h.state.set_error_for("A", Duration::from_millis(100));
        assert_eq!(h.state.error_message().as_deref(), Some("B"));
        assert_eq!(h.scheduler.pending(), 1);

        h.scheduler.advance(Duration::from_millis(500));
        assert_eq!(h.state.error_message().as_deref(), Some("B"));

        h.state.clear_error();
        assert_eq!(h.scheduler.pending(), 0);

        h.state.set_error_for("C", Duration::from_millis(5000));
        h.scheduler.advance(Duration::from_millis(1000));
        assert_eq!(h.state.error_message().as_deref(), Some("C"));
    }

    #[test]
    fn set_error_uses_configured_duration() {
        let h = harness();
        h.state.set_error("load failed");
        h.scheduler.advance(Duration::from_millis(4999));
        assert_eq!(h.state.error_message().as_deref(), Some("load failed"));
        h.scheduler.advance(Duration::from_millis(1));
        assert_eq!(h.state.error_message(), None);
    }

    #[test]
    fn clear_error_cancels_timer_and_notifies() {
        let h = harness();
        h.state.set_error("oops");
        let calls = observe(&h.state, ERROR_MESSAGE);

        h.state.clear_error();
        assert_eq!(h.scheduler.pending(), 0);
        assert_eq!(
            *calls.borrow(),
            vec![(Value::Null, json!("oops"), ERROR_MESSAGE.to_string())]
        );

        h.state.clear_error();
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn clear_cache_notifies_bucket_name() {
        let h = harness();
        let bus = EventBus::default();
        h.state.attach_bus(&bus);
        let calls = observe(&h.state, CACHE_CLEARED);
        h.state
            .set_cache(CacheBucket::Statistics, json!({ "games": 3 }));
        h.state.set_cache(CacheBucket::User, json!({ "name": "p1" }));

        h.state.clear_cache(Some(CacheBucket::Statistics));
        assert_eq!(h.state.cache(CacheBucket::Statistics), None);
        assert!(h.state.cache(CacheBucket::User).is_some());

        h.state.clear_cache(None);
        assert_eq!(h.state.cache(CacheBucket::User), None);

        let values: Vec<_> = calls.borrow().iter().map(|c| c.0.clone()).collect();
        assert_eq!(values, vec![json!("statistics"), Value::Null]);

        let payloads: Vec<_> = bus
            .history_for(CACHE_CLEARED)
            .into_iter()
            .filter_map(|entry| entry.payload.value().cloned())
            .collect();
        assert_eq!(
            payloads,
            vec![json!({ "bucket": "statistics" }), json!({ "bucket": null })]
        );
    }

    #[test]
    fn reset_preserving_preferences() {
        let h = harness();
        h.state.set(CURRENT_TAB, "help").expect("set tab");
        h.state.set(SCROLL_POSITION, 120).expect("set scroll");
        h.state.set(SHOWING_DIALOG, "export").expect("set dialog");
        h.state.set_error("boom");
        let resets = observe(&h.state, STATE_RESET);
        let writes = h.storage.writes();

        h.state.reset(true);

        assert_eq!(h.state.get(CURRENT_TAB), Some(json!("help")));
        assert_eq!(h.state.get(SCROLL_POSITION), Some(json!(0)));
        assert_eq!(h.state.get(SHOWING_DIALOG), Some(Value::Null));
        assert_eq!(h.state.error_message(), None);
        assert_eq!(h.scheduler.pending(), 0);
        assert_eq!(h.storage.writes(), writes);
        assert_eq!(resets.borrow()[0].0, json!(true));
    }

    #[test]
    fn reset_restoring_preference_defaults() {
        let h = harness();
        let bus = EventBus::default();
        h.state.attach_bus(&bus);
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();
        bus.on(
            STATE_RESET,
            move |payload: &StateReset, _| {
                sink.set(Some(payload.preserve_preferences));
                Ok(true)
            },
            ListenerOptions::default(),
        )
        .expect("register");
        h.state.set(CURRENT_TAB, "help").expect("set tab");

        h.state.reset(false);

        assert_eq!(h.state.get(CURRENT_TAB), Some(json!("statistics")));
        assert_eq!(h.state.preferences(), ScenePreferences::default());
        let stored: Value =
            serde_json::from_str(&h.storage.contents(SLOT).expect("slot"))
                .expect("stored json");
        assert_eq!(stored[CURRENT_TAB], json!("statistics"));
        assert_eq!(seen.get(), Some(false));
    }

    #[test]
    fn serialize_exposes_fields_only() {
        let h = harness();
        h.state.on_change(CURRENT_TAB, |_, _, _| Ok(()));
        h.state.set_error("visible");
        let snapshot = h.state.serialize();
        let object = snapshot.as_object().expect("object snapshot");
        assert_eq!(object[ERROR_MESSAGE], json!("visible"));
        assert_eq!(object[TABS].as_array().map(Vec::len), Some(6));
        assert!(object.contains_key(CURRENT_TAB));
        assert!(object.contains_key("user_data"));
        assert!(!object.contains_key("listeners"));
    }

    #[test]
    fn change_subscription_unsubscribes() {
        let h = harness();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let subscription = h.state.on_change(SELECTED_ITEM, move |_, _, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        h.state.set(SELECTED_ITEM, 1).expect("set");
        assert!(subscription.unsubscribe());
        assert!(!h.state.has_listeners(SELECTED_ITEM));
        h.state.set(SELECTED_ITEM, 2).expect("set again");
        assert_eq!(calls.get(), 1);
        assert!(!subscription.unsubscribe());
    }

    #[test]
    fn cleanup_cancels_timer_and_listeners() {
        let h = harness();
        let calls = observe(&h.state, ERROR_MESSAGE);
        h.state.set_error("pending");
        h.state.set_cache(CacheBucket::Achievements, json!([1, 2]));

        h.state.cleanup();
        assert_eq!(h.scheduler.pending(), 0);
        assert!(!h.state.has_listeners(ERROR_MESSAGE));
        assert_eq!(h.state.cache(CacheBucket::Achievements), None);

        h.scheduler.advance(Duration::from_secs(10));
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(h.state.error_message().as_deref(), Some("pending"));
    }

    #[test]
    fn timer_after_drop_is_a_no_op() {
        let h = harness();
        h.state.set_error("late");
        let Harness { state, scheduler, .. } = h;
        drop(state);
        scheduler.advance(Duration::from_secs(10));
        assert_eq!(scheduler.pending(), 0);
    }
}
