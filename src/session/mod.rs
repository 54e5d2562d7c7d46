//! Per-profile state container
//!
//! A [`Session`] owns the collection of one profile together with every
//! piece of state the engines read: records, selection, search text, filter
//! and settings. Each mutator runs a pure engine, commits the result in one
//! step and queues the changed record sets on the profile's writer.

pub mod sync;

pub use sync::{Notifier, SyncHandle, TracingNotifier};

use crate::activation::{self, ActivationOutcome, PendingConfirmation};
use crate::collection::{
    self, enforce_always_active, find_mod, is_collapsed, order_records, position, reconcile,
    ActivationRecord, Item, OrderRecord, SeparatorItem, SeparatorState,
};
use crate::config::{Config, Settings};
use crate::db::{ProfileStore, RecordSet, RecordTable};
use crate::ordering::{self, MoveKind};
use crate::view::{self, ActivationFilter, ModMeta, Selection, SortBy};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Keys a host forwards while the mod list has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Toggle every selected mod
    Space,
    /// Clear the selection
    Escape,
}

/// The user's answer to a [`PendingConfirmation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Apply the toggle together with every affected neighbour
    Cascade,
    /// Toggle only the requested mod
    TargetOnly,
    /// Leave everything as it was
    Cancel,
}

/// A move that was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveSummary {
    pub kind: MoveKind,
    /// Mods whose load order position changed
    pub reordered: usize,
}

/// Records read from storage, before they are aligned with the items
#[derive(Debug, Clone, Default)]
pub struct StoredRecords {
    pub activations: Vec<ActivationRecord>,
    pub separators: Vec<SeparatorState>,
    pub meta: Vec<ModMeta>,
}

/// State of one loaded profile
pub struct Session {
    profile_id: String,
    items: Vec<Item>,
    orders: Vec<OrderRecord>,
    activations: Vec<ActivationRecord>,
    separators: Vec<SeparatorState>,
    meta: Vec<ModMeta>,
    selection: Selection,
    search_text: String,
    activation_filter: ActivationFilter,
    settings: Settings,
    always_active_exception: String,
    pending: Option<PendingConfirmation>,
    sync: Option<SyncHandle>,
}

async fn retrieve(
    store: &dyn ProfileStore,
    profile_id: &str,
    table: RecordTable,
) -> Result<Option<RecordSet>> {
    store
        .retrieve(profile_id, table)
        .await
        .with_context(|| format!("Failed to load {} for profile '{}'", table.table_name(), profile_id))
}

impl Session {
    /// Build a session from items and stored records without a writer
    pub fn new(
        profile_id: impl Into<String>,
        items: Vec<Item>,
        stored: StoredRecords,
        settings: Settings,
        always_active_exception: impl Into<String>,
    ) -> Self {
        let reconciled = reconcile(&items, stored.activations, stored.separators);
        let meta = {
            let known: HashSet<&str> = items
                .iter()
                .filter_map(Item::as_mod)
                .map(|m| m.identifier.as_str())
                .collect();
            stored
                .meta
                .into_iter()
                .filter(|m| known.contains(m.mod_id.as_str()))
                .collect()
        };

        Self {
            profile_id: profile_id.into(),
            items,
            orders: reconciled.orders,
            activations: reconciled.activations,
            separators: reconciled.separators,
            meta,
            selection: Selection::new(),
            search_text: String::new(),
            activation_filter: ActivationFilter::All,
            settings,
            always_active_exception: always_active_exception.into(),
            pending: None,
            sync: None,
        }
    }

    /// Load a profile from `store` and start its writer.
    ///
    /// Records that reconciliation had to repair are written back right away.
    pub async fn load(
        store: Arc<dyn ProfileStore>,
        profile_id: &str,
        config: &Config,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let items = match retrieve(store.as_ref(), profile_id, RecordTable::Items).await? {
            Some(RecordSet::Items(items)) => items,
            _ => Vec::new(),
        };
        let stored_orders = match retrieve(store.as_ref(), profile_id, RecordTable::Orders).await? {
            Some(RecordSet::Orders(orders)) => Some(orders),
            _ => None,
        };
        let activations =
            match retrieve(store.as_ref(), profile_id, RecordTable::Activations).await? {
                Some(RecordSet::Activations(records)) => Some(records),
                _ => None,
            };
        let separators = match retrieve(store.as_ref(), profile_id, RecordTable::Separators).await? {
            Some(RecordSet::Separators(states)) => states,
            _ => Vec::new(),
        };
        let meta = match retrieve(store.as_ref(), profile_id, RecordTable::Meta).await? {
            Some(RecordSet::Meta(meta)) => meta,
            _ => Vec::new(),
        };

        let stored = StoredRecords {
            activations: activations.clone().unwrap_or_default(),
            separators,
            meta,
        };
        let mut session = Self::new(
            profile_id,
            items,
            stored,
            config.settings.clone(),
            config.always_active_exception.clone(),
        );
        session.sync = Some(SyncHandle::spawn(store, profile_id, notifier));

        if activations.as_ref() != Some(&session.activations) {
            session.persist(RecordTable::Activations);
        }
        if stored_orders.as_ref() != Some(&session.orders) {
            session.persist(RecordTable::Orders);
        }

        tracing::info!(
            "Loaded profile '{}': {} mods, {} separators",
            profile_id,
            session.total_mods(),
            session.items.len() - session.total_mods()
        );
        Ok(session)
    }

    /// Stop the writer after everything queued has been saved
    pub async fn close(self) -> Result<()> {
        match self.sync {
            Some(sync) => sync.close().await,
            None => Ok(()),
        }
    }

    // ========== Accessors ==========

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    pub fn activations(&self) -> &[ActivationRecord] {
        &self.activations
    }

    pub fn separators(&self) -> &[SeparatorState] {
        &self.separators
    }

    pub fn meta(&self) -> &[ModMeta] {
        &self.meta
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn activation_filter(&self) -> ActivationFilter {
        self.activation_filter
    }

    pub fn pending_confirmation(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    pub fn is_active(&self, mod_id: &str) -> Option<bool> {
        collection::activation_of(&self.activations, mod_id)
    }

    pub fn total_mods(&self) -> usize {
        collection::total_mods(&self.items)
    }

    pub fn item_indices(&self) -> HashMap<String, usize> {
        collection::item_indices(&self.items)
    }

    /// Collapsing only hides rows in the plain load-order list
    fn visibility_bypassed(&self) -> bool {
        !self.search_text.trim().is_empty()
            || self.activation_filter != ActivationFilter::All
            || !self.settings.sort_by.is_load_order()
    }

    pub fn hidden_items(&self) -> HashSet<String> {
        view::hidden_items(&self.items, &self.separators, self.visibility_bypassed())
    }

    /// Rows to display: filtered, minus hidden rows, then sorted
    pub fn view(&self) -> Vec<&Item> {
        let hidden = self.hidden_items();
        let visible: Vec<&Item> = view::filter_mods(
            &self.search_text,
            self.activation_filter,
            &self.items,
            &self.meta,
            &self.activations,
        )
        .into_iter()
        .filter(|item| !hidden.contains(item.identifier()))
        .collect();

        view::sort_items(visible, self.settings.sort_by, &self.meta)
    }

    /// Number of items dragged along with `active`, for the drag badge
    pub fn drag_group_size(&self, active: &str) -> usize {
        if self.selection.contains(active) {
            self.selection.len()
        } else {
            0
        }
    }

    /// Version column text, `None` while the column is switched off
    pub fn version_label(&self, mod_id: &str) -> Option<String> {
        if !self.settings.toggle_version {
            return None;
        }
        find_mod(&self.items, mod_id)
            .and_then(|m| m.version.as_ref())
            .map(|v| v.label())
    }

    // ========== Activation ==========

    /// Request that `mod_id` become `desired`.
    ///
    /// `confirm` overrides the dependency confirmation setting. A pending
    /// confirmation changes nothing and is kept until [`Session::resolve_pending`].
    pub fn request_activation(
        &mut self,
        mod_id: &str,
        desired: bool,
        confirm: Option<bool>,
    ) -> ActivationOutcome {
        let confirmation_required = confirm.unwrap_or(self.settings.dependency_confirmation);
        let outcome = activation::request_activation(
            &self.items,
            &self.activations,
            mod_id,
            desired,
            confirmation_required,
        );

        match &outcome {
            ActivationOutcome::Applied(records) => {
                self.pending = None;
                self.commit_activations(records.clone());
            }
            ActivationOutcome::PendingConfirmation(pending) => {
                tracing::debug!(
                    "Toggle of '{}' awaits confirmation ({} mod(s) affected)",
                    pending.mod_id,
                    pending.reason.mod_ids().len()
                );
                self.pending = Some(pending.clone());
            }
        }
        outcome
    }

    /// Answer the pending confirmation, if any
    pub fn resolve_pending(&mut self, decision: Decision) -> Option<ActivationOutcome> {
        let pending = self.pending.take()?;
        match decision {
            Decision::Cascade => {
                Some(self.request_activation(&pending.mod_id, pending.desired, Some(false)))
            }
            Decision::TargetOnly => {
                let records =
                    activation::set_active(&self.activations, &[pending.mod_id.as_str()], pending.desired);
                self.commit_activations(records);
                Some(ActivationOutcome::Applied(self.activations.clone()))
            }
            Decision::Cancel => None,
        }
    }

    /// Toggle the whole section under a separator. Returns false when the
    /// separator is unknown or empty.
    pub fn toggle_group(&mut self, separator_id: &str) -> bool {
        match activation::toggle_group(&self.items, &self.activations, separator_id) {
            Some(records) => {
                self.commit_activations(records);
                true
            }
            None => false,
        }
    }

    /// Toggle every selected mod. A multi-selection cascades without asking;
    /// a single selected mod follows the confirmation flow.
    pub fn toggle_selected(&mut self) -> Option<ActivationOutcome> {
        let ids: Vec<String> = self
            .selection
            .ordered(&self.items)
            .into_iter()
            .filter(|id| find_mod(&self.items, id).is_some())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return None;
        }

        let desired = activation::bulk_desired(&self.activations, &ids);
        let confirm = ids.len() == 1;
        let mut last = None;
        for id in &ids {
            last = Some(self.request_activation(id, desired, Some(confirm)));
        }
        last
    }

    pub fn handle_key(&mut self, key: Key) -> Option<ActivationOutcome> {
        match key {
            Key::Space => self.toggle_selected(),
            Key::Escape => {
                self.clear_selection();
                None
            }
        }
    }

    fn commit_activations(&mut self, records: Vec<ActivationRecord>) {
        if records == self.activations {
            return;
        }
        self.activations = records;
        self.persist(RecordTable::Activations);
    }

    // ========== Ordering ==========

    /// Drop `active` onto `over`.
    ///
    /// Drags are only accepted while the list is in load order. Returns
    /// `None` when nothing moved.
    pub fn move_item(&mut self, active: &str, over: Option<&str>) -> Option<MoveSummary> {
        if !self.settings.sort_by.is_load_order() {
            tracing::debug!(
                "Ignoring move of '{}' while sorted by {}",
                active,
                self.settings.sort_by.as_str()
            );
            return None;
        }

        let kind = ordering::resolve_kind(&self.items, self.selection.rows(), &self.separators, active);
        let outcome = ordering::apply_move(
            &self.items,
            &self.orders,
            kind,
            self.selection.rows(),
            active,
            over,
        )?;

        let checked = ordering::validate_positions(&outcome.items, &outcome.orders);
        debug_assert!(checked.is_ok(), "order invariant broken: {:?}", checked);
        if let Err(e) = checked {
            tracing::error!("Discarding move of '{}': {}", active, e);
            return None;
        }

        let summary = MoveSummary {
            kind: outcome.kind,
            reordered: outcome.dirty.len(),
        };
        self.items = outcome.items;
        self.orders = outcome.orders;
        self.persist(RecordTable::Items);
        self.persist(RecordTable::Orders);
        Some(summary)
    }

    /// Insert a new, expanded separator at `index` (end of list when `None`)
    /// and return its identifier
    pub fn add_separator(&mut self, title: impl Into<String>, index: Option<usize>) -> String {
        let identifier = uuid::Uuid::new_v4().to_string();
        let at = index.unwrap_or(self.items.len()).min(self.items.len());
        self.items
            .insert(at, SeparatorItem::new(identifier.clone(), title).into());
        self.orders = order_records(&self.items);

        self.persist(RecordTable::Items);
        self.persist(RecordTable::Orders);
        identifier
    }

    /// Remove a mod or separator along with everything recorded about it
    pub fn remove_item(&mut self, identifier: &str) -> Option<Item> {
        let idx = position(&self.items, identifier)?;
        let removed = self.items.remove(idx);

        match &removed {
            Item::Separator(_) => {
                self.separators.retain(|s| s.identifier != identifier);
                self.persist(RecordTable::Separators);
            }
            Item::Mod(m) => {
                self.activations.retain(|r| r.mod_id != identifier);
                self.meta.retain(|entry| entry.mod_id != identifier);
                self.persist(RecordTable::Activations);
                self.persist(RecordTable::Meta);
                tracing::info!(
                    "Removed '{}' from profile '{}' ({:?})",
                    m.title,
                    self.profile_id,
                    m.item_type.removal_kind()
                );
            }
        }

        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.mod_id == identifier)
        {
            self.pending = None;
        }
        self.selection.retain_existing(&self.items);
        self.orders = order_records(&self.items);
        self.persist(RecordTable::Items);
        self.persist(RecordTable::Orders);
        Some(removed)
    }

    /// Replace the whole collection, keeping records of mods that survive
    pub fn replace_items(&mut self, items: Vec<Item>) {
        let reconciled = reconcile(
            &items,
            std::mem::take(&mut self.activations),
            std::mem::take(&mut self.separators),
        );
        {
            let known: HashSet<&str> = items.iter().map(Item::identifier).collect();
            self.meta.retain(|m| known.contains(m.mod_id.as_str()));
        }

        self.items = items;
        self.orders = reconciled.orders;
        self.activations = reconciled.activations;
        self.separators = reconciled.separators;
        self.selection.retain_existing(&self.items);
        self.pending = None;

        for table in RecordTable::all() {
            self.persist(*table);
        }
    }

    // ========== Selection and view ==========

    /// Click on a row. Only mods are selectable, and only in load order.
    pub fn toggle_row(&mut self, identifier: &str, extend: bool) {
        if !self.settings.sort_by.is_load_order() || find_mod(&self.items, identifier).is_none() {
            return;
        }
        self.selection.toggle_row(identifier, extend);
    }

    pub fn select_range(&mut self, start: &str, end: &str) {
        if !self.settings.sort_by.is_load_order() {
            return;
        }
        self.selection.select_range(&self.items, start, end);
    }

    /// Shift-click: select from the anchor to `identifier`
    pub fn extend_selection_to(&mut self, identifier: &str) {
        match self.selection.anchor().map(str::to_string) {
            Some(anchor) => self.select_range(&anchor, identifier),
            None => self.toggle_row(identifier, false),
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    pub fn set_activation_filter(&mut self, filter: ActivationFilter) {
        self.activation_filter = filter;
    }

    /// Switch sort mode. Leaving load order clears the selection.
    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.settings.sort_by = sort_by;
        if !sort_by.is_load_order() {
            self.selection.clear();
        }
    }

    pub fn set_dependency_confirmation(&mut self, enabled: bool) {
        self.settings.dependency_confirmation = enabled;
    }

    pub fn set_toggle_version(&mut self, enabled: bool) {
        self.settings.toggle_version = enabled;
    }

    /// Flip a separator's collapse flag and return the new value
    pub fn toggle_collapsed(&mut self, separator_id: &str) -> Option<bool> {
        let is_separator = self
            .items
            .iter()
            .any(|i| i.is_separator() && i.identifier() == separator_id);
        if !is_separator {
            return None;
        }

        let collapsed = !is_collapsed(&self.separators, separator_id);
        match self
            .separators
            .iter_mut()
            .find(|s| s.identifier == separator_id)
        {
            Some(state) => state.collapsed = collapsed,
            None => self.separators.push(SeparatorState {
                identifier: separator_id.to_string(),
                collapsed,
            }),
        }

        self.persist(RecordTable::Separators);
        Some(collapsed)
    }

    /// Assign or clear the category of a mod. Returns false for unknown mods.
    pub fn set_category(&mut self, mod_id: &str, category: Option<String>) -> bool {
        if find_mod(&self.items, mod_id).is_none() {
            return false;
        }

        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.meta.retain(|m| m.mod_id != mod_id);
        if category.is_some() {
            self.meta.push(ModMeta {
                mod_id: mod_id.to_string(),
                category,
            });
        }

        self.persist(RecordTable::Meta);
        true
    }

    // ========== Persistence ==========

    /// Queue the current state of `table` on the writer.
    ///
    /// Activations are saved with every base mod except the configured
    /// exception forced on; orders are only saved in load order.
    fn persist(&self, table: RecordTable) {
        let Some(sync) = &self.sync else {
            return;
        };

        let records = match table {
            RecordTable::Items => RecordSet::Items(self.items.clone()),
            RecordTable::Orders => {
                if !self.settings.sort_by.is_load_order() {
                    tracing::debug!(
                        "Not saving load order of '{}' while sorted by {}",
                        self.profile_id,
                        self.settings.sort_by.as_str()
                    );
                    return;
                }
                RecordSet::Orders(self.orders.clone())
            }
            RecordTable::Activations => RecordSet::Activations(enforce_always_active(
                &self.items,
                &self.activations,
                &self.always_active_exception,
            )),
            RecordTable::Separators => RecordSet::Separators(self.separators.clone()),
            RecordTable::Meta => RecordSet::Meta(self.meta.clone()),
        };
        sync.submit(records);
    }
}
