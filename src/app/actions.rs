//! CLI command action handlers

use super::App;
use crate::activation::{ActivationOutcome, ConfirmationReason};
use crate::collection::{child_mods, duplicate_identifier, find_mod, is_collapsed, Item, RemovalKind};
use crate::ordering::MoveKind;
use crate::session::Decision;
use crate::view::{category_of, ActivationFilter, SortBy};
use anyhow::{bail, Context, Result};

impl App {
    // ========== Collection Commands ==========

    /// Replace the profile's collection with the items in a JSON file
    pub async fn cmd_import(&self, path: &str) -> Result<()> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path))?;
        let items: Vec<Item> =
            serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path))?;
        if let Some(id) = duplicate_identifier(&items) {
            bail!("{} lists '{}' more than once; identifiers must be unique", path, id);
        }

        let mut session = self.open_session().await?;
        let mods = items.iter().filter(|i| !i.is_separator()).count();
        let separators = items.len() - mods;
        session.replace_items(items);
        let profile = session.profile_id().to_string();
        session.close().await?;

        println!(
            "Imported {} mods and {} separators into profile '{}'.",
            mods, separators, profile
        );
        Ok(())
    }

    pub async fn cmd_list(
        &self,
        search: Option<&str>,
        filter: Option<&str>,
        sort: Option<&str>,
    ) -> Result<()> {
        let filter = filter.map(ActivationFilter::from_cli).transpose()?;
        let sort = sort.map(SortBy::from_cli).transpose()?;

        let mut session = self.open_session().await?;
        if let Some(text) = search {
            session.set_search_text(text);
        }
        if let Some(filter) = filter {
            session.set_activation_filter(filter);
        }
        if let Some(sort) = sort {
            session.set_sort_by(sort);
        }

        let rows = session.view();
        if rows.is_empty() {
            println!("No mods to show in profile '{}'.", session.profile_id());
            return session.close().await;
        }

        let indices = session.item_indices();
        println!(
            "Mods in profile '{}' (sorted by {}):",
            session.profile_id(),
            session.settings().sort_by.as_str()
        );
        println!("{:-<60}", "");
        for item in &rows {
            match item {
                Item::Separator(s) => {
                    let marker = if is_collapsed(session.separators(), &s.identifier) {
                        "+"
                    } else {
                        "-"
                    };
                    println!(
                        "     [{}] {} ({} mods)",
                        marker,
                        s.title,
                        child_mods(session.items(), &s.identifier).len()
                    );
                }
                Item::Mod(m) => {
                    let status = if session.is_active(&m.identifier) == Some(true) {
                        "[x]"
                    } else {
                        "[ ]"
                    };
                    let mut line = format!(
                        "{:>3}. {} {} ({})",
                        indices.get(&m.identifier).map_or(0, |i| i + 1),
                        status,
                        m.title,
                        m.identifier
                    );
                    if let Some(category) = category_of(session.meta(), &m.identifier) {
                        line.push_str(&format!(" [{}]", category));
                    }
                    if let Some(version) = session.version_label(&m.identifier) {
                        line.push_str(&format!(" {}", version));
                    }
                    println!("{}", line);
                }
            }
        }
        println!("{:-<60}", "");
        let shown = rows.iter().filter(|i| !i.is_separator()).count();
        println!("{} of {} mods shown", shown, session.total_mods());

        session.close().await
    }

    // ========== Activation Commands ==========

    pub async fn cmd_toggle(
        &self,
        mod_id: &str,
        off: bool,
        yes: bool,
        ask: bool,
        only: bool,
    ) -> Result<()> {
        let mut session = self.open_session().await?;
        if find_mod(session.items(), mod_id).is_none() {
            let profile = session.profile_id().to_string();
            session.close().await?;
            bail!("Mod '{}' not found in profile '{}'", mod_id, profile);
        }

        let desired = !off;
        let confirm = if yes {
            Some(false)
        } else if ask || only {
            Some(true)
        } else {
            None
        };
        let before = session.activations().to_vec();

        match session.request_activation(mod_id, desired, confirm) {
            ActivationOutcome::Applied(_) => {}
            ActivationOutcome::PendingConfirmation(_) if only => {
                session.resolve_pending(Decision::TargetOnly);
            }
            ActivationOutcome::PendingConfirmation(pending) => {
                let action = match pending.reason {
                    ConfirmationReason::Dependents(_) => "deactivate",
                    ConfirmationReason::MissingDependencies(_) => "activate",
                };
                println!("Toggling '{}' would also {}:", mod_id, action);
                for id in pending.reason.mod_ids() {
                    let title = find_mod(session.items(), id).map_or(id.as_str(), |m| m.title.as_str());
                    println!("  - {} ({})", title, id);
                }
                println!(
                    "Re-run with --yes to apply all, or --only to toggle just '{}'.",
                    mod_id
                );
                return session.close().await;
            }
        }

        let changed = session
            .activations()
            .iter()
            .zip(&before)
            .filter(|(now, was)| now.is_active != was.is_active)
            .count();
        println!(
            "{} '{}' ({} mod(s) changed).",
            if desired { "Activated" } else { "Deactivated" },
            mod_id,
            changed
        );
        session.close().await
    }

    pub async fn cmd_group(&self, separator_id: &str) -> Result<()> {
        let mut session = self.open_session().await?;
        if !session.toggle_group(separator_id) {
            session.close().await?;
            bail!("'{}' is not a separator with mods under it", separator_id);
        }

        let children = child_mods(session.items(), separator_id);
        let active = children
            .iter()
            .filter(|m| session.is_active(&m.identifier) == Some(true))
            .count();
        println!(
            "Group '{}': {} of {} mods active.",
            separator_id,
            active,
            children.len()
        );
        session.close().await
    }

    // ========== Ordering Commands ==========

    pub async fn cmd_move(&self, active: &str, over: &str, select: &[String]) -> Result<()> {
        let mut session = self.open_session().await?;
        let sort_by = session.settings().sort_by;
        if !sort_by.is_load_order() {
            session.close().await?;
            bail!(
                "Items can only be moved in load order (currently sorted by {}). Run 'modkeeper config set sort_by load_order' first.",
                sort_by.as_str()
            );
        }

        if !select.is_empty() && !select.iter().any(|id| id == active) {
            session.toggle_row(active, true);
        }
        for id in select {
            session.toggle_row(id, true);
        }
        let dragged = session.drag_group_size(active);

        match session.move_item(active, Some(over)) {
            Some(moved) => {
                let label = match moved.kind {
                    MoveKind::Single => "item",
                    MoveKind::Group => "selection",
                    MoveKind::CollapsedSection => "collapsed section",
                };
                let position = session.item_indices().get(active).map_or(0, |i| i + 1);
                println!(
                    "Moved {} '{}' to position {} ({} mod(s) reordered).",
                    label, active, position, moved.reordered
                );
                if moved.kind == MoveKind::Group && dragged > 1 {
                    println!("  +{} more moved with it", dragged - 1);
                }
            }
            None => println!("Nothing moved."),
        }
        session.close().await
    }

    pub async fn cmd_collapse(&self, separator_id: &str) -> Result<()> {
        let mut session = self.open_session().await?;
        let Some(collapsed) = session.toggle_collapsed(separator_id) else {
            session.close().await?;
            bail!("'{}' is not a separator", separator_id);
        };

        println!(
            "Separator '{}' {}.",
            separator_id,
            if collapsed { "collapsed" } else { "expanded" }
        );
        session.close().await
    }

    pub async fn cmd_separator_add(&self, title: &str, at: Option<usize>) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            bail!("Separator title cannot be empty");
        }

        let mut session = self.open_session().await?;
        let identifier = session.add_separator(title, at);
        let position = session.item_indices().get(&identifier).map_or(0, |i| i + 1);
        println!("Added separator '{}' ({}) at position {}.", title, identifier, position);
        session.close().await
    }

    pub async fn cmd_remove(&self, identifier: &str) -> Result<()> {
        let mut session = self.open_session().await?;
        let Some(removed) = session.remove_item(identifier) else {
            session.close().await?;
            bail!("'{}' not found in profile '{}'", identifier, self.profile_id().await);
        };
        session.close().await?;

        match removed {
            Item::Separator(s) => println!("Removed separator '{}'.", s.title),
            Item::Mod(m) => {
                println!("Removed '{}' from the profile.", m.title);
                match m.item_type.removal_kind() {
                    RemovalKind::Unsubscribe => {
                        println!("Unsubscribe from workshop item {} to uninstall it.", m.identifier)
                    }
                    RemovalKind::Delete => match &m.pack_file_path {
                        Some(path) => println!("Delete {} to uninstall it.", path),
                        None => println!("Delete its pack file to uninstall it."),
                    },
                }
            }
        }
        Ok(())
    }

    pub async fn cmd_category(&self, mod_id: &str, category: Option<&str>) -> Result<()> {
        let mut session = self.open_session().await?;
        if !session.set_category(mod_id, category.map(str::to_string)) {
            session.close().await?;
            bail!("Mod '{}' not found", mod_id);
        }

        match category_of(session.meta(), mod_id) {
            Some(category) => println!("'{}' is now in category '{}'.", mod_id, category),
            None => println!("Cleared the category of '{}'.", mod_id),
        }
        session.close().await
    }

    // ========== Profile and Config Commands ==========

    pub async fn cmd_profiles(&self) -> Result<()> {
        let profiles = self.db.list_profiles()?;
        if profiles.is_empty() {
            println!("No profiles yet. Run 'modkeeper import <file>' to create one.");
            return Ok(());
        }

        let current = self.profile_id().await;
        println!("Profiles:");
        for profile in profiles {
            let marker = if profile == current { "*" } else { " " };
            println!(" {} {}", marker, profile);
        }
        Ok(())
    }

    pub async fn cmd_config_show(&self) -> Result<()> {
        let config = self.config.read().await;
        let content = toml::to_string_pretty(&*config).context("Failed to serialize config")?;
        println!("# {}", config.paths.config_file().display());
        println!("{}", content);
        Ok(())
    }

    pub async fn cmd_config_set(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.config.write().await;
        config.set_value(key, value)?;
        config.save().await?;
        println!("Set {} = {}", key, value);
        Ok(())
    }

    pub async fn cmd_status(&self) -> Result<()> {
        let session = self.open_session().await?;
        let active = session.activations().iter().filter(|r| r.is_active).count();
        let separators = session.items().len() - session.total_mods();
        let collapsed = session.separators().iter().filter(|s| s.collapsed).count();
        let settings = session.settings().clone();
        let last_saved = self.db.last_saved(session.profile_id())?;

        println!("ModKeeper Status");
        println!("{:-<40}", "");
        println!("Profile:      {}", session.profile_id());
        println!("Mods:         {} total, {} active", session.total_mods(), active);
        println!("Separators:   {} ({} collapsed)", separators, collapsed);
        println!("Sort:         {}", settings.sort_by.as_str());
        println!(
            "Confirmation: {}",
            if settings.dependency_confirmation { "on" } else { "off" }
        );
        println!(
            "Last saved:   {}",
            last_saved.as_deref().unwrap_or("never")
        );

        session.close().await
    }
}
