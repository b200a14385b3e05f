use anyhow::Result;
use std::collections::{HashMap, HashSet, VecDeque};

use super::action::{pending_key, ActionPayload, ActionType, DependentAction, PendingImport};
use crate::entity::EntityKind;
use crate::store::{merge_link, LocalRef, RelationLink, RelationOwner, Store};

/// Result of a linking helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Target already local, relation written
    Linked,
    /// Target missing, relation deferred until it is imported
    Deferred { queued: bool },
    /// Owner row no longer exists, nothing written
    OwnerGone,
}

/// Queue of records to import on demand, plus the relations waiting on them.
///
/// One instance lives for one top-level run. Every key is enqueued at most
/// once, so reference cycles terminate; actions registered under a key that
/// can no longer be imported stay behind and are reported by [`orphaned`].
///
/// [`orphaned`]: DependencyStack::orphaned
#[derive(Debug, Default)]
pub struct DependencyStack {
    queue: VecDeque<PendingImport>,
    processed: HashSet<String>,
    dependents: HashMap<String, Vec<DependentAction>>,
}

impl DependencyStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a record unless its key was already seen in this run
    pub fn push_pending(&mut self, source: &str, kind: EntityKind, external_id: &str) -> bool {
        let key = pending_key(kind, external_id);
        if !self.processed.insert(key) {
            return false;
        }
        self.queue.push_back(PendingImport {
            source: source.to_string(),
            kind,
            external_id: external_id.to_string(),
        });
        true
    }

    /// Mark a top-level record so references back to it are not re-imported
    pub fn mark_processed(&mut self, kind: EntityKind, external_id: &str) {
        self.processed.insert(pending_key(kind, external_id));
    }

    pub fn register_dependent(
        &mut self,
        kind: EntityKind,
        external_id: &str,
        action_type: ActionType,
        payload: ActionPayload,
    ) {
        let target_key = pending_key(kind, external_id);
        self.dependents
            .entry(target_key.clone())
            .or_default()
            .push(DependentAction {
                target_key,
                action_type,
                payload,
            });
    }

    pub fn pop_pending(&mut self) -> Option<PendingImport> {
        self.queue.pop_front()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn link_recipe_ingredient(
        &mut self,
        store: &mut dyn Store,
        source: &str,
        owner: &LocalRef,
        ingredient_id: &str,
        quantity: u32,
    ) -> Result<LinkOutcome> {
        self.link(store, source, owner, ActionType::Recipe, ingredient_id, Some(quantity.max(1)), None)
    }

    pub fn link_class_spell(
        &mut self,
        store: &mut dyn Store,
        source: &str,
        owner: &LocalRef,
        spell_id: &str,
    ) -> Result<LinkOutcome> {
        self.link(store, source, owner, ActionType::BreedSpell, spell_id, None, None)
    }

    pub fn link_creature_spell(
        &mut self,
        store: &mut dyn Store,
        source: &str,
        owner: &LocalRef,
        spell_id: &str,
    ) -> Result<LinkOutcome> {
        self.link(store, source, owner, ActionType::CreatureSpell, spell_id, None, None)
    }

    pub fn link_creature_drop(
        &mut self,
        store: &mut dyn Store,
        source: &str,
        owner: &LocalRef,
        resource_id: &str,
    ) -> Result<LinkOutcome> {
        self.link(store, source, owner, ActionType::CreatureResource, resource_id, None, None)
    }

    pub fn link_spell_invocation(
        &mut self,
        store: &mut dyn Store,
        source: &str,
        owner: &LocalRef,
        monster_id: &str,
    ) -> Result<LinkOutcome> {
        self.link(
            store,
            source,
            owner,
            ActionType::SpellInvocation,
            monster_id,
            None,
            Some("invocation".to_string()),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn link(
        &mut self,
        store: &mut dyn Store,
        source: &str,
        owner: &LocalRef,
        action_type: ActionType,
        target_id: &str,
        quantity: Option<u32>,
        role: Option<String>,
    ) -> Result<LinkOutcome> {
        let kind = action_type.target_kind();
        let payload = ActionPayload {
            owner_table: owner.table.clone(),
            owner_id: owner.id,
            quantity,
            role,
        };

        match store.find_local(kind, target_id)? {
            Some(target) => {
                let applied = apply_action(store, action_type, &payload, &target)?;
                Ok(if applied {
                    LinkOutcome::Linked
                } else {
                    LinkOutcome::OwnerGone
                })
            }
            None => {
                self.register_dependent(kind, target_id, action_type, payload);
                let queued = self.push_pending(source, kind, target_id);
                tracing::debug!(%kind, target_id, action = %action_type, queued, "relation deferred");
                Ok(LinkOutcome::Deferred { queued })
            }
        }
    }

    /// Fire the actions waiting on a record that just finished importing.
    /// A dry run discards them. Returns how many were applied.
    pub fn on_imported(
        &mut self,
        kind: EntityKind,
        external_id: &str,
        new_primary_id: Option<i64>,
        target_table: &str,
        dry_run: bool,
        store: &mut dyn Store,
    ) -> Result<usize> {
        let Some(actions) = self.dependents.remove(&pending_key(kind, external_id)) else {
            return Ok(0);
        };
        let target = match (dry_run, new_primary_id) {
            (false, Some(id)) => LocalRef {
                table: target_table.to_string(),
                id,
            },
            _ => return Ok(0),
        };

        let mut applied = 0;
        for action in &actions {
            if apply_action(store, action.action_type, &action.payload, &target)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Drop the actions waiting on a record whose import failed
    pub fn drop_dependents(&mut self, kind: EntityKind, external_id: &str) -> usize {
        self.dependents
            .remove(&pending_key(kind, external_id))
            .map_or(0, |actions| actions.len())
    }

    /// Actions that can never fire: their target was not imported in this run
    pub fn orphaned(&self) -> Vec<&DependentAction> {
        let mut orphans: Vec<&DependentAction> = self.dependents.values().flatten().collect();
        orphans.sort_by(|a, b| a.target_key.cmp(&b.target_key));
        orphans
    }
}

/// Merge the target into the owner's relation set. `false` when the owner
/// row is gone.
fn apply_action(
    store: &mut dyn Store,
    action_type: ActionType,
    payload: &ActionPayload,
    target: &LocalRef,
) -> Result<bool> {
    let owner = RelationOwner {
        table: payload.owner_table.clone(),
        id: payload.owner_id,
        relation: action_type.as_str().to_string(),
    };
    let Some(mut links) = store.load_relation(&owner)? else {
        tracing::warn!(
            owner_table = %owner.table,
            owner_id = owner.id,
            action = %action_type,
            "relation owner no longer exists, action skipped"
        );
        return Ok(false);
    };

    merge_link(
        &mut links,
        RelationLink {
            target_table: target.table.clone(),
            target_id: target.id,
            quantity: payload.quantity,
            role: payload.role.clone(),
        },
    );
    store.save_relation(&owner, &links)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConvertedRecord;
    use crate::store::{SqliteStore, StoreOptions};
    use serde_json::json;

    fn store_with(kind: EntityKind, converted: serde_json::Value) -> (SqliteStore, LocalRef) {
        let mut store = SqliteStore::in_memory().unwrap();
        let converted: ConvertedRecord = serde_json::from_value(converted).unwrap();
        let result = store.integrate(kind, &converted, &StoreOptions::default()).unwrap();
        let owner = LocalRef {
            table: result.data.table,
            id: result.primary_id.unwrap(),
        };
        (store, owner)
    }

    fn owner_relation(owner: &LocalRef, action: ActionType) -> RelationOwner {
        RelationOwner {
            table: owner.table.clone(),
            id: owner.id,
            relation: action.as_str().to_string(),
        }
    }

    #[test]
    fn test_push_is_deduplicated_and_fifo() {
        let mut stack = DependencyStack::new();
        stack.mark_processed(EntityKind::Spell, "1");
        assert!(!stack.push_pending("dofusdb", EntityKind::Spell, "1"));
        assert!(stack.push_pending("dofusdb", EntityKind::Spell, "2"));
        assert!(stack.push_pending("dofusdb", EntityKind::Monster, "2"));
        assert!(!stack.push_pending("dofusdb", EntityKind::Spell, "2"));

        assert_eq!(stack.pop_pending().unwrap().key(), "spell:2");
        assert_eq!(stack.pop_pending().unwrap().key(), "monster:2");
        assert!(stack.pop_pending().is_none());
    }

    #[test]
    fn test_missing_target_is_deferred_then_fired() {
        let (mut store, owner) = store_with(
            EntityKind::Item,
            json!({"items": {"dofusdb_id": "100", "type_id": 1}}),
        );
        let mut stack = DependencyStack::new();

        let outcome = stack
            .link_recipe_ingredient(&mut store, "dofusdb", &owner, "287", 3)
            .unwrap();
        assert_eq!(outcome, LinkOutcome::Deferred { queued: true });
        let pending = stack.pop_pending().unwrap();
        assert_eq!(pending.key(), "resource:287");

        let converted: ConvertedRecord =
            serde_json::from_value(json!({"items": {"dofusdb_id": "287", "type_id": 15}})).unwrap();
        let resource = store
            .integrate(EntityKind::Resource, &converted, &StoreOptions::default())
            .unwrap();
        let applied = stack
            .on_imported(
                EntityKind::Resource,
                "287",
                resource.primary_id,
                &resource.data.table,
                false,
                &mut store,
            )
            .unwrap();
        assert_eq!(applied, 1);
        assert!(stack.orphaned().is_empty());

        let links = store.load_relation(&owner_relation(&owner, ActionType::Recipe)).unwrap().unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_table, "resources");
        assert_eq!(links[0].quantity, Some(3));
    }

    #[test]
    fn test_local_target_links_immediately() {
        let (mut store, owner) = store_with(
            EntityKind::Spell,
            json!({"spells": {"dofusdb_id": "201"}}),
        );
        let converted: ConvertedRecord =
            serde_json::from_value(json!({"creatures": {"name": "Tofu"}, "monsters": {"dofusdb_id": "5"}}))
                .unwrap();
        store.integrate(EntityKind::Monster, &converted, &StoreOptions::default()).unwrap();

        let mut stack = DependencyStack::new();
        let outcome = stack
            .link_spell_invocation(&mut store, "dofusdb", &owner, "5")
            .unwrap();
        assert_eq!(outcome, LinkOutcome::Linked);
        assert_eq!(stack.pending_len(), 0);

        let links = store
            .load_relation(&owner_relation(&owner, ActionType::SpellInvocation))
            .unwrap()
            .unwrap();
        assert_eq!(links[0].role.as_deref(), Some("invocation"));
    }

    #[test]
    fn test_dry_run_discards_and_owner_gone_is_skipped() {
        let (mut store, owner) = store_with(
            EntityKind::Class,
            json!({"creatures": {"name": "Iop"}, "classes": {"dofusdb_id": "8"}}),
        );
        let mut stack = DependencyStack::new();
        let spells = owner_relation(&owner, ActionType::BreedSpell);
        stack.link_class_spell(&mut store, "dofusdb", &owner, "1").unwrap();
        let before = store.load_relation(&spells).unwrap();
        assert_eq!(before, Some(Vec::new()));
        assert_eq!(
            stack
                .on_imported(EntityKind::Spell, "1", Some(10), "spells", true, &mut store)
                .unwrap(),
            0
        );
        // the dependents list is cleared even though nothing was written
        assert!(stack.orphaned().is_empty());
        assert_eq!(store.load_relation(&spells).unwrap(), before);
        assert_eq!(
            stack
                .on_imported(EntityKind::Spell, "1", Some(10), "spells", false, &mut store)
                .unwrap(),
            0
        );
        assert_eq!(store.load_relation(&spells).unwrap(), before);

        let gone = LocalRef {
            table: "classes".to_string(),
            id: 999,
        };
        stack.link_class_spell(&mut store, "dofusdb", &gone, "2").unwrap();
        let converted: ConvertedRecord =
            serde_json::from_value(json!({"spells": {"dofusdb_id": "2"}})).unwrap();
        let spell = store.integrate(EntityKind::Spell, &converted, &StoreOptions::default()).unwrap();
        let applied = stack
            .on_imported(EntityKind::Spell, "2", spell.primary_id, "spells", false, &mut store)
            .unwrap();
        assert_eq!(applied, 0);
    }

    #[test]
    fn test_back_edge_is_orphaned() {
        let (mut store, owner) = store_with(
            EntityKind::Spell,
            json!({"spells": {"dofusdb_id": "201"}}),
        );
        let mut stack = DependencyStack::new();
        stack.mark_processed(EntityKind::Monster, "7");

        // the monster being imported at top level is not stored yet
        let outcome = stack
            .link_spell_invocation(&mut store, "dofusdb", &owner, "7")
            .unwrap();
        assert_eq!(outcome, LinkOutcome::Deferred { queued: false });
        assert!(stack.pop_pending().is_none());

        let orphans = stack.orphaned();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].target_key, "monster:7");
        assert_eq!(stack.drop_dependents(EntityKind::Monster, "7"), 1);
        assert!(stack.orphaned().is_empty());
    }
}
