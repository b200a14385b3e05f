use serde_json::Value;

use super::options::ImportOptions;
use super::references::{references, Reference};
use super::result::{OrchestratorResult, RunMeta, Stage};
use super::veto::veto_reason;
use crate::characteristic::CharacteristicResolver;
use crate::collect::{Collector, Filters, Page};
use crate::convert::{lookup, value_as_i64, value_as_id, ConversionContext, ConversionEngine, ConvertedRecord};
use crate::entity::EntityKind;
use crate::error::{ImportError, ImportResult};
use crate::relations::{ActionType, DependencyStack, PendingImport};
use crate::rules::RuleLoader;
use crate::store::schema::object_kind_for_type;
use crate::store::{IntegrationResult, LocalRef, Store};
use crate::validate::{validate, ValidationIssue};

/// Collected, converted and validated record, not yet integrated
struct Prepared {
    raw: Value,
    converted: Option<ConvertedRecord>,
    validation_errors: Vec<ValidationIssue>,
}

/// Drives records through collect → convert → validate → integrate →
/// relations, pulling in referenced records on demand.
pub struct Orchestrator<'a> {
    collector: &'a dyn Collector,
    rules: &'a dyn RuleLoader,
    store: &'a mut dyn Store,
    resolver: &'a CharacteristicResolver,
    engine: ConversionEngine,
}

fn advance(stage: &mut Option<Stage>, next: Stage, kind: EntityKind, external_id: &str) {
    *stage = Some(next);
    tracing::info!(%kind, external_id, stage = %next, "stage reached");
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        collector: &'a dyn Collector,
        rules: &'a dyn RuleLoader,
        store: &'a mut dyn Store,
        resolver: &'a CharacteristicResolver,
    ) -> Self {
        Self {
            collector,
            rules,
            store,
            resolver,
            engine: ConversionEngine::default(),
        }
    }

    pub fn with_engine(self, engine: ConversionEngine) -> Self {
        Self { engine, ..self }
    }

    /// Import one record, then every record it references
    pub fn run_one(
        &mut self,
        source: &str,
        kind: EntityKind,
        external_id: &str,
        options: &ImportOptions,
    ) -> OrchestratorResult {
        tracing::info!(%kind, external_id, source, "import started");
        let mut stack = DependencyStack::new();
        stack.mark_processed(kind, external_id);
        let mut stage = None;

        match self.import_one(source, kind, external_id, options, &mut stack, &mut stage) {
            Ok(mut result) => {
                result.meta.stage = stage;
                result.meta.collected = 1;
                result.meta.orphaned_relations = report_orphans(&stack);
                tracing::info!(%kind, external_id, message = %result.message, "import finished");
                result
            }
            Err(err) => {
                tracing::warn!(%kind, external_id, "import failed: {}", err);
                OrchestratorResult::failure(&err, stage)
            }
        }
    }

    /// Import one page of records. Nothing is integrated when any record
    /// fails validation.
    pub fn run_many(
        &mut self,
        source: &str,
        kind: EntityKind,
        filters: &Filters,
        page: Page,
        options: &ImportOptions,
    ) -> OrchestratorResult {
        tracing::info!(%kind, source, limit = page.limit, offset = page.offset, "batch import started");
        let mut stage = None;
        match self.import_many(source, kind, filters, page, options, &mut stage) {
            Ok(result) => {
                tracing::info!(%kind, message = %result.message, "batch import finished");
                result
            }
            Err(err) => {
                tracing::warn!(%kind, "batch import failed: {}", err);
                OrchestratorResult::failure(&err, stage)
            }
        }
    }

    fn import_one(
        &mut self,
        source: &str,
        kind: EntityKind,
        external_id: &str,
        options: &ImportOptions,
        stack: &mut DependencyStack,
        stage: &mut Option<Stage>,
    ) -> ImportResult<OrchestratorResult> {
        let prepared = self.prepare(source, kind, external_id, None, options, stage)?;
        let mut result = OrchestratorResult {
            success: true,
            raw: Some(prepared.raw),
            validation_errors: prepared.validation_errors,
            ..Default::default()
        };

        let converted = match prepared.converted {
            Some(converted) if options.integrate => converted,
            converted => {
                result.message = format!("{} {} {}", kind, external_id, stage.unwrap_or(Stage::Collected));
                result.converted = converted;
                return Ok(result);
            }
        };

        let integration = self.integrate(kind, external_id, &converted, options, stage)?;
        if options.include_relations {
            self.register_relations(source, kind, &converted, &integration, stack)?;
            result.meta.imported_dependencies = self.drain(options, stack);
            advance(stage, Stage::RelationsResolved, kind, external_id);
        }

        result.message = integration.message.clone();
        result.converted = Some(converted);
        result.integration = Some(integration);
        Ok(result)
    }

    fn import_many(
        &mut self,
        source: &str,
        kind: EntityKind,
        filters: &Filters,
        page: Page,
        options: &ImportOptions,
        stage: &mut Option<Stage>,
    ) -> ImportResult<OrchestratorResult> {
        let collected = self
            .collector
            .fetch_many(source, kind, filters, page)
            .map_err(ImportError::Collect)?;
        *stage = Some(Stage::Collected);
        let mut meta = RunMeta {
            stage: *stage,
            collected: collected.meta.collected,
            total: collected.meta.total,
            ..Default::default()
        };

        if !options.wants_processing() {
            return Ok(OrchestratorResult {
                success: true,
                message: format!("collected {} (total {} reported by source)", meta.collected, meta.total),
                raw: Some(Value::Array(collected.items)),
                meta,
                ..Default::default()
            });
        }

        let mut stack = DependencyStack::new();
        let mut prepared_items = Vec::new();
        let mut errors = Vec::new();
        for raw in collected.items {
            let Some(external_id) = lookup(&raw, "id").and_then(value_as_id) else {
                tracing::warn!(%kind, "collected record without id skipped");
                continue;
            };
            stack.mark_processed(kind, &external_id);

            let mut item_stage = None;
            match self.prepare(source, kind, &external_id, Some(raw), options, &mut item_stage) {
                Ok(prepared) => prepared_items.push((external_id, prepared)),
                Err(ImportError::ValidationFailed(issues)) => {
                    errors.extend(issues.iter().map(|issue| issue.prefixed(&external_id)));
                }
                Err(err) => tracing::warn!(%kind, external_id = %external_id, "record skipped: {}", err),
            }
        }

        if !errors.is_empty() {
            return Ok(OrchestratorResult {
                success: false,
                message: format!("validation failed with {} error(s), nothing integrated", errors.len()),
                validation_errors: errors,
                meta,
                ..Default::default()
            });
        }
        let validation_errors: Vec<ValidationIssue> = prepared_items
            .iter()
            .flat_map(|(external_id, prepared)| {
                prepared
                    .validation_errors
                    .iter()
                    .map(move |issue| issue.prefixed(external_id))
            })
            .collect();

        if !options.integrate {
            *stage = Some(if options.validate { Stage::Validated } else { Stage::Converted });
            meta.stage = *stage;
            return Ok(OrchestratorResult {
                success: true,
                message: format!("converted {} of {} collected", prepared_items.len(), meta.collected),
                validation_errors,
                meta,
                ..Default::default()
            });
        }

        let mut integrated = Vec::new();
        for (external_id, prepared) in &prepared_items {
            let Some(converted) = &prepared.converted else {
                continue;
            };
            let mut item_stage = None;
            match self.integrate(kind, external_id, converted, options, &mut item_stage) {
                Ok(integration) => integrated.push((converted, integration)),
                Err(err) => tracing::warn!(%kind, external_id = %external_id, "integration failed: {}", err),
            }
        }
        *stage = Some(Stage::Integrated);

        if options.include_relations {
            for (converted, integration) in &integrated {
                if let Err(err) = self.register_relations(source, kind, converted, integration, &mut stack) {
                    tracing::warn!(%kind, "relations not registered: {}", err);
                }
            }
            meta.imported_dependencies = self.drain(options, &mut stack);
            *stage = Some(Stage::RelationsResolved);
        }

        meta.stage = *stage;
        meta.orphaned_relations = report_orphans(&stack);
        Ok(OrchestratorResult {
            success: true,
            message: format!(
                "imported {} of {} collected (total {} reported by source)",
                integrated.len(),
                meta.collected,
                meta.total
            ),
            validation_errors,
            meta,
            ..Default::default()
        })
    }

    /// Collect, veto, enrich, convert and validate one record
    fn prepare(
        &mut self,
        source: &str,
        kind: EntityKind,
        external_id: &str,
        raw: Option<Value>,
        options: &ImportOptions,
        stage: &mut Option<Stage>,
    ) -> ImportResult<Prepared> {
        let raw = match raw {
            Some(raw) => raw,
            None => self
                .collector
                .fetch_one(source, kind, external_id)
                .map_err(ImportError::Collect)?
                .ok_or_else(|| ImportError::NothingCollected {
                    kind,
                    external_id: external_id.to_string(),
                })?,
        };
        advance(stage, Stage::Collected, kind, external_id);

        let rules = self
            .rules
            .load_entity_rules(source, kind)
            .map_err(|source| ImportError::Rules { kind, source })?;
        if let Some(reason) = veto_reason(kind, &rules, &raw) {
            return Err(ImportError::Vetoed {
                kind,
                external_id: external_id.to_string(),
                reason: reason.to_string(),
            });
        }

        if !options.wants_processing() {
            return Ok(Prepared {
                raw,
                converted: None,
                validation_errors: Vec::new(),
            });
        }

        let enriched = self.enrich(source, kind, external_id, &raw);
        let ctx = ConversionContext::new(kind, self.resolver).with_lang(&options.lang);
        let converted = self.engine.convert(&rules, enriched.as_ref().unwrap_or(&raw), &ctx);
        advance(stage, Stage::Converted, kind, external_id);

        let mut validation_errors = Vec::new();
        if options.validate {
            let report = validate(&converted, kind, self.resolver);
            if !report.is_valid {
                if !(options.integrate && options.store.ignore_unvalidated) {
                    return Err(ImportError::ValidationFailed(report.errors));
                }
                tracing::warn!(%kind, external_id, errors = report.errors.len(), "integrating despite validation errors");
                validation_errors = report.errors;
            }
            advance(stage, Stage::Validated, kind, external_id);
        }

        Ok(Prepared {
            raw,
            converted: Some(converted),
            validation_errors,
        })
    }

    /// Attach the crafting recipe to objects that do not carry one
    fn enrich(&self, source: &str, kind: EntityKind, external_id: &str, raw: &Value) -> Option<Value> {
        let wants_recipe = matches!(
            kind,
            EntityKind::Item | EntityKind::Resource | EntityKind::Consumable
        ) && raw.is_object()
            && raw.get("recipe").is_none();
        if !wants_recipe {
            return None;
        }

        match self.collector.fetch_secondary(source, external_id) {
            Ok(Some(recipe)) => {
                let mut enriched = raw.clone();
                if let Some(map) = enriched.as_object_mut() {
                    map.insert("recipe".to_string(), recipe);
                }
                tracing::debug!(%kind, external_id, "recipe attached");
                Some(enriched)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%kind, external_id, "recipe lookup failed: {:#}", err);
                None
            }
        }
    }

    fn integrate(
        &mut self,
        kind: EntityKind,
        external_id: &str,
        converted: &ConvertedRecord,
        options: &ImportOptions,
        stage: &mut Option<Stage>,
    ) -> ImportResult<IntegrationResult> {
        let integration = self
            .store
            .integrate(kind, converted, &options.store)
            .map_err(ImportError::Store)?;
        if !integration.success {
            return Err(ImportError::IntegrationFailed(integration.message));
        }
        advance(stage, Stage::Integrated, kind, external_id);
        Ok(integration)
    }

    /// Wire or defer every cross reference carried by the record. Without a
    /// stored owner (dry run) only the missing targets are queued.
    fn register_relations(
        &mut self,
        source: &str,
        kind: EntityKind,
        converted: &ConvertedRecord,
        integration: &IntegrationResult,
        stack: &mut DependencyStack,
    ) -> ImportResult<()> {
        let Some(relations) = converted.relations() else {
            return Ok(());
        };
        let owner = integration.primary_id.map(|id| LocalRef {
            table: integration.data.table.clone(),
            id,
        });

        for reference in references(kind, relations) {
            let Some(owner) = &owner else {
                let local = self
                    .store
                    .find_local(reference.target_kind(), &reference.external_id)
                    .map_err(ImportError::Store)?;
                if local.is_none() {
                    stack.push_pending(source, reference.target_kind(), &reference.external_id);
                }
                continue;
            };
            self.link(source, owner, &reference, stack)
                .map_err(ImportError::Store)?;
        }
        Ok(())
    }

    fn link(
        &mut self,
        source: &str,
        owner: &LocalRef,
        reference: &Reference,
        stack: &mut DependencyStack,
    ) -> anyhow::Result<()> {
        let store = &mut *self.store;
        let id = reference.external_id.as_str();
        let outcome = match reference.action_type {
            ActionType::Recipe => stack.link_recipe_ingredient(store, source, owner, id, reference.quantity)?,
            ActionType::BreedSpell => stack.link_class_spell(store, source, owner, id)?,
            ActionType::CreatureSpell => stack.link_creature_spell(store, source, owner, id)?,
            ActionType::CreatureResource => stack.link_creature_drop(store, source, owner, id)?,
            ActionType::SpellInvocation => stack.link_spell_invocation(store, source, owner, id)?,
        };
        tracing::debug!(action = %reference.action_type, target = id, ?outcome, "reference handled");
        Ok(())
    }

    /// Import queued references until none are left. Returns how many were
    /// imported.
    fn drain(&mut self, options: &ImportOptions, stack: &mut DependencyStack) -> usize {
        let options = options.for_dependency();
        let mut imported = 0;

        while let Some(pending) = stack.pop_pending() {
            match self.import_dependency(&pending, &options, stack) {
                Ok(integration) => {
                    imported += 1;
                    let fired = stack.on_imported(
                        pending.kind,
                        &pending.external_id,
                        integration.primary_id,
                        &integration.data.table,
                        options.store.dry_run,
                        &mut *self.store,
                    );
                    match fired {
                        Ok(applied) => tracing::debug!(key = %pending.key(), applied, "dependent relations applied"),
                        Err(err) => tracing::warn!(key = %pending.key(), "dependent relations failed: {:#}", err),
                    }
                }
                Err(err) => {
                    let dropped = stack.drop_dependents(pending.kind, &pending.external_id);
                    tracing::warn!(key = %pending.key(), dropped, "dependency import failed: {}", err);
                }
            }
        }
        imported
    }

    fn import_dependency(
        &mut self,
        pending: &PendingImport,
        options: &ImportOptions,
        stack: &mut DependencyStack,
    ) -> ImportResult<IntegrationResult> {
        let mut stage = None;
        let raw = self
            .collector
            .fetch_one(&pending.source, pending.kind, &pending.external_id)
            .map_err(ImportError::Collect)?
            .ok_or_else(|| ImportError::NothingCollected {
                kind: pending.kind,
                external_id: pending.external_id.clone(),
            })?;
        let kind = dependency_kind(pending.kind, &raw);
        if kind != pending.kind {
            tracing::debug!(key = %pending.key(), %kind, "object reference reclassified from its typeId");
        }

        let prepared = self.prepare(
            &pending.source,
            kind,
            &pending.external_id,
            Some(raw),
            options,
            &mut stage,
        )?;
        let converted = prepared
            .converted
            .ok_or_else(|| ImportError::IntegrationFailed(format!("{} was not converted", pending.key())))?;
        let integration = self.integrate(kind, &pending.external_id, &converted, options, &mut stage)?;
        if options.include_relations {
            self.register_relations(&pending.source, kind, &converted, &integration, stack)?;
        }
        Ok(integration)
    }
}

/// Object references are queued as resources; the fetched record's `typeId`
/// decides which object kind converts it
fn dependency_kind(queued: EntityKind, raw: &Value) -> EntityKind {
    if !queued.is_object() || queued == EntityKind::Panoply {
        return queued;
    }
    raw.get("typeId")
        .and_then(value_as_i64)
        .map_or(queued, object_kind_for_type)
}

/// Log and count the relations that never fired
fn report_orphans(stack: &DependencyStack) -> usize {
    let orphans = stack.orphaned();
    for action in &orphans {
        tracing::warn!(
            target_key = %action.target_key,
            action = %action.action_type,
            owner_table = %action.payload.owner_table,
            owner_id = action.payload.owner_id,
            "relation never resolved"
        );
    }
    orphans.len()
}
