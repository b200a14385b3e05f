use serde_json::Value;

use crate::convert::{lookup, value_as_i64};
use crate::entity::EntityKind;
use crate::rules::EntityRules;

/// DofusDB type ids of cosmetic objects (ceremonial gear, living-object skins)
pub const COSMETIC_TYPE_IDS: &[i64] = &[113, 147, 168, 179, 199, 207, 217, 218, 219, 220];

/// Reason a record must not be imported, if any
pub fn veto_reason(kind: EntityKind, rules: &EntityRules, raw: &Value) -> Option<&'static str> {
    if rules.meta.catalog_only {
        return Some("entity kind is catalog-only");
    }
    let cosmetic_candidate = matches!(
        kind,
        EntityKind::Item | EntityKind::Resource | EntityKind::Consumable
    );
    if cosmetic_candidate {
        let type_id = lookup(raw, "typeId").and_then(value_as_i64);
        if type_id.is_some_and(|id| COSMETIC_TYPE_IDS.contains(&id)) {
            return Some("cosmetic items cannot be imported");
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RulesMeta;
    use serde_json::json;

    #[test]
    fn test_vetoes() {
        let rules = EntityRules::default();
        assert_eq!(veto_reason(EntityKind::Item, &rules, &json!({"typeId": 1})), None);
        assert_eq!(
            veto_reason(EntityKind::Item, &rules, &json!({"typeId": 199})),
            Some("cosmetic items cannot be imported")
        );
        // panoplies are not checked for cosmetics
        assert_eq!(veto_reason(EntityKind::Panoply, &rules, &json!({"typeId": 199})), None);

        let catalog = EntityRules {
            meta: RulesMeta { catalog_only: true },
            ..Default::default()
        };
        assert_eq!(
            veto_reason(EntityKind::Npc, &catalog, &json!({})),
            Some("entity kind is catalog-only")
        );
    }
}
