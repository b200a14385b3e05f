use crate::characteristic::CharacteristicResolver;
use crate::entity::EntityKind;
use crate::formula::{self, Variables};

/// Descending level threshold → rarity, used when no rarity formula is stored
pub const RARITY_THRESHOLDS: &[(i64, i64)] = &[(17, 4), (13, 3), (9, 2), (5, 1), (0, 0)];

/// Elements of the resistance batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Neutral,
    Earth,
    Fire,
    Air,
    Water,
}

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Neutral,
        Element::Earth,
        Element::Fire,
        Element::Air,
        Element::Water,
    ];

    /// Target field name (`res_feu`)
    pub fn field(&self) -> &'static str {
        match self {
            Element::Neutral => "res_neutre",
            Element::Earth => "res_terre",
            Element::Fire => "res_feu",
            Element::Air => "res_air",
            Element::Water => "res_eau",
        }
    }

    /// Field in the DofusDB resistance sub-document
    pub fn source_field(&self) -> &'static str {
        match self {
            Element::Neutral => "neutralResistance",
            Element::Earth => "earthResistance",
            Element::Fire => "fireResistance",
            Element::Air => "airResistance",
            Element::Water => "waterResistance",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Element::ALL.into_iter().find(|element| {
            element.field() == name
                || element.field().trim_start_matches("res_") == name
                || element.source_field().to_ascii_lowercase() == name
                || element.english() == name
        })
    }

    fn english(&self) -> &'static str {
        match self {
            Element::Neutral => "neutral",
            Element::Earth => "earth",
            Element::Fire => "fire",
            Element::Air => "air",
            Element::Water => "water",
        }
    }
}

/// Converts DofusDB quantities to Krosmoz values for one entity kind.
///
/// Each conversion tries the stored conversion formula first, falls back to
/// a fixed default formula, and finally clamps against the characteristic's
/// limits when both bounds resolve.
#[derive(Clone, Copy)]
pub struct ValueConverter<'a> {
    resolver: &'a CharacteristicResolver,
    kind: EntityKind,
}

impl<'a> ValueConverter<'a> {
    pub fn new(resolver: &'a CharacteristicResolver, kind: EntityKind) -> Self {
        Self { resolver, kind }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    fn key(&self, name: &str) -> String {
        format!("{}_{}", name, self.kind.group().as_str())
    }

    fn convert(&self, key: &str, vars: &Variables, default: impl FnOnce(&Variables) -> f64) -> i64 {
        let converted = self
            .resolver
            .conversion_formula(key, self.kind)
            .and_then(|text| {
                let value = formula::evaluate(&text, vars);
                if value.is_none() {
                    tracing::debug!(key, formula = %text, "stored conversion formula did not evaluate");
                }
                value
            })
            .unwrap_or_else(|| default(vars))
            .round() as i64;

        self.clamp(key, converted, vars)
    }

    /// Clamp against the resolved limits of `key`, pass through when they do not resolve
    pub fn clamp(&self, key: &str, value: i64, vars: &Variables) -> i64 {
        match self.resolver.limits(key, self.kind, vars) {
            Some(limits) => limits.clamp(value),
            None => value,
        }
    }

    pub fn level(&self, raw: f64) -> i64 {
        let key = self.key("level");
        self.convert(&key, &formula::vars([("x", raw)]), |_| raw / 10.0)
    }

    /// Life needs the already-converted level
    pub fn life(&self, raw: f64, level: i64) -> i64 {
        let key = self.key("life");
        let vars = formula::vars([("x", raw), ("level", level as f64)]);
        self.convert(&key, &vars, |_| (raw / 10.0 + level as f64 * 2.0).max(1.0))
    }

    /// Generic attribute (strength, intelligence, ...) under an explicit key
    pub fn attribute(&self, key: &str, raw: f64) -> i64 {
        self.convert(key, &formula::vars([("x", raw)]), |_| {
            6.0 + 24.0 * ((raw - 50.0) / 1150.0).max(0.0).sqrt()
        })
    }

    pub fn initiative(&self, raw: f64) -> i64 {
        let key = self.key("initiative");
        self.convert(&key, &formula::vars([("x", raw)]), |_| raw / 10.0)
    }

    pub fn resistance(&self, element: Element, raw: f64) -> i64 {
        let key = self.key(element.field());
        self.convert(&key, &formula::vars([("x", raw)]), |_| raw / 2.0)
    }

    /// Rarity from the converted level: stored formula, else threshold table
    pub fn rarity(&self, level: i64) -> i64 {
        let key = self.key("rarity");
        let vars = formula::vars([("level", level as f64)]);
        self.resolver
            .definition(&key, self.kind)
            .and_then(|definition| definition.formula.or(definition.conversion_formula))
            .and_then(|text| formula::evaluate(&text, &vars))
            .map(|value| value.round() as i64)
            .unwrap_or_else(|| rarity_from_thresholds(level))
    }
}

/// Highest threshold not exceeding `level`
pub fn rarity_from_thresholds(level: i64) -> i64 {
    RARITY_THRESHOLDS
        .iter()
        .find(|(threshold, _)| level >= *threshold)
        .map(|(_, rarity)| *rarity)
        .unwrap_or(0)
}
