mod engine;
mod path;
mod record;
mod resistance;
mod values;

pub use engine::*;
pub use path::*;
pub use record::*;
pub use resistance::*;
pub use values::*;

use crate::characteristic::CharacteristicResolver;
use crate::entity::EntityKind;

const DEFAULT_LANG: &str = "fr";

/// Per-record context handed to every formatter
#[derive(Clone, Copy)]
pub struct ConversionContext<'a> {
    pub kind: EntityKind,
    pub lang: &'a str,
    pub resolver: &'a CharacteristicResolver,
}

impl<'a> ConversionContext<'a> {
    pub fn new(kind: EntityKind, resolver: &'a CharacteristicResolver) -> Self {
        Self {
            kind,
            lang: DEFAULT_LANG,
            resolver,
        }
    }

    pub fn with_lang(self, lang: &'a str) -> Self {
        Self { lang, ..self }
    }

    pub fn converter(&self) -> ValueConverter<'a> {
        ValueConverter::new(self.resolver, self.kind)
    }
}
