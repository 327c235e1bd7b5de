//! Built-in monster records.

use loader::models::Record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonsterCategory {
    Vampire,
    Drowner,
    Nekker,
    Relict,
    Hybrid,
    #[serde(rename = "Cursed One")]
    CursedOne,
    Draconid,
}

impl MonsterCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonsterCategory::Vampire => "Vampire",
            MonsterCategory::Drowner => "Drowner",
            MonsterCategory::Nekker => "Nekker",
            MonsterCategory::Relict => "Relict",
            MonsterCategory::Hybrid => "Hybrid",
            MonsterCategory::CursedOne => "Cursed One",
            MonsterCategory::Draconid => "Draconid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub name: String,
    pub category: MonsterCategory,
}

impl Monster {
    pub fn new(name: impl Into<String>, category: MonsterCategory) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }
}

impl From<&Monster> for Record {
    fn from(monster: &Monster) -> Self {
        Record::new()
            .with_text("name", monster.name.clone())
            .with_category("category", monster.category.as_str())
    }
}

/// The default seed set.
pub fn monsters() -> Vec<Monster> {
    use MonsterCategory::*;

    [
        ("Katakan", Vampire),
        ("Drowner", Drowner),
        ("Nekker", Nekker),
        ("Leshen", Relict),
        ("Fiend", Relict),
        ("Griffin", Hybrid),
        ("Ekimma", Vampire),
        ("Werewolf", CursedOne),
        ("Basilisk", Draconid),
        ("Chort", Relict),
        ("Forktail", Draconid),
        ("Harpie", Hybrid),
        ("Succubus", Relict),
    ]
    .into_iter()
    .map(|(name, category)| Monster::new(name, category))
    .collect()
}

pub fn monster_records() -> Vec<Record> {
    monsters().iter().map(Record::from).collect()
}
