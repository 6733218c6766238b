use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A creature record as returned by the data provider.
///
/// Records are never edited in place; evolution swaps in a new record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Creature {
    pub id: u32,
    pub name: String,
    pub types: Vec<String>,
    #[serde(default)]
    pub sprites: Sprites,
    pub stats: CreatureStats,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Sprites {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreatureStats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    #[serde(default)]
    pub special_attack: u32,
    #[serde(default)]
    pub special_defense: u32,
}

impl Creature {
    pub fn display_name(&self) -> String {
        format_name(&self.name)
    }

    /// Matches either the lowercase name or the decimal id.
    pub fn matches_query(&self, query: &str) -> bool {
        self.name == query || self.id.to_string() == query
    }
}

/// `mr-mime` -> `Mr Mime`
pub fn format_name(name: &str) -> String {
    name.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    let rest = chars.as_str();
                    format!("{}{}", first.to_ascii_uppercase(), rest)
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pikachu() -> Creature {
        Creature {
            id: 25,
            name: "pikachu".into(),
            types: vec!["electric".into()],
            sprites: Sprites::default(),
            stats: CreatureStats {
                hp: 35,
                attack: 55,
                defense: 40,
                speed: 90,
                ..Default::default()
            },
            abilities: vec!["static".into()],
            height: 4,
            weight: 60,
        }
    }

    #[test]
    fn test_format_name_capitalizes_each_part() {
        assert_eq!(format_name("mr-mime"), "Mr Mime");
        assert_eq!(format_name("pikachu"), "Pikachu");
        assert_eq!(format_name("ho--oh"), "Ho Oh");
    }

    #[test]
    fn test_matches_query_by_name_or_id() {
        let creature = pikachu();
        assert!(creature.matches_query("pikachu"));
        assert!(creature.matches_query("25"));
        assert!(!creature.matches_query("pika"));
        assert!(!creature.matches_query("025"));
    }
}
