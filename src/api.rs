//! PokeAPI client.
//!
//! Every provider failure is collapsed into absence at the [`CreatureSource`]
//! boundary: an empty page, a missing creature, or no next evolution.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::creature::{Creature, CreatureStats, Sprites};

pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("bad status: {0}")]
    Status(String),
    #[error("response parse error: {0}")]
    Parse(String),
    #[error("missing stat: {0}")]
    MissingStat(&'static str),
}

/// Read-only access to the creature catalog.
#[async_trait]
pub trait CreatureSource: Send + Sync {
    async fn list_page(&self, limit: u32, offset: u32) -> Vec<ListEntry>;

    async fn fetch_details(&self, name_or_id: &str) -> Option<Creature>;

    /// Name of the first form `name` evolves into, if any.
    async fn fetch_next_evolution_name(&self, name: &str) -> Option<String>;
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ListEntry {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    /// Response cache directory; `None` disables the cache.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            cache_dir: default_cache_dir(),
        }
    }
}

pub fn default_cache_dir() -> Option<PathBuf> {
    dirs_next::cache_dir().map(|dir| dir.join("pokebattle"))
}

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Clone, Debug, Deserialize)]
struct ApiResource {
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonListResponse {
    results: Vec<ListEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u32,
    name: String,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    weight: u32,
    #[serde(default)]
    types: Vec<PokemonTypeSlot>,
    stats: Vec<PokemonStatSlot>,
    #[serde(default)]
    abilities: Vec<PokemonAbilitySlot>,
    #[serde(default)]
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonTypeSlot {
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonStatSlot {
    base_stat: u32,
    stat: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonAbilitySlot {
    ability: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonSpeciesResponse {
    evolution_chain: Option<ApiResource>,
}

#[derive(Clone, Debug, Deserialize)]
struct EvolutionChainResponse {
    chain: ChainLink,
}

#[derive(Clone, Debug, Deserialize)]
struct ChainLink {
    species: NamedResource,
    #[serde(default)]
    evolves_to: Vec<ChainLink>,
}

pub struct PokeApiClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl PokeApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<ListEntry>, FetchError> {
        let url = format!(
            "{}/pokemon?limit={limit}&offset={offset}",
            self.config.base_url
        );
        let response: PokemonListResponse = self.fetch_json(&url).await?;
        Ok(response.results)
    }

    pub async fn details(&self, name_or_id: &str) -> Result<Creature, FetchError> {
        let url = format!("{}/pokemon/{name_or_id}", self.config.base_url);
        let response: PokemonResponse = self.fetch_json(&url).await?;
        creature_from_response(response)
    }

    pub async fn next_evolution(&self, name: &str) -> Result<Option<String>, FetchError> {
        let url = format!("{}/pokemon-species/{name}", self.config.base_url);
        let species: PokemonSpeciesResponse = self.fetch_json(&url).await?;
        let Some(chain) = species.evolution_chain else {
            return Ok(None);
        };
        let response: EvolutionChainResponse = self.fetch_json(&chain.url).await?;
        Ok(find_next_evolution(&response.chain, name))
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Some(path) = self.cache_path(url) {
                    let _ = fs::remove_file(&path).await;
                }
                Err(FetchError::Parse(err.to_string()))
            }
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let cache_path = self.cache_path(url);
        if let Some(path) = cache_path.as_deref() {
            if let Some(bytes) = read_cache(path).await {
                return Ok(bytes);
            }
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|err| FetchError::Status(err.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?
            .to_vec();
        if let Some(path) = cache_path.as_deref() {
            write_cache(path, &bytes).await;
        }
        Ok(bytes)
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let root = self.config.cache_dir.as_ref()?;
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Some(root.join("http").join(digest))
    }
}

#[async_trait]
impl CreatureSource for PokeApiClient {
    async fn list_page(&self, limit: u32, offset: u32) -> Vec<ListEntry> {
        self.list(limit, offset).await.unwrap_or_default()
    }

    async fn fetch_details(&self, name_or_id: &str) -> Option<Creature> {
        if name_or_id.trim().is_empty() {
            return None;
        }
        self.details(name_or_id).await.ok()
    }

    async fn fetch_next_evolution_name(&self, name: &str) -> Option<String> {
        if name.trim().is_empty() {
            return None;
        }
        self.next_evolution(name).await.ok().flatten()
    }
}

fn creature_from_response(response: PokemonResponse) -> Result<Creature, FetchError> {
    let stat = |stat_name: &str| -> Option<u32> {
        response
            .stats
            .iter()
            .find(|slot| slot.stat.name == stat_name)
            .map(|slot| slot.base_stat)
    };

    let stats = CreatureStats {
        hp: stat("hp").ok_or(FetchError::MissingStat("hp"))?,
        attack: stat("attack").ok_or(FetchError::MissingStat("attack"))?,
        defense: stat("defense").ok_or(FetchError::MissingStat("defense"))?,
        speed: stat("speed").ok_or(FetchError::MissingStat("speed"))?,
        special_attack: stat("special-attack").unwrap_or(0),
        special_defense: stat("special-defense").unwrap_or(0),
    };

    Ok(Creature {
        id: response.id,
        name: response.name,
        types: response
            .types
            .into_iter()
            .map(|slot| slot.kind.name)
            .collect(),
        sprites: Sprites {
            front_default: sprite_url(&response.sprites, "front_default"),
            front_shiny: sprite_url(&response.sprites, "front_shiny"),
        },
        stats,
        abilities: response
            .abilities
            .into_iter()
            .map(|slot| slot.ability.name)
            .collect(),
        height: response.height,
        weight: response.weight,
    })
}

/// Official artwork first, plain sprite as fallback.
fn sprite_url(sprites: &serde_json::Value, key: &str) -> Option<String> {
    pointer_string(sprites, &format!("/other/official-artwork/{key}"))
        .or_else(|| pointer_string(sprites, &format!("/{key}")))
}

fn pointer_string(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}

/// Pre-order walk; the first node named `name` decides the answer.
fn find_next_evolution(chain: &ChainLink, name: &str) -> Option<String> {
    let mut stack = vec![chain];
    while let Some(node) = stack.pop() {
        if node.species.name == name {
            return node
                .evolves_to
                .first()
                .map(|next| next.species.name.clone());
        }
        stack.extend(node.evolves_to.iter().rev());
    }
    None
}

async fn read_cache(path: &Path) -> Option<Vec<u8>> {
    fs::read(path).await.ok()
}

async fn write_cache(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent).await;
    }
    let _ = fs::write(path, bytes).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn chain(value: serde_json::Value) -> ChainLink {
        serde_json::from_value(value).expect("chain fixture")
    }

    fn eevee_chain() -> ChainLink {
        chain(json!({
            "species": { "name": "eevee" },
            "evolves_to": [
                { "species": { "name": "vaporeon" }, "evolves_to": [] },
                { "species": { "name": "jolteon" }, "evolves_to": [] }
            ]
        }))
    }

    fn pokemon_json(sprites: serde_json::Value) -> serde_json::Value {
        json!({
            "id": 1,
            "name": "bulbasaur",
            "height": 7,
            "weight": 69,
            "types": [
                { "slot": 1, "type": { "name": "grass", "url": "" } },
                { "slot": 2, "type": { "name": "poison", "url": "" } }
            ],
            "stats": [
                { "base_stat": 45, "stat": { "name": "hp" } },
                { "base_stat": 49, "stat": { "name": "attack" } },
                { "base_stat": 49, "stat": { "name": "defense" } },
                { "base_stat": 65, "stat": { "name": "special-attack" } },
                { "base_stat": 65, "stat": { "name": "special-defense" } },
                { "base_stat": 45, "stat": { "name": "speed" } }
            ],
            "abilities": [
                { "ability": { "name": "overgrow" } },
                { "ability": { "name": "chlorophyll" } }
            ],
            "sprites": sprites
        })
    }

    #[test]
    fn test_next_evolution_of_root_is_first_child() {
        assert_eq!(
            find_next_evolution(&eevee_chain(), "eevee"),
            Some("vaporeon".to_string())
        );
    }

    #[test]
    fn test_final_stage_has_no_next_evolution() {
        assert_eq!(find_next_evolution(&eevee_chain(), "jolteon"), None);
        assert_eq!(find_next_evolution(&eevee_chain(), "pikachu"), None);
    }

    #[test]
    fn test_next_evolution_searches_nested_stages() {
        let chain = chain(json!({
            "species": { "name": "bulbasaur" },
            "evolves_to": [{
                "species": { "name": "ivysaur" },
                "evolves_to": [{ "species": { "name": "venusaur" }, "evolves_to": [] }]
            }]
        }));
        assert_eq!(
            find_next_evolution(&chain, "ivysaur"),
            Some("venusaur".to_string())
        );
    }

    #[test]
    fn test_first_matching_node_wins() {
        let chain = chain(json!({
            "species": { "name": "root" },
            "evolves_to": [
                {
                    "species": { "name": "twin" },
                    "evolves_to": [{ "species": { "name": "left" }, "evolves_to": [] }]
                },
                {
                    "species": { "name": "twin" },
                    "evolves_to": [{ "species": { "name": "right" }, "evolves_to": [] }]
                }
            ]
        }));
        assert_eq!(find_next_evolution(&chain, "twin"), Some("left".to_string()));
    }

    #[test]
    fn test_creature_prefers_official_artwork() {
        let response: PokemonResponse = serde_json::from_value(pokemon_json(json!({
            "front_default": "plain.png",
            "front_shiny": "plain-shiny.png",
            "other": {
                "official-artwork": {
                    "front_default": "artwork.png",
                    "front_shiny": null
                }
            }
        })))
        .expect("pokemon fixture");

        let creature = creature_from_response(response).expect("creature");

        assert_eq!(creature.sprites.front_default.as_deref(), Some("artwork.png"));
        assert_eq!(
            creature.sprites.front_shiny.as_deref(),
            Some("plain-shiny.png")
        );
    }

    #[test]
    fn test_creature_maps_stats_types_and_abilities() {
        let response: PokemonResponse =
            serde_json::from_value(pokemon_json(json!({}))).expect("pokemon fixture");

        let creature = creature_from_response(response).expect("creature");

        assert_eq!(creature.types, vec!["grass", "poison"]);
        assert_eq!(creature.abilities, vec!["overgrow", "chlorophyll"]);
        assert_eq!(
            creature.stats,
            CreatureStats {
                hp: 45,
                attack: 49,
                defense: 49,
                speed: 45,
                special_attack: 65,
                special_defense: 65,
            }
        );
        assert_eq!(creature.sprites, Sprites::default());
    }

    #[test]
    fn test_creature_without_required_stat_is_rejected() {
        let mut value = pokemon_json(json!({}));
        value["stats"] = json!([{ "base_stat": 45, "stat": { "name": "hp" } }]);
        let response: PokemonResponse = serde_json::from_value(value).expect("pokemon fixture");

        assert!(matches!(
            creature_from_response(response),
            Err(FetchError::MissingStat("attack"))
        ));
    }

    #[test]
    fn test_cache_path_is_stable_per_url() {
        let client = PokeApiClient::new(ClientConfig {
            base_url: DEFAULT_API_BASE.to_string(),
            cache_dir: Some(PathBuf::from("/tmp/pokebattle-test")),
        });
        let a = client.cache_path("https://example.test/a");
        let b = client.cache_path("https://example.test/b");
        assert_eq!(a, client.cache_path("https://example.test/a"));
        assert_ne!(a, b);

        let uncached = PokeApiClient::new(ClientConfig {
            base_url: DEFAULT_API_BASE.to_string(),
            cache_dir: None,
        });
        assert_eq!(uncached.cache_path("https://example.test/a"), None);
    }

    #[tokio::test]
    async fn test_unreachable_provider_collapses_to_absence() {
        let client = PokeApiClient::new(ClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            cache_dir: None,
        });

        assert!(client.list_page(12, 0).await.is_empty());
        assert_eq!(client.fetch_details("pikachu").await, None);
        assert_eq!(client.fetch_next_evolution_name("pikachu").await, None);
    }
}
