use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::catalog::CatalogClient;
use crate::error::{RelayError, Result};
use crate::locale::{select_all, select_one};
use crate::random::RandomSource;
use crate::record::Record;
use crate::relay::ImageRelay;

/// Locale preference lists for display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalePreferences {
    /// Names, genera and type names.
    pub display: Vec<String>,
    /// Flavor texts, sampled at random from the first matching locale.
    pub flavor: Vec<String>,
}

impl Default for LocalePreferences {
    fn default() -> Self {
        Self {
            display: vec!["ja".into(), "ja-Hrkt".into(), "en".into()],
            flavor: vec!["ja".into(), "ja-Hrkt".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesView {
    pub id: u64,
    pub prev_id: u64,
    pub next_id: u64,
    pub name: Option<String>,
    pub genus: Option<String>,
    pub flavor: Option<String>,
    pub types: Vec<String>,
    pub sprite: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizView {
    pub id: u64,
    pub prev_id: u64,
    pub next_id: u64,
    pub genus: Option<String>,
    pub flavor: Option<String>,
    pub types: Vec<String>,
    pub sprite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

/// Builds the JSON views the front end serves, out of catalog records.
#[derive(Clone)]
pub struct Presenter {
    catalog: CatalogClient,
    relay: ImageRelay,
    random: Arc<dyn RandomSource>,
    locales: LocalePreferences,
}

impl Presenter {
    pub fn new(
        catalog: CatalogClient,
        relay: ImageRelay,
        random: Arc<dyn RandomSource>,
        locales: LocalePreferences,
    ) -> Self {
        Self {
            catalog,
            relay,
            random,
            locales,
        }
    }

    pub async fn random_id(&self) -> Result<u64> {
        let total = self.catalog.species_count().await?;
        if total == 0 {
            return Err(RelayError::InvalidArgument("catalog has no species".into()));
        }
        Ok(self.random.pick_in(1, total))
    }

    pub async fn species(&self, id: u64) -> Result<SpeciesView> {
        if id == 0 {
            return Err(RelayError::InvalidArgument("species id must be positive".into()));
        }
        let (total, species, pokemon) = tokio::try_join!(
            self.catalog.species_count(),
            self.catalog.species(id),
            self.catalog.pokemon(id),
        )?;
        debug!("Building view for species {} of {}", id, total);

        let (prev_id, next_id) = neighbours(id, total);
        let types = self.type_names(&pokemon).await?;
        let sprite = match pokemon.str_at("sprites.front_default") {
            Some(url) => Some(self.relay.localize(url).await?),
            None => None,
        };

        Ok(SpeciesView {
            id,
            prev_id,
            next_id,
            name: self.display_string(&species, "names", "name"),
            genus: self.display_string(&species, "genera", "genus"),
            flavor: self.flavor_text(&species),
            types,
            sprite,
        })
    }

    /// Quiz view for `id`; when an answer is given it is graded against the
    /// species' names.
    pub async fn quiz(&self, id: u64, answer: Option<&str>) -> Result<QuizView> {
        let view = self.species(id).await?;
        let correct = match answer {
            Some(answer) => {
                let species = self.catalog.species(id).await?;
                Some(self.is_correct(&species, answer))
            }
            None => None,
        };

        Ok(QuizView {
            id: view.id,
            prev_id: view.prev_id,
            next_id: view.next_id,
            genus: view.genus,
            flavor: view.flavor,
            types: view.types,
            sprite: view.sprite,
            answer: answer.map(str::to_string),
            correct,
        })
    }

    /// Correct when it equals the best name for any one of the display
    /// locales, checked locale by locale.
    fn is_correct(&self, species: &Record, answer: &str) -> bool {
        let names = species.localized("names");
        self.locales.display.iter().any(|locale| {
            select_one(&names, std::slice::from_ref(locale))
                .and_then(|item| item.payload.str_at("name"))
                == Some(answer)
        })
    }

    fn display_string(&self, record: &Record, list: &str, field: &str) -> Option<String> {
        let items = record.localized(list);
        select_one(&items, &self.locales.display)
            .and_then(|item| item.payload.str_at(field))
            .map(str::to_string)
    }

    fn flavor_text(&self, species: &Record) -> Option<String> {
        let items = species.localized("flavor_text_entries");
        let candidates = select_all(&items, &self.locales.flavor);
        let index = self.random.pick_index(candidates.len())?;
        candidates[index]
            .payload
            .str_at("flavor_text")
            .map(str::to_string)
    }

    async fn type_names(&self, pokemon: &Record) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for slot in pokemon.records_at("types") {
            let Some(type_name) = slot.str_at("type.name") else {
                continue;
            };
            let record = self.catalog.type_named(type_name).await?;
            let display = self
                .display_string(&record, "names", "name")
                .unwrap_or_else(|| type_name.to_string());
            names.push(display);
        }
        Ok(names)
    }
}

/// Previous and next ids, wrapping around at both ends.
pub fn neighbours(id: u64, total: u64) -> (u64, u64) {
    let prev = if id > 1 { id - 1 } else { total };
    let next = if id < total { id + 1 } else { 1 };
    (prev, next)
}
