//! Palette catalogs: JSON lists of named palettes.
//!
//! ```json
//! [{ "name": "Game Boy", "slug": "game-boy", "count": 4, "rgb": [15, 56, 15, ...] }]
//! ```

use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{error::Error, palette::Palette};

#[derive(Deserialize)]
struct Record {
    name: String,
    count: usize,
    rgb: Vec<u8>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub slug: String,
    pub url: Option<String>,
    pub palette: Arc<Palette>,
}

/// What catalog listings expose about an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub name: String,
    pub slug: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Entry {
    pub fn summary(&self) -> Summary {
        Summary {
            name: self.palette.name().to_owned(),
            slug: self.slug.clone(),
            count: self.palette.len(),
            url: self.url.clone(),
        }
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_end_matches('-').len();
    slug.truncate(trimmed);
    slug
}

/// Selects catalog entries the way palette pickers do.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub min_colors: Option<usize>,
    pub max_colors: Option<usize>,
    /// Substring the slug has to contain. Slugs are lowercase, so this matches regardless of
    /// case.
    pub name: Option<String>,
}

impl Filter {
    pub fn matches(&self, entry: &Entry) -> bool {
        let count = entry.palette.len();
        self.min_colors.map_or(true, |min| min <= count)
            && self.max_colors.map_or(true, |max| count <= max)
            && self
                .name
                .as_deref()
                .map_or(true, |name| entry.slug.contains(&name.to_lowercase()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Entry>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let records: Vec<Record> = serde_json::from_str(json)?;
        let entries = records
            .into_iter()
            .map(|record| {
                let name = record.name.trim().to_owned();
                if record.count == 0 {
                    return Err(Error::PaletteIsEmpty);
                }
                if record.rgb.len() != record.count * 3 {
                    return Err(Error::PaletteLengthMismatch {
                        name,
                        count: record.count,
                        len: record.rgb.len(),
                    });
                }
                let slug = record.slug.unwrap_or_else(|| slugify(&name));
                Ok(Entry {
                    palette: Arc::new(Palette::from_flat_rgb(name, &record.rgb)?),
                    slug,
                    url: record.url,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filter<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.iter().filter(move |entry| filter.matches(entry))
    }

    /// Looks a palette up by slug, falling back to its exact name.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|entry| entry.slug == key)
            .or_else(|| self.entries.iter().find(|entry| entry.palette.name() == key))
    }

    /// Looks up every key with [`Catalog::get`], keeping their order. Fails on the first key
    /// that names no palette.
    pub fn resolve<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k str>,
    ) -> Result<Vec<Arc<Palette>>, Error> {
        keys.into_iter()
            .map(|key| {
                self.get(key)
                    .map(|entry| Arc::clone(&entry.palette))
                    .ok_or_else(|| Error::UnknownPalette(key.to_owned()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Color;

    const CATALOG: &str = r#"[
        { "name": " Game Boy ", "slug": "game-boy", "count": 4,
          "rgb": [15, 56, 15, 48, 98, 48, 139, 172, 15, 155, 188, 15] },
        { "name": "1-bit", "count": 2, "rgb": [0, 0, 0, 255, 255, 255],
          "url": "https://example.com/1-bit" },
        { "name": "Pico-8 Extended", "count": 3, "rgb": [0, 0, 0, 29, 43, 83, 126, 37, 83] }
    ]"#;

    #[test]
    fn loads_and_trims() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);
        let gb = catalog.get("game-boy").unwrap();
        assert_eq!(gb.palette.name(), "Game Boy");
        assert_eq!(gb.palette.colors()[0], Color::new(15, 56, 15));
        assert_eq!(catalog.get("1-bit").unwrap().slug, "1-bit");
        assert_eq!(
            catalog.get("Pico-8 Extended").unwrap().slug,
            "pico-8-extended"
        );
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn filters_by_size_and_name() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let names = |filter: Filter| -> Vec<String> {
            catalog
                .filter(&filter)
                .map(|e| e.palette.name().to_owned())
                .collect()
        };

        assert_eq!(
            names(Filter {
                min_colors: Some(3),
                ..Default::default()
            }),
            ["Game Boy", "Pico-8 Extended"]
        );
        assert_eq!(
            names(Filter {
                max_colors: Some(2),
                ..Default::default()
            }),
            ["1-bit"]
        );
        assert_eq!(
            names(Filter {
                name: Some("Pico".into()),
                ..Default::default()
            }),
            ["Pico-8 Extended"]
        );
        assert_eq!(
            names(Filter {
                name: Some("GAME-B".into()),
                ..Default::default()
            }),
            ["Game Boy"]
        );
    }

    #[test]
    fn resolves_keys_in_order() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let palettes = catalog.resolve(["1-bit", "Game Boy"]).unwrap();
        let names: Vec<_> = palettes.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["1-bit", "Game Boy"]);

        assert!(matches!(
            catalog.resolve(["game-boy", "nes"]),
            Err(Error::UnknownPalette(key)) if key == "nes"
        ));
    }

    #[test]
    fn rejects_inconsistent_records() {
        let json = r#"[{ "name": "short", "count": 2, "rgb": [1, 2, 3] }]"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(Error::PaletteLengthMismatch { count: 2, len: 3, .. })
        ));
        let json = r#"[{ "name": "empty", "count": 0, "rgb": [] }]"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(Error::PaletteIsEmpty)
        ));
        assert!(matches!(Catalog::from_json("{"), Err(Error::Catalog(_))));
    }
}
