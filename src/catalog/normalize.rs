//! Record normalization
//!
//! Joins one primary record with the run's lookup tables to produce a
//! [`Plant`] plus its optional thumbnail. Unresolvable references never fail:
//! they fall back to sentinel or default values and are reported as
//! [`DataIntegrityWarning`]s.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::lookups::{Lookups, PlantTypeLegend};
use super::model::{Photo, PhotoReference, Plant, WaterUseCode};
use crate::error::{DataIntegrityWarning, IntegrityIssue};
use crate::jsonapi::{MediaRef, PrimaryRecord};

static NON_ALPHANUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("filename pattern is valid"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s").expect("whitespace pattern is valid"));

/// File-name stem for a display name: each non-alphanumeric run becomes `_`
pub fn file_stem(display_name: &str) -> String {
    NON_ALPHANUMERIC_RE
        .replace_all(display_name, "_")
        .into_owned()
}

/// Extension of the last path segment of `url`, ignoring query and fragment
pub fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Deterministic download name: `<stem>_<suffix>.<ext>`
pub fn photo_filename(display_name: &str, suffix: &str, url: &str) -> String {
    let stem = file_stem(display_name);
    match url_extension(url) {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext),
        None => format!("{}_{}", stem, suffix),
    }
}

/// URL slug: every whitespace character becomes `_`
pub fn url_keyword(botanical_name: &str) -> String {
    WHITESPACE_RE.replace_all(botanical_name, "_").into_owned()
}

/// A plant, its thumbnail and the problems found while building them
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub plant: Plant,
    pub thumbnail: Option<Photo>,
    pub warnings: Vec<DataIntegrityWarning>,
}

pub struct RecordNormalizer<'a> {
    lookups: &'a Lookups,
    plant_types: &'a PlantTypeLegend,
    region_count: usize,
}

impl<'a> RecordNormalizer<'a> {
    pub fn new(lookups: &'a Lookups, plant_types: &'a PlantTypeLegend, region_count: usize) -> Self {
        Self {
            lookups,
            plant_types,
            region_count,
        }
    }

    pub fn normalize(&self, id: usize, record: &PrimaryRecord) -> NormalizedRecord {
        let mut warnings = Vec::new();
        let mut warn_for = |issue: IntegrityIssue| {
            let warning = DataIntegrityWarning {
                record_id: record.id.clone(),
                botanical_name: record.botanical_name.clone(),
                issue,
            };
            warn!(%warning, "Unresolved relationship");
            warnings.push(warning);
        };

        let water_use_by_region = (1..=self.region_count)
            .map(|region| match record.water_use.get(&region) {
                None => WaterUseCode::NotApplicable,
                Some(target) => match self.lookups.water_use.get(target) {
                    Some(code) => *code,
                    None => {
                        warn_for(IntegrityIssue::MissingWaterUse {
                            region,
                            target: target.clone(),
                        });
                        WaterUseCode::Unknown
                    }
                },
            })
            .collect();

        let types = record
            .plant_types
            .iter()
            .map(|target| {
                let code = match self.lookups.plant_type_names.get(target) {
                    None => {
                        warn_for(IntegrityIssue::MissingPlantType {
                            target: target.clone(),
                        });
                        None
                    }
                    Some(name) => {
                        let code = self.plant_types.code_for(name);
                        if code.is_none() {
                            warn_for(IntegrityIssue::UnmappedPlantType { name: name.clone() });
                        }
                        code
                    }
                };
                code.unwrap_or(self.plant_types.default_code()).to_string()
            })
            .collect();

        let name = &record.botanical_name;
        let mut photos = Vec::with_capacity(record.images.len());
        for (ix, image) in record.images.iter().enumerate() {
            let position = ix + 1;
            match self.lookups.file_urls.get(&image.id) {
                Some(url) => photos.push(photo(
                    image,
                    url,
                    format!("{} {}", name, position),
                    photo_filename(name, &position.to_string(), url),
                )),
                None => warn_for(IntegrityIssue::MissingFile {
                    target: image.id.clone(),
                }),
            }
        }

        let thumbnail = record
            .thumbnail
            .as_ref()
            .and_then(|thumb| match self.lookups.file_urls.get(&thumb.id) {
                Some(url) => Some(photo(
                    thumb,
                    url,
                    name.clone(),
                    photo_filename(name, "thumbnail", url),
                )),
                None => {
                    warn_for(IntegrityIssue::MissingFile {
                        target: thumb.id.clone(),
                    });
                    None
                }
            });

        NormalizedRecord {
            plant: Plant {
                id,
                url_keyword: url_keyword(name),
                botanical_name: name.clone(),
                photos,
                common_name: record.common_name.clone(),
                types,
                cultural_information: record.cultural_information.clone().unwrap_or_default(),
                water_use_by_region,
            },
            thumbnail,
            warnings,
        }
    }
}

fn photo(media: &MediaRef, url: &str, caption: String, filename: String) -> Photo {
    Photo {
        small: PhotoReference {
            url: url.to_string(),
            width: media.width,
            height: media.height,
        },
        filename,
        caption,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::lookups::LookupTable;
    use crate::catalog::model::PlantType;
    use std::collections::BTreeMap;

    fn lookups() -> Lookups {
        Lookups {
            water_use: [
                ("w-low".to_string(), WaterUseCode::Low),
                ("w-high".to_string(), WaterUseCode::High),
            ]
            .into_iter()
            .collect(),
            plant_type_names: [
                ("t-tree".to_string(), "Tree".to_string()),
                ("t-odd".to_string(), "Epiphyte".to_string()),
            ]
            .into_iter()
            .collect(),
            file_urls: [
                ("f1".to_string(), "https://x/files/a.jpg".to_string()),
                ("f2".to_string(), "https://x/files/b.PNG".to_string()),
                ("f-thumb".to_string(), "https://x/files/t.webp".to_string()),
            ]
            .into_iter()
            .collect::<LookupTable<String>>(),
        }
    }

    fn legend() -> PlantTypeLegend {
        PlantTypeLegend::new(
            &[PlantType {
                code: "T".into(),
                name: "Tree".into(),
            }],
            "U",
        )
    }

    fn media(id: &str) -> MediaRef {
        MediaRef {
            id: id.into(),
            width: Some(480),
            height: Some(320),
        }
    }

    fn record() -> PrimaryRecord {
        PrimaryRecord {
            id: "p1".into(),
            botanical_name: "Quercus agrifolia".into(),
            common_name: "Coast live oak".into(),
            cultural_information: None,
            water_use: BTreeMap::from([(1, "w-low".to_string()), (3, "w-gone".to_string())]),
            plant_types: vec!["t-tree".into(), "t-odd".into(), "t-gone".into()],
            images: vec![media("f1"), media("f-missing"), media("f2")],
            thumbnail: Some(media("f-thumb")),
        }
    }

    #[test]
    fn filename_matches_documented_example() {
        assert_eq!(
            photo_filename("Quercus agrifolia", "2", "https://x/files/oak.jpg"),
            "Quercus_agrifolia_2.jpg"
        );
        assert_eq!(file_stem("Salvia 'Bee's Bliss'"), "Salvia_Bee_s_Bliss_");
        assert_eq!(file_stem("Arctostaphylos  x  'Emerald'"), "Arctostaphylos_x_Emerald_");
    }

    #[test]
    fn extension_ignores_query_and_dots_in_host() {
        assert_eq!(url_extension("https://x.org/a/b.jpeg?itok=12.3"), Some("jpeg"));
        assert_eq!(url_extension("https://x.org/a/noext"), None);
        assert_eq!(photo_filename("Aloe", "1", "https://x.org/noext"), "Aloe_1");
    }

    #[test]
    fn url_keyword_replaces_each_whitespace() {
        assert_eq!(url_keyword("Acer  rubrum"), "Acer__rubrum");
    }

    #[test]
    fn region_codes_use_sentinels() {
        let lookups = lookups();
        let legend = legend();
        let normalized = RecordNormalizer::new(&lookups, &legend, 4).normalize(0, &record());

        assert_eq!(
            normalized.plant.water_use_by_region,
            vec![
                WaterUseCode::Low,
                WaterUseCode::NotApplicable,
                WaterUseCode::Unknown,
                WaterUseCode::NotApplicable,
            ]
        );
        assert!(normalized.warnings.iter().any(|w| w.issue
            == IntegrityIssue::MissingWaterUse {
                region: 3,
                target: "w-gone".into()
            }));
    }

    #[test]
    fn plant_types_fall_back_to_default() {
        let lookups = lookups();
        let legend = legend();
        let normalized = RecordNormalizer::new(&lookups, &legend, 6).normalize(0, &record());
        assert_eq!(normalized.plant.types, vec!["T", "U", "U"]);
    }

    #[test]
    fn photos_keep_source_positions() {
        let lookups = lookups();
        let legend = legend();
        let normalized = RecordNormalizer::new(&lookups, &legend, 6).normalize(5, &record());
        let plant = &normalized.plant;

        assert_eq!(plant.id, 5);
        assert_eq!(plant.url_keyword, "Quercus_agrifolia");
        assert_eq!(plant.cultural_information, "");
        let names: Vec<&str> = plant.photos.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["Quercus_agrifolia_1.jpg", "Quercus_agrifolia_3.PNG"]);
        assert_eq!(plant.photos[1].caption, "Quercus agrifolia 3");
        assert_eq!(plant.photos[0].small.width, Some(480));

        let thumb = normalized.thumbnail.unwrap();
        assert_eq!(thumb.filename, "Quercus_agrifolia_thumbnail.webp");
        assert_eq!(thumb.caption, "Quercus agrifolia");

        // region 3, plant types t-odd and t-gone, file f-missing
        assert_eq!(normalized.warnings.len(), 4);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::catalog::lookups::LookupTable;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn arb_slots() -> impl Strategy<Value = BTreeMap<usize, String>> {
        prop::collection::btree_map(
            1usize..12,
            prop_oneof![Just("w-low".to_string()), Just("w-gone".to_string())],
            0..8,
        )
    }

    proptest! {
        #[test]
        fn one_code_per_region(region_count in 1usize..10, slots in arb_slots()) {
            let lookups = Lookups {
                water_use: [("w-low".to_string(), WaterUseCode::Low)].into_iter().collect(),
                plant_type_names: LookupTable::default(),
                file_urls: LookupTable::default(),
            };
            let legend = PlantTypeLegend::new(&[], "U");
            let record = PrimaryRecord {
                id: "p".into(),
                botanical_name: "Aloe vera".into(),
                common_name: String::new(),
                cultural_information: None,
                water_use: slots.clone(),
                plant_types: vec![],
                images: vec![],
                thumbnail: None,
            };

            let normalized = RecordNormalizer::new(&lookups, &legend, region_count).normalize(0, &record);
            let codes = &normalized.plant.water_use_by_region;
            prop_assert_eq!(codes.len(), region_count);
            for (ix, code) in codes.iter().enumerate() {
                let expected = match slots.get(&(ix + 1)).map(String::as_str) {
                    None => WaterUseCode::NotApplicable,
                    Some("w-low") => WaterUseCode::Low,
                    Some(_) => WaterUseCode::Unknown,
                };
                prop_assert_eq!(*code, expected);
            }
            // slots beyond the region count are ignored
            let unresolved = slots
                .iter()
                .filter(|(k, v)| **k <= region_count && v.as_str() == "w-gone")
                .count();
            prop_assert_eq!(normalized.warnings.len(), unresolved);
        }

        #[test]
        fn stems_are_letters_digits_and_single_underscores(name in "\\PC{0,40}") {
            let stem = file_stem(&name);
            prop_assert!(!stem.contains("__"));
            prop_assert!(stem.chars().all(|c| c == '_' || c.is_alphanumeric()));
        }

        #[test]
        fn filename_ends_with_url_extension(
            name in "[A-Za-z ]{1,20}",
            position in 1usize..20,
            ext in "[a-z]{2,4}",
        ) {
            let url = format!("https://x.org/files/img.{}?itok=abc", ext);
            let filename = photo_filename(&name, &position.to_string(), &url);
            let expected_suffix = format!("_{}.{}", position, ext);
            prop_assert!(filename.ends_with(&expected_suffix));
            prop_assert!(filename.starts_with(&file_stem(&name)));
        }
    }
}
