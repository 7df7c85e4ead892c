//! Loader integration tests against the bundled data directory and
//! scratch directories built with `tempfile`.

use std::fs;
use std::path::PathBuf;

use sheet_content::{CharacterLoader, ContentFactory, MetatypeLoader, OptionsLoader};
use sheet_core::{SessionPhase, SheetConfig};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

#[test]
fn bundled_catalogs_load() {
    let factory = ContentFactory::new(data_dir());

    let metatypes = factory.load_metatypes().unwrap();
    let ork = metatypes.find("ork").unwrap();
    let body = ork.attributes.iter().find(|a| a.abbrev == "BOD").unwrap();
    assert_eq!((body.minimum, body.maximum, body.augmented_maximum), (4, 9, 13));

    let weapons = factory.load_weapons().unwrap();
    assert!(weapons.weapon("Ares Predator V").is_some());
    assert!(weapons.accessory("laser sight").is_some());

    assert_eq!(factory.load_options().unwrap(), SheetConfig::default());
}

#[test]
fn bundled_character_resolves_derived_values() {
    let factory = ContentFactory::new(data_dir());
    let (name, character) = factory.load_character("street_samurai").unwrap();

    assert_eq!(name, "Razor");
    assert_eq!(character.phase(), SessionPhase::Career);
    // Minimum 3 + base 1, plus two points of muscle replacement.
    assert_eq!(character.attribute_total("STR"), Some(6));

    let katana = character.weapons().find(|w| w.name() == "Katana").unwrap();
    assert_eq!(katana.display_damage(), "10P");

    let pistol = character.weapons().find(|w| w.name() == "Ares Predator V").unwrap();
    assert_eq!(pistol.total_accuracy(), 7);
}

#[test]
fn new_character_starts_at_metatype_minimum() {
    let factory = ContentFactory::new(data_dir());
    let character = factory.new_character("Troll").unwrap();

    assert_eq!(character.attribute_total("BOD"), Some(5));
    assert_eq!(character.attribute_total("EDG"), Some(1));
    assert!(factory.new_character("Dragon").is_err());
}

#[test]
fn partial_options_keep_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.toml");
    fs::write(&path, "karma_attribute = 4\nmore_lethal_gameplay = true\n").unwrap();

    let config = OptionsLoader::load(&path).unwrap();
    assert_eq!(config.karma_attribute, 4);
    assert!(config.more_lethal_gameplay);
    assert_eq!(config.karma_initiation, SheetConfig::DEFAULT_KARMA_INITIATION);
}

#[test]
fn non_positive_karma_multiplier_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.toml");
    fs::write(&path, "karma_attribute = 0\n").unwrap();

    assert!(OptionsLoader::load(&path).is_err());
}

#[test]
fn inverted_metatype_range_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metatypes.ron");
    fs::write(
        &path,
        r#"(metatypes: [(
            name: "Broken",
            attributes: [(abbrev: "BOD", minimum: 7, maximum: 6, augmented_maximum: 10)],
        )])"#,
    )
    .unwrap();

    let err = MetatypeLoader::load(&path).unwrap_err();
    assert!(err.to_string().contains("BOD"));
}

#[test]
fn saved_character_survives_reload() {
    let factory = ContentFactory::new(data_dir());
    let (name, mut character) = factory.load_character("street_samurai").unwrap();
    character.upgrade_attribute("BOD", 1).unwrap();
    let karma_after = character.karma();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("razor.ron");
    CharacterLoader::save(&path, &character.snapshot(&name)).unwrap();

    let (reloaded_name, reloaded) = CharacterLoader::load(&path, SheetConfig::default()).unwrap();
    assert_eq!(reloaded_name, "Razor");
    assert_eq!(reloaded.karma(), karma_after);
    assert_eq!(reloaded.attribute_total("BOD"), character.attribute_total("BOD"));
    assert_eq!(reloaded.expenses().len(), 1);
    assert_eq!(reloaded.weapons().count(), 2);
}
