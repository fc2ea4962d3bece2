//! Built-in catalog tests
//!
//! Default slot counts and the irregular years of each collection type, plus
//! upgrades of collections created against older catalog revisions.

use std::sync::Arc;

use coinslot_core::{
    CollectionError, CollectionInstance, CollectionTemplate, DeltaAddition, MigrationEngine,
    OptionValue, SlotKey, SlotRecord, TextFixup,
};
use coinslot_service::{CatalogLoader, CollectionRegistry, EngineConfig, Result};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const AS_OF: i32 = 2024;

fn registry() -> Result<CollectionRegistry> {
    CollectionRegistry::build(&EngineConfig {
        as_of_year: Some(AS_OF),
        ..EngineConfig::default()
    })
}

fn template(type_id: &str) -> Result<Arc<CollectionTemplate>> {
    Ok(registry()?.lookup(type_id)?)
}

fn with(pairs: &[(&str, bool)]) -> IndexMap<String, OptionValue> {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), OptionValue::Bool(*value)))
        .collect()
}

fn keys(instance: &CollectionInstance) -> Vec<SlotKey> {
    instance.slots().map(|s| s.key.clone()).collect()
}

/// The template as it looked when `version` was its newest delta
fn truncated(template: &CollectionTemplate, version: u32) -> CollectionTemplate {
    let mut old = template.clone();
    old.deltas.retain(|d| d.version <= version);
    old
}

/// Test that every built-in template passes the strict self-check
#[test]
fn test_builtin_catalog_passes_strict_validation() -> Result<()> {
    let registry = registry()?;
    assert_eq!(registry.len(), 46);
    assert_eq!(registry.len(), CatalogLoader::new().builtin_count());
    assert_eq!(registry.lookup_index(0)?.type_id, "pennies");
    assert_eq!(registry.lookup_index(42)?.type_id, "coin_sets");
    assert_eq!(registry.lookup_index(45)?.type_id, "washington_quarters");
    Ok(())
}

/// Test default slot counts of every built-in type
#[test]
fn test_default_slot_counts() -> Result<()> {
    let expected = [
        ("pennies", 123),
        ("nickels", 89),
        ("quarters", 66),
        ("state_quarters", 56),
        ("national_park_quarters", 55),
        ("basic_half_dollars", 61),
        ("eisenhower_dollars", 7),
        ("susan_b_anthony_dollars", 4),
        ("native_american_dollars", 25),
        ("presidential_dollars", 40),
        ("indian_head_cents", 51),
        ("liberty_head_nickels", 31),
        ("buffalo_nickels", 23),
        ("barber_dimes", 25),
        ("mercury_dimes", 27),
        ("barber_quarters", 25),
        ("standing_liberty_quarters", 15),
        ("barber_half_dollars", 24),
        ("walking_liberty_half_dollars", 25),
        ("franklin_half_dollars", 16),
        ("morgan_dollars", 28),
        ("american_eagle_silver_dollars", 40),
        ("first_spouse_gold_coins", 42),
        ("american_innovation_dollars", 29),
        ("american_women_quarters", 15),
        ("small_cents", 291),
        ("large_cents", 68),
        ("all_nickels", 308),
        ("half_dimes", 96),
        ("silver_dimes", 247),
        ("early_dimes", 114),
        ("clad_quarters", 332),
        ("early_quarters", 248),
        ("small_dollars", 186),
        ("silver_half_dollars", 185),
        ("trimes", 49),
        ("twenty_cents", 7),
        ("west_point", 21),
        ("early_dollars", 24),
        ("early_half_dollars", 158),
        ("cartwheels", 195),
        ("half_cents", 44),
        ("coin_sets", 137),
        ("half_dollars", 0),
        ("roosevelt_dimes", 0),
        ("washington_quarters", 65),
    ];
    let registry = registry()?;
    assert_eq!(expected.len(), registry.len());
    for (type_id, count) in expected {
        let template = registry.lookup(type_id)?;
        let instance = CollectionInstance::create(&template, type_id, &IndexMap::new(), AS_OF)?;
        assert_eq!((type_id, instance.store.len()), (type_id, count));
        assert_eq!(instance.schema_version, template.latest_version());
    }
    Ok(())
}

/// Test the Lincoln cent type splits and commemorative years
#[test]
fn test_pennies_irregular_years() -> Result<()> {
    let template = template("pennies")?;
    let instance = CollectionInstance::create(&template, "Cents", &IndexMap::new(), AS_OF)?;
    let keys = keys(&instance);

    assert_eq!(keys[0], SlotKey::new("1909", ""));
    assert_eq!(keys[1], SlotKey::new("1909", "VDB"));
    assert!(keys.contains(&SlotKey::new("1943", "Steel Cent")));
    assert!(!keys.contains(&SlotKey::new("1943", "")));
    assert!(keys.contains(&SlotKey::new("1982 Zinc Small Date", "")));
    assert!(keys.contains(&SlotKey::new("Presidency", "2009")));
    assert!(!keys.contains(&SlotKey::new("2009", "")));
    assert!(keys.contains(&SlotKey::new("2017", "P")));
    assert_eq!(keys.last(), Some(&SlotKey::new("2024", "")));

    let steel = instance.store.get(&SlotKey::new("1943", "Steel Cent"));
    assert_eq!(steel.and_then(|s| s.image.as_deref()), Some("a1943o"));
    Ok(())
}

/// Test that Denver and San Francisco gaps follow the mint records
#[test]
fn test_pennies_branch_mint_gaps() -> Result<()> {
    let template = template("pennies")?;
    let raw = with(&[("include_p", false), ("include_d", true), ("include_s", true)]);
    let instance = CollectionInstance::create(&template, "Branch", &raw, AS_OF)?;
    let keys = keys(&instance);

    assert!(keys.contains(&SlotKey::new("1911", "D")));
    assert!(!keys.contains(&SlotKey::new("1921", "D")));
    assert!(!keys.contains(&SlotKey::new("1966", "D")));
    assert!(keys.contains(&SlotKey::new("1974", "S")));
    assert!(!keys.contains(&SlotKey::new("1975", "S")));
    assert!(keys.contains(&SlotKey::new("1909", "S VDB")));
    assert!(keys.contains(&SlotKey::new("1943", "D Steel Cent")));
    assert!(keys.contains(&SlotKey::new("Early Childhood", "2009 D")));
    Ok(())
}

/// Test nickels with mint marks shown
#[test]
fn test_nickels_mint_marks() -> Result<()> {
    let template = template("nickels")?;
    let raw = with(&[("show_mint_marks", true), ("include_d", true), ("include_s", true)]);
    let instance = CollectionInstance::create(&template, "Nickels", &raw, AS_OF)?;
    let keys = keys(&instance);

    assert_eq!(keys[0], SlotKey::new("1938", ""));
    assert!(keys.contains(&SlotKey::new("1938", "S")));
    assert!(!keys.contains(&SlotKey::new("1969", "")));
    assert!(!keys.contains(&SlotKey::new("1966", "D")));
    assert!(keys.contains(&SlotKey::new("1985", "P")));
    assert!(keys.contains(&SlotKey::new("Keelboat", "D")));
    assert!(!keys.contains(&SlotKey::new("2004", "P")));
    Ok(())
}

/// Test the Kennedy half bicentennial and silver issues
#[test]
fn test_half_dollars_bicentennial_and_silver() -> Result<()> {
    let template = template("half_dollars")?;
    let raw = with(&[("include_clad", true)]);
    let clad = CollectionInstance::create(&template, "Halves", &raw, AS_OF)?;
    let keys = keys(&clad);
    assert_eq!(keys[0], SlotKey::new("1971", ""));
    assert!(keys.contains(&SlotKey::new("1776-1976", "")));
    assert!(!keys.contains(&SlotKey::new("1976", "")));
    assert!(!keys.contains(&SlotKey::new("1975", "")));

    let raw = with(&[("include_silver", true), ("include_clad", false), ("include_proofs", true)]);
    let silver = CollectionInstance::create(&template, "Silver", &raw, AS_OF)?;
    let keys: Vec<SlotKey> = silver.slots().map(|s| s.key.clone()).collect();
    assert_eq!(
        keys[..5],
        [
            SlotKey::new("1964", "Silver"),
            SlotKey::new("1964", "Silver Proof"),
            SlotKey::new("1965", "40% Silver"),
            SlotKey::new("1965", "SMS 40% Silver"),
            SlotKey::new("1966", "40% Silver"),
        ]
    );
    assert!(keys.contains(&SlotKey::new("1776-1976", "S 40% Silver Proof")));
    assert!(keys.contains(&SlotKey::new("1992", "S Silver Proof")));
    assert!(!keys.contains(&SlotKey::new("1991", "S Silver Proof")));
    Ok(())
}

/// Test Morgan dollar varieties and the 1905 to 1920 gap
#[test]
fn test_morgan_dollars_varieties() -> Result<()> {
    let template = template("morgan_dollars")?;
    let raw = with(&[
        ("show_mint_marks", true),
        ("include_d", true),
        ("include_s", true),
        ("include_o", true),
        ("include_cc", true),
    ]);
    let instance = CollectionInstance::create(&template, "Morgans", &raw, AS_OF)?;
    let keys = keys(&instance);

    assert_eq!(
        keys[..4],
        [
            SlotKey::new("1878 8 Feathers", ""),
            SlotKey::new("1878 7 Feathers", ""),
            SlotKey::new("1878", "CC"),
            SlotKey::new("1878", "S"),
        ]
    );
    assert!(!keys.contains(&SlotKey::new("1878", "")));
    assert!(!keys.contains(&SlotKey::new("1895", "")));
    assert!(keys.contains(&SlotKey::new("1895", "O")));
    assert!(!keys.contains(&SlotKey::new("1887", "CC")));
    assert!(!keys.iter().any(|k| k.identifier == "1910"));
    assert!(keys.contains(&SlotKey::new("1921", "D")));
    Ok(())
}

/// Test that coin sets carry per-set images
#[test]
fn test_coin_set_images() -> Result<()> {
    let template = template("coin_sets")?;
    let raw = with(&[("include_silver_proof_sets", true)]);
    let instance = CollectionInstance::create(&template, "Sets", &raw, AS_OF)?;

    let mint_set = instance.store.get(&SlotKey::new("1947", "\nMint Set"));
    assert_eq!(mint_set.and_then(|s| s.image.as_deref()), Some("a24rj"));
    let silver = instance.store.get(&SlotKey::new("1950", "Silver \nProof Set"));
    assert_eq!(silver.and_then(|s| s.image.as_deref()), Some("a24rh"));
    assert!(instance.store.contains(&SlotKey::new("1965", "\nProof Set")));
    assert!(!instance.store.contains(&SlotKey::new("1950", "\nMint Set")));
    assert!(!instance.store.contains(&SlotKey::new("1970", "Silver \nProof Set")));
    assert!(!instance.store.contains(&SlotKey::new("1947", "Mint Set")));
    Ok(())
}

/// Test that half dollars start empty until clad or silver coins are chosen
#[test]
fn test_half_dollars_default_to_no_metal() -> Result<()> {
    let template = template("half_dollars")?;
    let defaults = template.options.defaults();
    assert_eq!(defaults.get("include_clad"), Some(&OptionValue::Bool(false)));
    assert_eq!(defaults.get("include_silver"), Some(&OptionValue::Bool(false)));

    let instance = CollectionInstance::create(&template, "Halves", &IndexMap::new(), AS_OF)?;
    assert!(instance.store.is_empty());
    Ok(())
}

/// Test that the 2024 honorees keep their catalogued spellings
#[test]
fn test_women_quarters_2024_identifiers() -> Result<()> {
    let template = template("american_women_quarters")?;
    let instance = CollectionInstance::create(&template, "Women", &IndexMap::new(), AS_OF)?;
    let identifiers: Vec<&str> = instance.slots().map(|s| s.key.identifier.as_str()).collect();

    assert_eq!(
        identifiers[identifiers.len() - 5..],
        [
            "Rev. Dr. Pauli Muarray 2024",
            "Patsy Takemoto 2024",
            "Dr. Mary Edwards Walker 2024",
            "Celia Cruz 2024",
            "Zitkala Sa 2024",
        ]
    );
    let additions: Vec<&DeltaAddition> = template
        .deltas
        .iter()
        .filter(|d| d.version == 21)
        .flat_map(|d| d.adds.iter())
        .collect();
    assert!(additions.contains(&&DeltaAddition::Identifier("Zitkala Sa 2024".to_string())));
    Ok(())
}

/// Test that Native American dollars take per-year reverse images
#[test]
fn test_native_american_images_by_year() -> Result<()> {
    let template = template("native_american_dollars")?;
    let instance = CollectionInstance::create(&template, "Natives", &IndexMap::new(), AS_OF)?;
    let image = |year: &str| {
        instance
            .store
            .get(&SlotKey::new(year, ""))
            .and_then(|s| s.image.clone())
    };

    assert_eq!(image("2008").as_deref(), Some("obv_sacagawea_unc"));
    assert_eq!(image("2009").as_deref(), Some("native_2009_unc"));
    assert_eq!(image("2010").as_deref(), Some("native_2010_unc"));
    Ok(())
}

/// Test the Eisenhower bicentennial slot standing in for 1975 and 1976
#[test]
fn test_eisenhower_bicentennial() -> Result<()> {
    let template = template("eisenhower_dollars")?;
    let instance = CollectionInstance::create(&template, "Ikes", &IndexMap::new(), AS_OF)?;
    assert_eq!(
        keys(&instance),
        ["1971", "1972", "1973", "1974", "1776-1976", "1977", "1978"]
            .map(|identifier| SlotKey::new(identifier, ""))
    );
    Ok(())
}

/// Test that overlapping designs keep distinct keys in the type sets
#[test]
fn test_type_set_overlap_years_are_relabelled() -> Result<()> {
    let cents = template("small_cents")?;
    let all = cents.all_enabled_options()?;
    let instance = CollectionInstance::create(&cents, "Cents", all.as_raw(), AS_OF)?;
    let keys = keys(&instance);
    let start = keys
        .iter()
        .position(|k| k == &SlotKey::new("1909", "Indian"))
        .expect("1909 Indian cent is listed");
    assert_eq!(
        keys[start..start + 4],
        [
            SlotKey::new("1909", "Indian"),
            SlotKey::new("1909", "Indian S"),
            SlotKey::new("1909", ""),
            SlotKey::new("1909", "VDB"),
        ]
    );

    let quarters = template("early_quarters")?;
    let instance = CollectionInstance::create(&quarters, "Quarters", &IndexMap::new(), AS_OF)?;
    let keys = self::keys(&instance);
    let start = keys
        .iter()
        .position(|k| k == &SlotKey::new("1916", "Barber"))
        .expect("1916 Barber quarter is listed");
    assert_eq!(
        keys[start..start + 4],
        [
            SlotKey::new("1916", "Barber"),
            SlotKey::new("1916", ""),
            SlotKey::new("1917 Type I", ""),
            SlotKey::new("1917 Type II", ""),
        ]
    );
    Ok(())
}

/// Test branch mint oddities of the early silver dollar and half dollar sets
#[test]
fn test_early_silver_mint_labels() -> Result<()> {
    let dollars = template("early_dollars")?;
    let raw = with(&[("include_bust", true), ("include_seated", true)]);
    let instance = CollectionInstance::create(&dollars, "Dollars", &raw, AS_OF)?;
    assert!(instance.store.contains(&SlotKey::new("1873", "Seated S")));
    assert!(instance.store.contains(&SlotKey::new("1873", "S")));
    assert!(instance.store.contains(&SlotKey::new("1804", "Draped Bust Rare")));
    assert_eq!(
        instance.store.get(&SlotKey::new("1836", "Gobrecht")).and_then(|s| s.image.as_deref()),
        Some("anostarsdime")
    );

    let halves = template("early_half_dollars")?;
    let instance = CollectionInstance::create(&halves, "Halves", &IndexMap::new(), AS_OF)?;
    assert!(instance.store.contains(&SlotKey::new("1838", "O\nCapped Bust")));
    assert!(instance.store.contains(&SlotKey::new("1873", "CC\nMotto&Arrows")));
    assert!(!instance.store.contains(&SlotKey::new("1816", "\nCapped Bust")));
    Ok(())
}

/// A collection saved at `version`, rebuilt from the later catalog history
///
/// Years named by later deltas are left out by creating the collection the
/// year before the first of them. Identifiers and keys named by later deltas
/// are dropped and later fix-ups are undone newest first.
fn saved_at(
    template: &CollectionTemplate,
    version: u32,
    raw: &IndexMap<String, OptionValue>,
) -> Result<CollectionInstance> {
    let later: Vec<_> = template.deltas.iter().filter(|d| d.version > version).collect();
    let created_in = later
        .iter()
        .flat_map(|d| d.adds.iter())
        .find_map(|add| match add {
            DeltaAddition::Year(year) => Some(year - 1),
            _ => None,
        })
        .unwrap_or(AS_OF);

    let old = truncated(template, version);
    let mut record = CollectionInstance::create(&old, "Saved", raw, created_in)?.to_persisted()?;

    let added_later = |row: &SlotRecord| {
        later.iter().flat_map(|d| d.adds.iter()).any(|add| match add {
            DeltaAddition::Identifier(identifier) => &row.identifier == identifier,
            DeltaAddition::Key(key) => row.identifier == key.identifier && row.mint == key.mint,
            DeltaAddition::Year(_) => false,
        })
    };
    record.rows.retain(|row| !added_later(row));

    for fixup in later.iter().rev().flat_map(|d| d.fixups.iter().rev()) {
        for row in &mut record.rows {
            match fixup {
                TextFixup::Identifier { from, to } if &row.identifier == to => {
                    row.identifier.clone_from(from);
                }
                TextFixup::Mint { from, to } if &row.mint == to => row.mint.clone_from(from),
                TextFixup::Key { from, to } if row.identifier == to.identifier && row.mint == to.mint => {
                    row.identifier.clone_from(&from.identifier);
                    row.mint.clone_from(&from.mint);
                }
                _ => {}
            }
        }
    }
    for (order, row) in record.rows.iter_mut().enumerate() {
        row.order = order;
    }
    record.schema_version = version;
    Ok(CollectionInstance::from_persisted(template, record)?)
}

/// Test that every built-in type upgrades from each catalog revision to the
/// collection a fresh creation produces
#[test]
fn test_every_type_upgrade_matches_fresh_creation() -> Result<()> {
    let registry = registry()?;
    for template in registry.types() {
        let all = template.all_enabled_options()?.as_raw().clone();
        for raw in [IndexMap::new(), all] {
            let fresh = CollectionInstance::create(template, "Fresh", &raw, AS_OF)?;
            let versions = std::iter::once(template.base_version)
                .chain(template.deltas.iter().map(|d| d.version));
            for version in versions {
                let mut instance = saved_at(template, version, &raw)?;
                MigrationEngine::new(template).migrate(&mut instance, AS_OF)?;
                assert_eq!(
                    (template.type_id.as_str(), version, keys(&instance)),
                    (template.type_id.as_str(), version, keys(&fresh))
                );
                assert_eq!(instance.schema_version, template.latest_version());
            }
        }
    }
    Ok(())
}

/// Test that old Lincoln cent collections upgrade to a fresh collection
#[test]
fn test_pennies_upgrade_matches_fresh_creation() -> Result<()> {
    let template = template("pennies")?;
    let raw = template.all_enabled_options()?.as_raw().clone();

    for (version, created_in) in [(3, 2012), (9, 2017), (14, 2020)] {
        let old = truncated(&template, version);
        let mut instance = CollectionInstance::create(&old, "Cents", &raw, created_in)?;
        assert_eq!(instance.schema_version, version);

        let first = instance.store.keys().next().cloned();
        if let Some(key) = &first {
            instance
                .store
                .update_user_state(key, |state| {
                    state.in_collection = true;
                    state.grade = "MS-63".to_string();
                })
                .map_err(CollectionError::from)?;
        }

        MigrationEngine::new(&template).migrate(&mut instance, AS_OF)?;
        let fresh = CollectionInstance::create(&template, "Cents", &raw, AS_OF)?;
        assert_eq!(keys(&instance), keys(&fresh));
        assert_eq!(instance.schema_version, fresh.schema_version);

        let kept = first.and_then(|key| instance.store.get(&key).cloned());
        assert_eq!(kept.map(|s| (s.state.in_collection, s.state.grade)), Some((true, "MS-63".to_string())));
    }
    Ok(())
}

/// Test nickel upgrades with branch mints shown
#[test]
fn test_nickels_upgrade_matches_fresh_creation() -> Result<()> {
    let template = template("nickels")?;
    let raw = with(&[("show_mint_marks", true), ("include_d", true)]);
    let old = truncated(&template, 5);
    let mut instance = CollectionInstance::create(&old, "Nickels", &raw, 2014)?;

    let report = MigrationEngine::new(&template).migrate(&mut instance, AS_OF)?;
    assert_eq!(report.added_count(), 10 * 2);

    let fresh = CollectionInstance::create(&template, "Nickels", &raw, AS_OF)?;
    assert_eq!(keys(&instance), keys(&fresh));
    Ok(())
}

/// Test that park collections gain later parks in place
#[test]
fn test_park_quarters_upgrade_inserts_by_identifier() -> Result<()> {
    let template = template("national_park_quarters")?;
    let raw = with(&[("show_mint_marks", true), ("include_d", true)]);
    let current = CollectionInstance::create(&template, "Parks", &raw, AS_OF)?;
    assert_eq!(current.store.len(), 55 * 2);

    // Catalogs before revision 3 only listed the 2010 and 2011 parks
    let mut record = current.to_persisted()?;
    record.schema_version = 2;
    record.rows.truncate(10 * 2);
    record.rows[3].in_collection = true;
    let mut instance = CollectionInstance::from_persisted(&template, record)?;

    let report = MigrationEngine::new(&template).migrate(&mut instance, AS_OF)?;
    assert_eq!(report.added_count(), 45 * 2);
    assert_eq!(report.renamed_count(), 0);
    assert_eq!(keys(&instance), keys(&current));
    assert_eq!(instance.store.collected_count(), 1);
    assert!(instance.store.get_index(3).is_some_and(|s| s.state.in_collection));
    Ok(())
}

/// Test that curly apostrophes from old catalogs are straightened
#[test]
fn test_park_quarters_apostrophe_fixup() -> Result<()> {
    let template = template("national_park_quarters")?;
    let current = CollectionInstance::create(&template, "Parks", &IndexMap::new(), AS_OF)?;

    let mut record = current.to_persisted()?;
    record.schema_version = 10;
    record.rows.truncate(40);
    for row in &mut record.rows {
        row.identifier = row.identifier.replace('\'', "\u{2019}");
    }
    let mut instance = CollectionInstance::from_persisted(&template, record)?;
    assert!(instance.store.contains(&SlotKey::new("Perry\u{2019}s Victory", "")));

    let report = MigrationEngine::new(&template).migrate(&mut instance, AS_OF)?;
    assert_eq!(report.renamed_count(), 2);
    assert_eq!(report.added_count(), 15);
    assert_eq!(keys(&instance), keys(&current));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Test that half dollar upgrades match fresh creation for any option mix
    #[test]
    fn prop_half_dollar_upgrade_matches_fresh(
        flags in proptest::collection::vec(any::<bool>(), 7),
        version in prop_oneof![Just(3_u32), Just(8), Just(13), Just(19)],
    ) {
        let template = template("half_dollars").expect("registry builds");
        let names = [
            "include_p", "include_d", "include_satin", "include_proofs",
            "include_old", "include_clad", "include_silver",
        ];
        let raw: IndexMap<String, OptionValue> = names
            .iter()
            .zip(&flags)
            .map(|(name, flag)| ((*name).to_string(), OptionValue::Bool(*flag)))
            .collect();

        let old = truncated(&template, version);
        let created_in = old.newest_delta_year().unwrap_or(2012);
        let mut instance = CollectionInstance::create(&old, "Halves", &raw, created_in)
            .expect("old collection is created");
        MigrationEngine::new(&template)
            .migrate(&mut instance, AS_OF)
            .expect("upgrade succeeds");
        let fresh = CollectionInstance::create(&template, "Halves", &raw, AS_OF)
            .expect("fresh collection is created");

        prop_assert_eq!(keys(&instance), keys(&fresh));
        prop_assert_eq!(instance.schema_version, 21);
    }
}
