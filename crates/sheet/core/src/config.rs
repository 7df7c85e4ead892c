/// House rules and cost constants that shape derived values.
///
/// Loaded from `options.toml` by the content crate; every field has a
/// rulebook default so partial files are accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetConfig {
    /// Karma multiplier per attribute point (`new rating × karma_attribute`).
    pub karma_attribute: i32,

    /// Karma per initiation/submersion grade.
    pub karma_initiation: i32,

    /// Flat karma added to every initiation/submersion grade.
    pub karma_initiation_flat: i32,

    /// Subtract the metatype minimum from karma costs as if every metatype
    /// started at a human baseline of 1.
    pub alternate_metatype_attribute_karma: bool,

    /// Spend karma before priority points when totalling attribute costs.
    pub reverse_attribute_priority_order: bool,

    /// Adds +2 to every weapon's damage value.
    pub more_lethal_gameplay: bool,

    /// Unarmed DV/AP improvements also apply to weapons using Unarmed Combat.
    pub unarmed_improvements_apply_to_weapons: bool,

    /// Whether the build method allows points in attribute `base`.
    pub build_method_has_skill_points: bool,

    /// Number of decimals shown for nuyen amounts.
    pub nuyen_decimals: u32,
}

impl SheetConfig {
    // ===== rulebook defaults =====
    pub const DEFAULT_KARMA_ATTRIBUTE: i32 = 5;
    pub const DEFAULT_KARMA_INITIATION: i32 = 3;
    pub const DEFAULT_KARMA_INITIATION_FLAT: i32 = 10;

    pub fn new() -> Self {
        Self {
            karma_attribute: Self::DEFAULT_KARMA_ATTRIBUTE,
            karma_initiation: Self::DEFAULT_KARMA_INITIATION,
            karma_initiation_flat: Self::DEFAULT_KARMA_INITIATION_FLAT,
            alternate_metatype_attribute_karma: false,
            reverse_attribute_priority_order: false,
            more_lethal_gameplay: false,
            unarmed_improvements_apply_to_weapons: false,
            build_method_has_skill_points: true,
            nuyen_decimals: 0,
        }
    }

    pub fn with_karma_attribute(mut self, karma_attribute: i32) -> Self {
        self.karma_attribute = karma_attribute;
        self
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self::new()
    }
}
