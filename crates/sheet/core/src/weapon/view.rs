use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::character::Character;
use crate::formula::{self, FormulaValue, Rounding, VariableSource};
use crate::improvement::{Improvement, ImprovementKind, ImprovementQuery, aggregate};

use super::damage::{AvailSuffix, AvailabilityValue, DAMAGE_PHYSICAL, DamageCode, DamageParts};
use super::{
    UNARMED_ATTACK, UNARMED_COMBAT, UNARMED_SMASHING_BLOW, Weapon, WeaponAccessory, WeaponType,
};

const CHILDREN_AVAIL: &str = "{Children Avail}";
const WEAPON_COST: &str = "WeaponCost";
const FLECHETTE: &str = "(f)";

/// Read-only derived values of one weapon.
#[derive(Clone, Copy)]
pub struct WeaponView<'c> {
    character: &'c Character,
    weapon: &'c Weapon,
}

impl<'c> WeaponView<'c> {
    pub(crate) fn new(character: &'c Character, weapon: &'c Weapon) -> Self {
        Self { character, weapon }
    }

    pub fn weapon(&self) -> &'c Weapon {
        self.weapon
    }

    pub fn name(&self) -> &'c str {
        self.weapon.name()
    }

    /// Views of the underbarrel weapons.
    pub fn underbarrel(&self) -> impl Iterator<Item = WeaponView<'c>> + 'c {
        let character = self.character;
        self.weapon
            .underbarrel()
            .iter()
            .map(move |child| WeaponView::new(character, child))
    }

    fn records(&self) -> impl Iterator<Item = &'c Improvement> + 'c {
        self.character.improvements().iter()
    }

    /// Sum of every enabled record of `kind`, regardless of target.
    fn total_of(&self, kind: ImprovementKind) -> i32 {
        let any = |_: &str| true;
        let query = ImprovementQuery::value(kind, "", self.character.phase()).matching(&any);
        aggregate(self.records(), &query)
    }

    /// Skill used to wield the weapon.
    pub fn skill(&self) -> &'c str {
        let template = self.weapon.template();
        if !template.use_skill.is_empty() {
            return &template.use_skill;
        }
        match template.category.as_str() {
            "Unarmed" => UNARMED_COMBAT,
            category => category,
        }
    }

    /// Whether unarmed DV/AP improvements reach this weapon.
    fn takes_unarmed_bonuses(&self) -> bool {
        self.name() == UNARMED_ATTACK
            || (self.skill() == UNARMED_COMBAT
                && self.character.config().unarmed_improvements_apply_to_weapons)
    }

    /// STR used by the weapon; throwing weapons add `ThrowStr`.
    pub fn strength(&self) -> i32 {
        let strength = self.character.attribute_total("STR").unwrap_or(0);
        if self.weapon.template().is_throwing() {
            strength.saturating_add(self.total_of(ImprovementKind::ThrowStr))
        } else {
            strength
        }
    }

    fn flechette_weapon(&self) -> bool {
        self.weapon.template().damage.contains(FLECHETTE)
    }

    // ========================================================================
    // Damage
    // ========================================================================

    /// `WeaponCategoryDv` bonuses on the category, skill or cyberware name.
    fn category_dv(&self) -> i32 {
        let template = self.weapon.template();
        let category = match template.category.as_str() {
            "Unarmed" => UNARMED_COMBAT,
            category => category,
        };
        let use_skill = template.use_skill.as_str();
        let phase = self.character.phase();
        self.records()
            .filter(|imp| imp.kind == ImprovementKind::WeaponCategoryDv && imp.applies(phase))
            .map(|imp| {
                let cyberware = format!("Cyberware {}", imp.improved_name) == category;
                let mut bonus = 0i32;
                if imp.improved_name == category || cyberware {
                    bonus = bonus.saturating_add(imp.value);
                }
                if !use_skill.is_empty() && (imp.improved_name == use_skill || cyberware) {
                    bonus = bonus.saturating_add(imp.value);
                }
                bonus
            })
            .fold(0, i32::saturating_add)
    }

    /// Final damage code, e.g. `"7P"` for `"(STR+2)P"` at STR 5.
    ///
    /// Non-numeric damage (`"Grenade"`, `"As Drug/Toxin"`) comes back as the
    /// template text unchanged.
    pub fn total_damage(&self) -> DamageCode {
        let template = self.weapon.template();
        let parts = DamageParts::split(&template.damage);
        let mut expression = parts.expression;
        let mut damage_type = parts.damage_type;
        let mut extra = parts.extra;
        let mut replaced = false;

        let mut improve = self.category_dv();
        if self.name() == UNARMED_ATTACK {
            let phase = self.character.phase();
            if self
                .records()
                .any(|imp| imp.kind == ImprovementKind::UnarmedDvPhysical && imp.applies(phase))
            {
                damage_type = DAMAGE_PHYSICAL.to_string();
            }
            improve = improve.saturating_add(self.total_of(ImprovementKind::UnarmedDv));
        } else if self.takes_unarmed_bonuses() {
            improve = improve.saturating_add(self.total_of(ImprovementKind::UnarmedDv));
        }

        for accessory in self.weapon.installed_accessories() {
            if !accessory.damage_type.is_empty() {
                damage_type.clear();
                extra = accessory.damage_type.clone();
            }
            if !accessory.damage.is_empty() {
                expression = format!("{expression} + {}", accessory.damage);
            }
            if !accessory.damage_replacement.is_empty() {
                replaced = true;
                expression = accessory.damage_replacement.clone();
            }
        }
        if improve != 0 {
            expression = format!("{expression} + {improve}");
        }

        if let Some(ammo) = self.weapon.ammo() {
            if !(ammo.is_flechette() && self.flechette_weapon()) {
                if !ammo.damage_type.is_empty() {
                    damage_type.clear();
                    extra = ammo.damage_type.clone();
                }
                if !ammo.damage.is_empty() {
                    expression = format!("{expression} + {}", ammo.damage);
                }
                if !ammo.damage_replacement.is_empty() {
                    replaced = true;
                    expression = ammo.damage_replacement.clone();
                }
            }
        }

        if replaced {
            let parts = DamageParts::split(&expression);
            expression = parts.expression;
            if !parts.damage_type.is_empty() {
                damage_type = parts.damage_type;
            }
            if !parts.extra.is_empty() {
                extra = parts.extra;
            }
        }

        let lethal = if self.character.config().more_lethal_gameplay {
            2
        } else {
            0
        };
        match formula::evaluate_rounded(&expression, self, Rounding::Ceiling) {
            Ok(value) => {
                let mut damage = value.saturating_add(Decimal::from(lethal));
                if self.name() == UNARMED_SMASHING_BLOW {
                    damage = damage.saturating_mul(Decimal::TWO);
                }
                DamageCode {
                    value: FormulaValue::Number(damage),
                    damage_type,
                    extra,
                }
            }
            Err(err) => {
                tracing::debug!(weapon = self.name(), error = %err, "damage kept as text");
                DamageCode {
                    value: FormulaValue::Raw(template.damage.clone()),
                    damage_type: String::new(),
                    extra: String::new(),
                }
            }
        }
    }

    pub fn display_damage(&self) -> String {
        self.total_damage().to_string()
    }

    // ========================================================================
    // Armor penetration
    // ========================================================================

    /// `"-"` for 0, `"+n"` for positive values, `"-n"` otherwise. Non-numeric
    /// AP such as `"-half"` is returned as written.
    pub fn total_ap(&self) -> String {
        let mut ap = self.weapon.template().ap.clone();
        let mut bonus: i32 = 0;
        let flechette_weapon = self.flechette_weapon();

        if let Some(ammo) = self.weapon.ammo() {
            if !(ammo.is_flechette() && flechette_weapon) {
                if flechette_weapon && ammo.name.contains("Flechette") {
                    bonus = bonus.saturating_sub(5);
                } else {
                    if !ammo.ap_replacement.is_empty() {
                        ap = ammo.ap_replacement.clone();
                    }
                    bonus = bonus.saturating_add(ammo.ap);
                }
            }
        }
        if self.takes_unarmed_bonuses() {
            bonus = bonus.saturating_add(self.total_of(ImprovementKind::UnarmedAp));
        }

        for accessory in self.weapon.installed_accessories() {
            if accessory.damage_type.contains(FLECHETTE) && flechette_weapon {
                continue;
            }
            if flechette_weapon && accessory.name.contains("Flechette") {
                bonus = bonus.saturating_sub(5);
            } else {
                if !accessory.ap_replacement.is_empty() {
                    ap = accessory.ap_replacement.clone();
                }
                bonus = bonus.saturating_add(accessory.ap);
            }
        }

        let expression = match ap.trim() {
            "-" | "" => "0",
            other => other,
        };
        let Ok(value) = formula::evaluate_rounded(expression, self, Rounding::Nearest) else {
            return ap;
        };
        match value.to_i32().map(|n| n.saturating_add(bonus)) {
            Some(0) => "-".to_string(),
            Some(n) if n > 0 => format!("+{n}"),
            Some(n) => n.to_string(),
            None => ap,
        }
    }

    // ========================================================================
    // Accuracy, concealability, reach
    // ========================================================================

    pub fn total_accuracy(&self) -> i32 {
        let base = formula::evaluate_rounded(&self.weapon.template().accuracy, self, Rounding::Nearest)
            .ok()
            .and_then(|value| value.to_i32())
            .unwrap_or(0);

        let accessories = self.weapon.accessories();
        let has_smartgun = accessories.iter().any(|acc| acc.name.starts_with("Smartgun"));
        let from_accessories = accessories
            .iter()
            .filter(|acc| {
                !(has_smartgun && matches!(acc.name.as_str(), "Laser Sight" | "Holographic Sight"))
            })
            .map(|acc| acc.accuracy)
            .fold(0, i32::saturating_add);

        let name = self.name();
        let lowercase = name.to_lowercase();
        let phase = self.character.phase();
        let from_improvements = self
            .records()
            .filter(|imp| imp.kind == ImprovementKind::WeaponAccuracy && imp.applies(phase))
            .filter(|imp| {
                imp.improved_name.is_empty()
                    || imp.improved_name == name
                    || imp.improved_name.strip_prefix("[contains]").is_some_and(|needle| {
                        lowercase.contains(&needle.to_lowercase())
                    })
            })
            .map(|imp| imp.value)
            .fold(0, i32::saturating_add);

        base.saturating_add(from_accessories)
            .saturating_add(from_improvements)
    }

    pub fn total_concealability(&self) -> i32 {
        self.weapon
            .installed_accessories()
            .map(|acc| acc.concealability)
            .fold(self.weapon.template().concealability, i32::saturating_add)
            .saturating_add(self.total_of(ImprovementKind::Concealability))
    }

    /// `"+n"` when non-negative.
    pub fn display_concealability(&self) -> String {
        let concealability = self.total_concealability();
        if concealability >= 0 {
            format!("+{concealability}")
        } else {
            concealability.to_string()
        }
    }

    pub fn total_reach(&self) -> i32 {
        let mut reach = self.weapon.template().reach;
        if self.weapon.template().weapon_type == WeaponType::Melee {
            reach = reach.saturating_add(self.total_of(ImprovementKind::Reach));
        }
        if self.name() == UNARMED_ATTACK {
            reach = reach.saturating_add(self.total_of(ImprovementKind::UnarmedReach));
        }
        reach
    }

    // ========================================================================
    // Cost
    // ========================================================================

    /// Price of the weapon itself, before accessories.
    ///
    /// Cyberware and gear weapons are paid for through their parent item.
    pub fn own_cost(&self) -> Decimal {
        let template = self.weapon.template();
        if template.cyberware || template.category == "Gear" {
            return Decimal::ZERO;
        }
        self.catalog_cost()
    }

    /// Catalog price with the discount applied, ignoring who paid for it.
    fn catalog_cost(&self) -> Decimal {
        let template = self.weapon.template();
        let expression = template.cost.trim_start_matches('+');
        if expression.trim().is_empty() {
            return Decimal::ZERO;
        }
        let cost = formula::evaluate_rounded(expression, self, Rounding::Exact).unwrap_or_else(|err| {
            tracing::debug!(weapon = self.name(), error = %err, "cost treated as 0");
            Decimal::ZERO
        });
        if template.discount_cost {
            cost.saturating_mul(Decimal::new(9, 1))
        } else {
            cost
        }
    }

    pub fn accessory_cost(&self, accessory: &WeaponAccessory) -> Decimal {
        if accessory.cost.trim().is_empty() {
            return Decimal::ZERO;
        }
        let weapon_cost = self.catalog_cost();
        let lookup = |name: &str| {
            if name == WEAPON_COST {
                Some(weapon_cost)
            } else {
                self.lookup(name)
            }
        };
        formula::evaluate_rounded(&accessory.cost, &formula::LookupFn(lookup), Rounding::Exact)
            .unwrap_or(Decimal::ZERO)
    }

    /// Own cost, plus accessories not already included, plus underbarrels.
    pub fn total_cost(&self) -> Decimal {
        let accessories = self
            .weapon
            .accessories()
            .iter()
            .filter(|acc| !acc.included_in_weapon)
            .map(|acc| self.accessory_cost(acc));
        let children = self.underbarrel().map(|child| child.total_cost());
        accessories
            .chain(children)
            .fold(self.own_cost(), Decimal::saturating_add)
    }

    // ========================================================================
    // Availability
    // ========================================================================

    pub fn total_avail(&self) -> AvailabilityValue {
        let mut raw = self.weapon.template().avail.trim().to_string();
        let mut total: i32 = 0;
        let mut suffix = None;
        let mut add_to_parent = false;
        let mut check_underbarrel = true;

        if !raw.is_empty() {
            if let Some(last) = raw.chars().last().and_then(AvailSuffix::from_char) {
                suffix = Some(last);
                raw.pop();
            }
            add_to_parent = raw.starts_with(['+', '-']);
            let mut expression = raw.trim_start_matches('+').to_string();

            if expression.contains(CHILDREN_AVAIL) {
                check_underbarrel = false;
                let mut max_child = 0;
                for child in self.underbarrel() {
                    let avail = child.total_avail();
                    if avail.add_to_parent {
                        max_child = max_child.max(avail.value);
                    } else {
                        total = total.saturating_add(avail.value);
                    }
                    suffix = AvailSuffix::merge(suffix, avail.suffix);
                }
                expression = expression.replace(CHILDREN_AVAIL, &max_child.to_string());
            }

            total = total.saturating_add(self.evaluate_avail(&expression));
        }

        if check_underbarrel {
            for child in self.underbarrel() {
                let avail = child.total_avail();
                if avail.add_to_parent {
                    total = total.saturating_add(avail.value);
                }
                suffix = AvailSuffix::merge(suffix, avail.suffix);
            }
        }

        for accessory in self.weapon.accessories() {
            if accessory.included_in_weapon {
                continue;
            }
            let avail = self.accessory_avail(accessory);
            if avail.add_to_parent {
                total = total.saturating_add(avail.value);
            }
            suffix = AvailSuffix::merge(suffix, avail.suffix);
        }

        AvailabilityValue {
            value: total.max(0),
            suffix,
            add_to_parent,
        }
    }

    pub fn accessory_avail(&self, accessory: &WeaponAccessory) -> AvailabilityValue {
        let mut raw = accessory.avail.trim().to_string();
        let mut suffix = None;
        if let Some(last) = raw.chars().last().and_then(AvailSuffix::from_char) {
            suffix = Some(last);
            raw.pop();
        }
        let add_to_parent = raw.starts_with(['+', '-']);
        let value = if raw.is_empty() {
            0
        } else {
            self.evaluate_avail(raw.trim_start_matches('+'))
        };
        AvailabilityValue {
            value: value.max(0),
            suffix,
            add_to_parent,
        }
    }

    fn evaluate_avail(&self, expression: &str) -> i32 {
        formula::evaluate_rounded(expression, self, Rounding::Nearest)
            .ok()
            .and_then(|value| value.to_i32())
            .unwrap_or(0)
    }
}

/// Weapon formulas see the wielder's attributes, with STR adjusted for
/// throwing and `Physical`/`Missile` bound to the physical limit.
impl VariableSource for WeaponView<'_> {
    fn lookup(&self, name: &str) -> Option<Decimal> {
        match name {
            "STR" => Some(Decimal::from(self.strength())),
            "Physical" | "Missile" => Some(Decimal::from(self.character.physical_limit())),
            _ => self.character.lookup(name),
        }
    }
}

impl core::fmt::Debug for WeaponView<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WeaponView")
            .field("name", &self.name())
            .field("damage", &self.display_damage())
            .field("ap", &self.total_ap())
            .finish()
    }
}
