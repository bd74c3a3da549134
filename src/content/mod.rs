//! Content definitions - items, recipes, skills and body templates
//!
//! Definitions are looked up by string id. The registry is filled once at
//! startup (from JSON or the built-in defaults) and shared read-only with
//! every think worker behind an `Arc`.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// An amount of one item type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}

/// Item definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    /// Hunger removed when eaten; `None` for inedible items
    #[serde(default)]
    pub nutrition: Option<f32>,
}

impl ItemDef {
    pub fn is_edible(&self) -> bool {
        self.nutrition.is_some_and(|n| n > 0.0)
    }
}

/// A crafting recipe executed at a facility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDef {
    pub id: String,
    pub name: String,
    /// Facility kind that can execute this recipe (e.g. "oven")
    pub facility_kind: String,
    pub inputs: Vec<ItemStack>,
    pub outputs: Vec<ItemStack>,
    /// Work units needed once the inputs are committed
    pub work_ticks: u32,
    /// Skill that speeds up the work, if any
    #[serde(default)]
    pub skill: Option<String>,
}

/// Skill definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: String,
    pub name: String,
}

/// One part of a body template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyPartDef {
    pub name: String,
    pub max_health: f32,
    /// Losing a vital part kills the being
    #[serde(default)]
    pub vital: bool,
}

/// Body structure template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyTemplate {
    pub id: String,
    pub parts: Vec<BodyPartDef>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentFile {
    #[serde(default)]
    items: Vec<ItemDef>,
    #[serde(default)]
    recipes: Vec<RecipeDef>,
    #[serde(default)]
    skills: Vec<SkillDef>,
    #[serde(default)]
    bodies: Vec<BodyTemplate>,
}

/// Read-only lookup of every content definition
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    items: AHashMap<String, ItemDef>,
    recipes: AHashMap<String, RecipeDef>,
    skills: AHashMap<String, SkillDef>,
    bodies: AHashMap<String, BodyTemplate>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in village content (hardcoded defaults)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.add_item(ItemDef { id: "wheat".into(), name: "Wheat".into(), nutrition: None });
        registry.add_item(ItemDef { id: "flour".into(), name: "Flour".into(), nutrition: None });
        registry.add_item(ItemDef { id: "bread".into(), name: "Bread".into(), nutrition: Some(0.5) });
        registry.add_item(ItemDef { id: "turnip".into(), name: "Turnip".into(), nutrition: Some(0.25) });
        registry.add_item(ItemDef { id: "bone".into(), name: "Bone".into(), nutrition: None });

        registry.add_skill(SkillDef { id: "cooking".into(), name: "Cooking".into() });
        registry.add_skill(SkillDef { id: "farming".into(), name: "Farming".into() });

        registry.add_recipe(RecipeDef {
            id: "mill_flour".into(),
            name: "Mill Flour".into(),
            facility_kind: "quern".into(),
            inputs: vec![ItemStack::new("wheat", 2)],
            outputs: vec![ItemStack::new("flour", 1)],
            work_ticks: 20,
            skill: None,
        });
        registry.add_recipe(RecipeDef {
            id: "bake_bread".into(),
            name: "Bake Bread".into(),
            facility_kind: "oven".into(),
            inputs: vec![ItemStack::new("flour", 1)],
            outputs: vec![ItemStack::new("bread", 2)],
            work_ticks: 30,
            skill: Some("cooking".into()),
        });

        registry.add_body(BodyTemplate {
            id: "humanoid".into(),
            parts: vec![
                BodyPartDef { name: "head".into(), max_health: 1.0, vital: true },
                BodyPartDef { name: "torso".into(), max_health: 1.0, vital: true },
                BodyPartDef { name: "arms".into(), max_health: 1.0, vital: false },
                BodyPartDef { name: "legs".into(), max_health: 1.0, vital: false },
            ],
        });
        registry.add_body(BodyTemplate {
            id: "skeleton".into(),
            parts: vec![
                BodyPartDef { name: "skull".into(), max_health: 0.6, vital: true },
                BodyPartDef { name: "ribcage".into(), max_health: 0.8, vital: false },
            ],
        });

        registry
    }

    /// Parse definitions from a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: ContentFile = serde_json::from_str(content)?;

        let mut registry = Self::new();
        for item in file.items {
            registry.add_item(item);
        }
        for skill in file.skills {
            registry.add_skill(skill);
        }
        for recipe in file.recipes {
            registry.add_recipe(recipe);
        }
        for body in file.bodies {
            registry.add_body(body);
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Load definitions from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn add_item(&mut self, item: ItemDef) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn add_recipe(&mut self, recipe: RecipeDef) {
        self.recipes.insert(recipe.id.clone(), recipe);
    }

    pub fn add_skill(&mut self, skill: SkillDef) {
        self.skills.insert(skill.id.clone(), skill);
    }

    pub fn add_body(&mut self, body: BodyTemplate) {
        self.bodies.insert(body.id.clone(), body);
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn recipe(&self, id: &str) -> Option<&RecipeDef> {
        self.recipes.get(id)
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDef> {
        self.skills.get(id)
    }

    pub fn body(&self, id: &str) -> Option<&BodyTemplate> {
        self.bodies.get(id)
    }

    /// Nutrition of an item, `None` when unknown or inedible
    pub fn nutrition(&self, id: &str) -> Option<f32> {
        self.item(id).filter(|i| i.is_edible()).and_then(|i| i.nutrition)
    }

    pub fn is_edible(&self, id: &str) -> bool {
        self.nutrition(id).is_some()
    }

    /// Check that every cross-reference resolves
    pub fn validate(&self) -> Result<()> {
        for recipe in self.recipes.values() {
            for stack in recipe.inputs.iter().chain(recipe.outputs.iter()) {
                if !self.items.contains_key(&stack.item) {
                    return Err(SimError::Content(format!(
                        "recipe '{}' references unknown item '{}'",
                        recipe.id, stack.item
                    )));
                }
            }
            if let Some(skill) = &recipe.skill {
                if !self.skills.contains_key(skill) {
                    return Err(SimError::Content(format!(
                        "recipe '{}' references unknown skill '{}'",
                        recipe.id, skill
                    )));
                }
            }
            if recipe.work_ticks == 0 {
                return Err(SimError::Content(format!("recipe '{}' has zero work_ticks", recipe.id)));
            }
        }
        for body in self.bodies.values() {
            if !body.parts.iter().any(|p| p.vital) {
                return Err(SimError::Content(format!("body '{}' has no vital part", body.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let registry = ContentRegistry::with_defaults();
        assert!(registry.validate().is_ok());
        assert!(registry.is_edible("bread"));
        assert!(!registry.is_edible("wheat"));
        assert!(!registry.is_edible("unknown"));
        assert_eq!(registry.recipe("bake_bread").unwrap().facility_kind, "oven");
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{
            "items": [
                {"id": "grave_dirt", "name": "Grave Dirt"},
                {"id": "soul_cake", "name": "Soul Cake", "nutrition": 0.4}
            ],
            "skills": [{"id": "necromancy", "name": "Necromancy"}],
            "recipes": [{
                "id": "bake_soul_cake",
                "name": "Bake Soul Cake",
                "facility_kind": "altar",
                "inputs": [{"item": "grave_dirt", "quantity": 3}],
                "outputs": [{"item": "soul_cake", "quantity": 1}],
                "work_ticks": 12,
                "skill": "necromancy"
            }],
            "bodies": [{"id": "ghoul", "parts": [{"name": "heart", "max_health": 1.0, "vital": true}]}]
        }"#;

        let registry = ContentRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.nutrition("soul_cake"), Some(0.4));
        assert_eq!(registry.recipe("bake_soul_cake").unwrap().inputs[0].quantity, 3);
        assert!(registry.body("ghoul").is_some());
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let json = r#"{
            "recipes": [{
                "id": "broken",
                "name": "Broken",
                "facility_kind": "oven",
                "inputs": [{"item": "nothing", "quantity": 1}],
                "outputs": [],
                "work_ticks": 1
            }]
        }"#;

        let err = ContentRegistry::from_json_str(json).unwrap_err();
        assert!(matches!(err, SimError::Content(_)));
    }
}
