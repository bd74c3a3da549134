//! Physical body built from a body template

use serde::{Deserialize, Serialize};

use crate::content::BodyTemplate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    pub name: String,
    pub health: f32,
    pub max_health: f32,
    pub vital: bool,
}

impl BodyPart {
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub template: String,
    pub parts: Vec<BodyPart>,
}

impl Body {
    pub fn from_template(template: &BodyTemplate) -> Self {
        Self {
            template: template.id.clone(),
            parts: template
                .parts
                .iter()
                .map(|p| BodyPart {
                    name: p.name.clone(),
                    health: p.max_health,
                    max_health: p.max_health,
                    vital: p.vital,
                })
                .collect(),
        }
    }

    pub fn part(&self, name: &str) -> Option<&BodyPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Overall health as a fraction of the total
    pub fn health(&self) -> f32 {
        let max: f32 = self.parts.iter().map(|p| p.max_health).sum();
        if max <= 0.0 {
            return 1.0;
        }
        let current: f32 = self.parts.iter().map(|p| p.health.max(0.0)).sum();
        current / max
    }

    /// Dead once any vital part is destroyed
    pub fn is_dead(&self) -> bool {
        self.parts.iter().any(|p| p.vital && p.is_destroyed())
    }

    /// Damage a named part, returns false if there is no such part
    pub fn damage(&mut self, part: &str, amount: f32) -> bool {
        match self.parts.iter_mut().find(|p| p.name == part) {
            Some(p) => {
                p.health = (p.health - amount).max(0.0);
                true
            }
            None => false,
        }
    }

    /// Damage every vital part (starvation, disease)
    pub fn damage_vitals(&mut self, amount: f32) {
        for part in self.parts.iter_mut().filter(|p| p.vital) {
            part.health = (part.health - amount).max(0.0);
        }
    }
}
