//! Contact classification
//!
//! The physics step reports every pair that started touching. Pairs involving
//! the player are sorted here into landings and enemy touches; anything else
//! against a platform (a side bump, a head hit from below) is flagged inactive
//! so the player passes through. A breaking platform takes no new landings,
//! though a contact that was already active keeps holding the player up.
//! Classification never mutates the world: it
//! returns the events for the caller to apply once the whole batch is read.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::enemy::{EnemyId, EnemyPopulator};
use super::physics::{BodyHandle, ContactPair};
use super::platform::PlatformId;
use super::world::WorldGenerator;
use crate::tuning::PlayerConfig;

/// What a player contact means for the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactEvent {
    Landing { platform: PlatformId },
    EnemyTouch { enemy: EnemyId, body: BodyHandle },
}

/// Geometry of a valid landing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingRule {
    pub player_half_height: f32,
    /// How deep the feet may already be below the surface
    pub tolerance: f32,
}

impl LandingRule {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            player_half_height: config.height / 2.0,
            tolerance: config.landing_tolerance,
        }
    }
}

/// A landing is a contact where the player is not moving up relative to the
/// platform and its feet are at (or just below) the platform's top surface.
///
/// `rel_pos` and `rel_vel` are the player's relative to the platform.
pub fn is_landing(rel_pos: Vec2, rel_vel: Vec2, platform_half_height: f32, rule: &LandingRule) -> bool {
    let feet = rel_pos.y + rule.player_half_height;
    rel_vel.y >= 0.0 && feet <= -platform_half_height + rule.tolerance
}

/// Classify a batch of new contacts, deactivating every player/platform pair
/// that is not a landing (or lands on a breaking platform) and every
/// player/enemy pair.
pub fn classify_contacts(
    pairs: &mut [ContactPair],
    player: BodyHandle,
    rule: &LandingRule,
    world: &WorldGenerator,
    enemies: &EnemyPopulator,
) -> Vec<ContactEvent> {
    let mut events = Vec::new();

    for pair in pairs.iter_mut() {
        let Some(other) = pair.other(player) else {
            continue;
        };
        let Some((rel_pos, rel_vel)) = pair.relative_to_partner(player) else {
            continue;
        };

        if let Some(platform) = world.find_by_body(other) {
            if platform.is_breaking() {
                pair.active = false;
            } else if is_landing(rel_pos, rel_vel, platform.height / 2.0, rule) {
                events.push(ContactEvent::Landing {
                    platform: platform.id,
                });
            } else {
                pair.active = false;
            }
        } else if let Some(enemy) = enemies.find_by_body(other) {
            pair.active = false;
            events.push(ContactEvent::EnemyTouch {
                enemy: enemy.id,
                body: other,
            });
        } else {
            log::debug!("Contact with unknown body {:?} ignored", other);
        }
    }

    events
}
