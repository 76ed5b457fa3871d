//! Culls the extracted entities down to the ones worth drawing.

use esp_stream::{AttackTargetCombatState, GadgetType};

use crate::combat::CombatStateKey;
use crate::combat::constants::DEATH_ANIMATION_TOTAL_DURATION_MS;
use crate::context::FrameContext;
use crate::entity::{EntityHandle, EntityPools, EntityRef};

/// True while the death burst and final fade are still on screen.
pub fn is_death_animation_playing(entity: EntityRef<'_>, ctx: &FrameContext<'_>) -> bool {
    ctx.combat
        .get_state(CombatStateKey::for_entity(entity))
        .filter(|state| state.death_timestamp != 0)
        .is_some_and(|state| {
            ctx.now_ms.saturating_sub(state.death_timestamp) <= DEATH_ANIMATION_TOTAL_DURATION_MS
        })
}

fn category_enabled(entity: EntityRef<'_>, ctx: &FrameContext<'_>) -> bool {
    let settings = ctx.settings;
    match entity {
        EntityRef::Player(_) => settings.player_esp.enabled,
        EntityRef::Npc(_) => settings.npc_esp.enabled,
        EntityRef::Gadget(_) => settings.object_esp.enabled,
        EntityRef::AttackTarget(_) => {
            settings.object_esp.enabled && settings.object_esp.show_attack_target_list
        }
    }
}

/// Kind-specific gates, applied after the distance gate.
fn passes_kind_filters(entity: EntityRef<'_>, ctx: &FrameContext<'_>) -> bool {
    let settings = ctx.settings;
    match entity {
        EntityRef::Player(player) => {
            if player.is_local_player && !settings.player_esp.show_local_player {
                return false;
            }
            if player.base.health <= 0.0 && !is_death_animation_playing(entity, ctx) {
                return false;
            }
            settings.player_esp.shows_attitude(player.attitude)
        }
        EntityRef::Npc(npc) => {
            if npc.base.health <= 0.0
                && !settings.npc_esp.show_dead_npcs
                && !is_death_animation_playing(entity, ctx)
            {
                return false;
            }
            settings.npc_esp.shows_attitude(npc.attitude) && settings.npc_esp.shows_rank(npc.rank)
        }
        EntityRef::Gadget(gadget) => {
            if gadget.base.is_dead()
                && !settings.object_esp.show_dead_gadgets
                && !is_death_animation_playing(entity, ctx)
            {
                return false;
            }
            if settings.hide_depleted_nodes
                && gadget.gadget_type == GadgetType::ResourceNode
                && !gadget.gatherable
            {
                return false;
            }
            settings.object_esp.shows_gadget_type(gadget.gadget_type)
        }
        EntityRef::AttackTarget(target) => {
            !settings.object_esp.show_attack_target_list_only_in_combat
                || target.combat_state == AttackTargetCombatState::InCombat
        }
    }
}

/// Writes the surviving subset of `extracted` into `out`, in order.
///
/// Visual and gameplay distances are stored on the pooled entities as a
/// side effect so later stages do not recompute them.
pub fn filter_entities(
    extracted: &[EntityHandle],
    pools: &mut EntityPools,
    ctx: &FrameContext<'_>,
    out: &mut Vec<EntityHandle>,
) {
    out.clear();
    let camera_position = ctx.camera.position();
    let camera_forward = ctx.camera.forward();
    let player_position = ctx.camera.avatar_position();

    for &handle in extracted {
        let Some(base) = pools.base_mut(handle) else {
            continue;
        };
        if !base.valid {
            continue;
        }
        base.visual_distance = base.position.distance(camera_position);
        base.gameplay_distance = base.position.distance(player_position);
        let gameplay_distance = base.gameplay_distance;
        let facing = (base.position - camera_position).dot(camera_forward) > 0.0;

        let Some(entity) = pools.resolve(handle) else {
            continue;
        };
        if !category_enabled(entity, ctx) || !facing {
            continue;
        }
        let limit = ctx.settings.distance.active_limit(entity.kind(), ctx.in_wvw);
        if limit > 0.0 && gameplay_distance > limit {
            continue;
        }
        if passes_kind_filters(entity, ctx) {
            out.push(handle);
        }
    }
}
