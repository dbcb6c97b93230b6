use poise::serenity_prelude::{Guild, RoleId};

/// Whether the first member's highest role sits strictly above the second
/// member's. A member with no resolvable roles never outranks anyone.
pub fn outranks(guild: &Guild, member_roles: &[RoleId], other_roles: &[RoleId]) -> bool {
    let highest = |role_ids: &[RoleId]| {
        role_ids
            .iter()
            .filter_map(|id| guild.roles.get(id))
            .map(|role| role.position)
            .max()
    };
    highest(member_roles) > highest(other_roles)
}
