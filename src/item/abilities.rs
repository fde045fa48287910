//! Effective permissions of a caller on an item.

use serde::Serialize;

use super::access::Role;
use super::model::{Item, LinkReach, LinkRole, UploadState};

/// Everything that decides what a caller may do on an item.
///
/// Roles and link settings are collected over the item and all of its
/// ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPermissions {
    /// Roles held by the caller, directly or through a team.
    pub roles: Vec<Role>,
    /// Widest link reach over the lineage.
    pub link_reach: LinkReach,
    /// Link role granted along with that reach.
    pub link_role: LinkRole,
    /// Whether the caller is authenticated.
    pub authenticated: bool,
}

impl ItemPermissions {
    /// Build permissions from the caller's roles and the item lineage.
    ///
    /// The link role is the highest one among lineage items whose reach is
    /// not restricted.
    pub fn new(roles: Vec<Role>, lineage: &[Item], authenticated: bool) -> Self {
        let link_reach = lineage
            .iter()
            .map(|item| item.link_reach)
            .max()
            .unwrap_or_default();
        let link_role = lineage
            .iter()
            .filter(|item| item.link_reach != LinkReach::Restricted)
            .map(|item| item.link_role)
            .max()
            .unwrap_or_default();

        Self {
            roles,
            link_reach,
            link_role,
            authenticated,
        }
    }

    /// Highest role held by the caller.
    pub fn max_role(&self) -> Option<Role> {
        self.roles.iter().copied().max()
    }

    /// Whether the link reach lets the caller in.
    pub fn link_admits(&self) -> bool {
        self.link_reach.admits(self.authenticated)
    }
}

/// Actions a caller may perform on an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Abilities {
    pub accesses_manage: bool,
    pub accesses_view: bool,
    pub children_create: bool,
    pub children_list: bool,
    pub destroy: bool,
    pub download: bool,
    pub favorite: bool,
    pub link_configuration: bool,
    #[serde(rename = "move")]
    pub move_item: bool,
    pub retrieve: bool,
    pub update: bool,
    pub upload: bool,
}

impl Abilities {
    /// Compute the abilities of a caller on `item`.
    pub fn compute(item: &Item, permissions: &ItemPermissions, user_id: Option<&str>) -> Self {
        let role = permissions.max_role();
        let has_role = role.is_some();
        let at_least = |required: Role| role.is_some_and(|r| r.at_least(required));

        let retrieve = has_role || permissions.link_admits();
        let can_edit = at_least(Role::Editor)
            || (permissions.link_role == LinkRole::Editor && permissions.link_admits());
        let is_creator = item.is_created_by(user_id);

        // Suspicious content stays available to the one who uploaded it.
        let download = retrieve
            && item.is_file()
            && item.upload_state.is_some_and(|state| {
                state.is_downloadable() || (state == UploadState::Suspicious && is_creator)
            });

        Self {
            accesses_manage: at_least(Role::Administrator),
            accesses_view: has_role,
            children_create: can_edit && item.is_folder(),
            children_list: retrieve && item.is_folder(),
            destroy: at_least(Role::Owner),
            download,
            favorite: retrieve && permissions.authenticated,
            link_configuration: at_least(Role::Administrator),
            move_item: can_edit,
            retrieve,
            update: can_edit,
            upload: can_edit
                && item.is_file()
                && is_creator
                && item.upload_state == Some(UploadState::Pending),
        }
    }
}
