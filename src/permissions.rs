// src/permissions.rs - Role based access control for the lab dashboard
//!
//! Static role -> capability table plus the query functions used by route
//! guards and conditional rendering. Nothing here has side effects.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

// ======== ROLE ========

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Researcher,
    Technician,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Researcher => "Researcher",
            Role::Technician => "Technician",
            Role::Guest => "Guest",
        }
    }

    pub fn description(&self) -> &'static str {
        describe_role(*self)
    }

    pub fn permissions(&self) -> &'static HashSet<Permission> {
        permissions_for(*self)
    }

    pub fn can(&self, permission: Permission) -> bool {
        has_permission(Some(*self), permission)
    }
}

// ======== PERMISSION ========

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    ViewDashboard,
    ControlPumps,
    ControlTemperature,
    ControlPressure,
    UploadFiles,
    DeleteFiles,
    CreateRecipe,
    EditRecipe,
    DeleteRecipe,
    RunRecipe,
    ViewLogs,
    ClearLogs,
    ManageUsers,
    AssignRoles,
    ViewAnalytics,
    AnalyzePdfs,
    ManageEquipment,
    AddEquipment,
    EditEquipment,
    DeleteEquipment,
}

impl Permission {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

// ======== ROLE PERMISSION TABLE ========

/// The configured capabilities of each role. Every role is listed
/// explicitly; there is no fallback entry.
fn configured_permissions(role: Role) -> &'static [Permission] {
    use Permission::*;

    match role {
        Role::Admin => &[
            ViewDashboard,
            ControlPumps,
            ControlTemperature,
            ControlPressure,
            UploadFiles,
            DeleteFiles,
            CreateRecipe,
            EditRecipe,
            DeleteRecipe,
            RunRecipe,
            ViewLogs,
            ClearLogs,
            ManageUsers,
            AssignRoles,
            ViewAnalytics,
            AnalyzePdfs,
            ManageEquipment,
            AddEquipment,
            EditEquipment,
            DeleteEquipment,
        ],
        Role::Researcher => &[
            ViewDashboard,
            ControlPumps,
            ControlTemperature,
            ControlPressure,
            UploadFiles,
            DeleteFiles,
            CreateRecipe,
            EditRecipe,
            RunRecipe,
            ViewLogs,
            ViewAnalytics,
            AnalyzePdfs,
            AddEquipment,
            EditEquipment,
        ],
        Role::Technician => &[
            ViewDashboard,
            ControlPumps,
            ControlTemperature,
            ControlPressure,
            UploadFiles,
            RunRecipe,
            ViewLogs,
        ],
        Role::Guest => &[ViewDashboard, ViewLogs],
    }
}

lazy_static! {
    static ref ROLE_PERMISSIONS: HashMap<Role, HashSet<Permission>> = Role::iter()
        .map(|role| (role, configured_permissions(role).iter().copied().collect()))
        .collect();
}

// ======== QUERIES ========

/// `None` means unauthenticated and is always denied.
pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    match role {
        Some(role) => permissions_for(role).contains(&permission),
        None => false,
    }
}

/// Read-only view of the configured set for `role`.
pub fn permissions_for(role: Role) -> &'static HashSet<Permission> {
    &ROLE_PERMISSIONS[&role]
}

/// Permissions of `role` in declaration order, for display and JSON output.
pub fn sorted_permissions_for(role: Role) -> Vec<Permission> {
    let mut permissions: Vec<Permission> = permissions_for(role).iter().copied().collect();
    permissions.sort();
    permissions
}

pub fn list_roles() -> Vec<Role> {
    Role::iter().collect()
}

pub fn describe_role(role: Role) -> &'static str {
    match role {
        Role::Admin => "Full access to all system features and user management",
        Role::Researcher => "Can create and run experiments, analyze data, and manage recipes",
        Role::Technician => "Can operate equipment and run predefined recipes",
        Role::Guest => "View-only access to dashboard and logs",
    }
}

// ======== GATING ========

/// Picks `authorized` when the current role holds `permission`, `fallback` otherwise.
pub fn gate<T>(current_role: Option<Role>, permission: Permission, authorized: T, fallback: T) -> T {
    if has_permission(current_role, permission) {
        authorized
    } else {
        fallback
    }
}

/// Lazy form of [`gate`]: only the selected branch is built.
pub fn gate_with<T, A, F>(current_role: Option<Role>, permission: Permission, authorized: A, fallback: F) -> T
where
    A: FnOnce() -> T,
    F: FnOnce() -> T,
{
    if has_permission(current_role, permission) {
        authorized()
    } else {
        fallback()
    }
}

/// Gate without a fallback: denied renders nothing.
pub fn gate_or_nothing<T, A>(current_role: Option<Role>, permission: Permission, authorized: A) -> Option<T>
where
    A: FnOnce() -> T,
{
    gate_with(current_role, permission, || Some(authorized()), || None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_grants_match_documented_table() {
        let expected: [(Role, &[&str]); 4] = [
            (
                Role::Admin,
                &[
                    "view_dashboard", "control_pumps", "control_temperature", "control_pressure",
                    "upload_files", "delete_files", "create_recipe", "edit_recipe", "delete_recipe",
                    "run_recipe", "view_logs", "clear_logs", "manage_users", "assign_roles",
                    "view_analytics", "analyze_pdfs", "manage_equipment", "add_equipment",
                    "edit_equipment", "delete_equipment",
                ],
            ),
            (
                Role::Researcher,
                &[
                    "view_dashboard", "control_pumps", "control_temperature", "control_pressure",
                    "upload_files", "delete_files", "create_recipe", "edit_recipe", "run_recipe",
                    "view_logs", "view_analytics", "analyze_pdfs", "add_equipment", "edit_equipment",
                ],
            ),
            (
                Role::Technician,
                &[
                    "view_dashboard", "control_pumps", "control_temperature", "control_pressure",
                    "upload_files", "run_recipe", "view_logs",
                ],
            ),
            (Role::Guest, &["view_dashboard", "view_logs"]),
        ];

        for (role, granted) in expected {
            for permission in Permission::iter() {
                assert_eq!(
                    has_permission(Some(role), permission),
                    granted.contains(&permission.as_str()),
                    "{} / {}",
                    role,
                    permission
                );
            }
            let sorted = sorted_permissions_for(role);
            let listed: Vec<&str> = sorted.iter().map(|p| p.as_str()).collect();
            assert_eq!(listed, granted.to_vec(), "{}", role);
        }
    }

    #[test]
    fn test_absent_role_is_denied_everything() {
        for permission in Permission::iter() {
            assert!(!has_permission(None, permission));
        }
    }

    #[test]
    fn test_every_role_has_explicit_entry() {
        for role in Role::iter() {
            assert!(!permissions_for(role).is_empty(), "{} has no permissions", role);
            assert_eq!(permissions_for(role).len(), configured_permissions(role).len());
        }
    }

    #[test]
    fn test_admin_holds_every_permission() {
        assert_eq!(permissions_for(Role::Admin).len(), Permission::iter().count());
    }

    #[test]
    fn test_role_scenario() {
        assert_eq!(list_roles(), vec![Role::Admin, Role::Researcher, Role::Technician, Role::Guest]);
        assert!(!has_permission(Some(Role::Technician), Permission::ManageUsers));
        assert!(has_permission(Some(Role::Admin), Permission::ManageUsers));

        let guest = describe_role(Role::Guest);
        assert!(!guest.is_empty());
        for other in [Role::Admin, Role::Researcher, Role::Technician] {
            assert_ne!(guest, describe_role(other));
        }
    }

    #[test]
    fn test_researcher_cannot_delete_recipes() {
        assert!(Role::Researcher.can(Permission::CreateRecipe));
        assert!(Role::Researcher.can(Permission::EditRecipe));
        assert!(!Role::Researcher.can(Permission::DeleteRecipe));
        assert!(!Role::Guest.can(Permission::CreateRecipe));
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(Role::Technician.as_str(), "technician");
        assert_eq!(Role::from_str("ADMIN").ok(), Some(Role::Admin));
        assert!(Role::from_str("viewer").is_err());
        assert_eq!(Permission::ManageUsers.as_str(), "manage_users");
        assert_eq!(Permission::from_str("analyze_pdfs").ok(), Some(Permission::AnalyzePdfs));
        assert_eq!(serde_json::to_string(&Permission::ControlPumps).unwrap(), "\"control_pumps\"");
        assert_eq!(serde_json::to_string(&Role::Guest).unwrap(), "\"guest\"");
    }

    #[test]
    fn test_sorted_permissions_follow_declaration_order() {
        assert_eq!(
            sorted_permissions_for(Role::Guest),
            vec![Permission::ViewDashboard, Permission::ViewLogs]
        );
    }

    #[test]
    fn test_gate_variants() {
        assert_eq!(gate(Some(Role::Admin), Permission::ClearLogs, "clear", "hidden"), "clear");
        assert_eq!(gate(Some(Role::Guest), Permission::ClearLogs, "clear", "hidden"), "hidden");
        assert_eq!(gate(None, Permission::ViewDashboard, 1, 0), 0);

        let rendered = gate_with(
            Some(Role::Technician),
            Permission::ControlPumps,
            || "pump panel".to_string(),
            String::new,
        );
        assert_eq!(rendered, "pump panel");

        assert_eq!(gate_or_nothing(Some(Role::Guest), Permission::ManageUsers, || "users"), None);
        assert_eq!(gate_or_nothing(Some(Role::Admin), Permission::ManageUsers, || "users"), Some("users"));
    }
}
