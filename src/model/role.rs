use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    SuperAdmin = 1,
    /// Also called "client" by the console.
    #[strum(to_string = "tenant", serialize = "client")]
    Tenant = 2,
    Employee = 3,
    LineManager = 4,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::SuperAdmin),
            2 => Some(Role::Tenant),
            3 => Some(Role::Employee),
            4 => Some(Role::LineManager),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Line managers are employees with a review queue.
    pub fn is_employee(self) -> bool {
        matches!(self, Role::Employee | Role::LineManager)
    }

    /// Where the console sends a signed-in user of this role.
    pub fn home_path(self) -> &'static str {
        match self {
            Role::SuperAdmin => "/dashboard/admin",
            Role::Tenant => "/dashboard/tenant",
            Role::Employee | Role::LineManager => "/dashboard/employee",
        }
    }

    /// Where the console redirects when the session for this role is gone.
    pub fn login_path(self) -> &'static str {
        match self {
            Role::SuperAdmin => "/admin/login",
            Role::Tenant => "/client/login",
            Role::Employee | Role::LineManager => "/login",
        }
    }
}
