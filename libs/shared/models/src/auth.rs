use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Application role, preferring `app_metadata.role` over the top-level claim.
    pub fn app_role(&self) -> Option<String> {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(|role| role.as_str())
            .map(str::to_string)
            .or_else(|| self.role.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Receptionist,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    BookOwnAppointments,
    ManageAppointments,
    ViewDoctorSchedule,
    CompleteAppointments,
    SearchPatients,
    ManageUsers,
}

impl Role {
    /// Unknown role names map to `Patient`, the least privileged role.
    pub fn from_claim(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("admin") | Some("administrator") | Some("administrador") => Role::Admin,
            Some("receptionist") | Some("recepcionista") => Role::Receptionist,
            Some("doctor") | Some("medico") | Some("médico") => Role::Doctor,
            _ => Role::Patient,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Patient => matches!(capability, BookOwnAppointments),
            Role::Doctor => matches!(capability, ViewDoctorSchedule | CompleteAppointments),
            Role::Receptionist => matches!(
                capability,
                ManageAppointments | CompleteAppointments | SearchPatients
            ),
            Role::Admin => matches!(
                capability,
                ManageAppointments | CompleteAppointments | SearchPatients | ManageUsers
            ),
        }
    }

    pub fn is_staff(self) -> bool {
        !matches!(self, Role::Patient)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Receptionist => write!(f, "receptionist"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Authenticated caller, attached to every protected request by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Result<Self, AppError> {
        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

        Ok(Self {
            user_id,
            email: user.email.clone(),
            role: Role::from_claim(user.role.as_deref()),
        })
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} is not allowed to perform this action",
                self.role
            )))
        }
    }

    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}
