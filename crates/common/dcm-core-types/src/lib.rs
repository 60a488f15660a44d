// src/lib.rs for dcm-core-types

pub mod principal;
pub mod principal_key;
pub mod role;
pub mod units;

pub use principal::{Principal, PrincipalError};
pub use principal_key::{verify_message, PrincipalKey, SignatureCheckError};
pub use role::{
    RoleId, CLUSTER_OPERATOR_ROLE, DEFAULT_ADMIN_ROLE, METRICS_REPORTER_ROLE, MINTER_ROLE,
    PAUSER_ROLE, PROFILE_UPDATER_ROLE, UPGRADER_ROLE,
};
pub use units::{format_units, parse_units, UnitsError, DECIMALS, ONE_TOKEN};
